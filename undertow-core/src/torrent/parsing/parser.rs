//! Default [`TorrentParser`] backed by the metainfo decoder and magnet parser.

use std::path::Path;

use async_trait::async_trait;

use super::super::TorrentError;
use super::bencode::MetainfoDecoder;
use super::magnet::MagnetParser;
use super::types::{MagnetLink, TorrentMetadata, TorrentParser};

/// Parser for `.torrent` payloads and magnet URIs.
///
/// Magnet links are parsed leniently unless built with [`Self::with_magnet_parser`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BencodeTorrentParser {
    magnet: MagnetParser,
}

impl BencodeTorrentParser {
    pub fn new() -> Self {
        Self {
            magnet: MagnetParser::lenient(),
        }
    }

    pub fn with_magnet_parser(magnet: MagnetParser) -> Self {
        Self { magnet }
    }
}

#[async_trait]
impl TorrentParser for BencodeTorrentParser {
    async fn parse_torrent_data(
        &self,
        torrent_bytes: &[u8],
    ) -> Result<TorrentMetadata, TorrentError> {
        MetainfoDecoder::decode(torrent_bytes)
    }

    async fn parse_torrent_file(&self, path: &Path) -> Result<TorrentMetadata, TorrentError> {
        let file_contents = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", file_contents.len(), path.display());

        self.parse_torrent_data(&file_contents).await
    }

    async fn parse_magnet_link(&self, magnet_url: &str) -> Result<MagnetLink, TorrentError> {
        self.magnet.parse(magnet_url)
    }
}
