//! Core types and structures for torrent parsing

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use async_trait::async_trait;

use super::super::{InfoHash, PieceIndex, TorrentError};

/// Complete metadata extracted from a torrent file.
///
/// Contains all information needed to download a torrent including
/// piece hashes, file structure, and tracker URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentMetadata {
    pub info_hash: InfoHash,
    pub name: String,
    pub piece_length: u32,
    pub piece_hashes: Vec<[u8; 20]>,
    pub total_length: u64,
    pub files: Vec<TorrentFile>,
    pub announce_urls: Vec<String>,
}

impl TorrentMetadata {
    pub fn piece_count(&self) -> u32 {
        self.piece_hashes.len() as u32
    }

    /// Every piece index of the torrent, ascending.
    pub fn all_pieces(&self) -> impl Iterator<Item = PieceIndex> + use<> {
        (0..self.piece_count()).map(PieceIndex::new)
    }
}

/// Individual file within a torrent.
///
/// Represents a single file entry in multi-file torrents with its
/// relative path components and byte length.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentFile {
    pub path: Vec<String>,
    pub length: u64,
}

/// Magnet link components.
///
/// Enough to join a swarm: the info hash plus optional display name,
/// trackers and peer addresses. The full metadata has to be obtained from
/// peers afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
    pub peers: Vec<PeerAddress>,
}

/// Peer named by an `x.pe` parameter: a socket literal or `hostname:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerAddress {
    Socket(SocketAddr),
    Host { host: String, port: u16 },
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddress::Socket(addr) => write!(f, "{addr}"),
            PeerAddress::Host { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

impl MagnetLink {
    /// Creates a magnet link with only an info hash.
    pub fn new(info_hash: InfoHash) -> Self {
        Self {
            info_hash,
            display_name: None,
            trackers: Vec::new(),
            peers: Vec::new(),
        }
    }
}

/// Abstract torrent parsing interface for multiple implementations.
#[async_trait]
pub trait TorrentParser: Send + Sync {
    /// Parses torrent metadata from raw bencode bytes.
    ///
    /// # Errors
    /// - `TorrentError::InvalidTorrentFile` - Malformed bencode or missing fields
    async fn parse_torrent_data(&self, data: &[u8]) -> Result<TorrentMetadata, TorrentError>;

    /// Parses torrent file from filesystem path.
    ///
    /// # Errors
    /// - `TorrentError::Io` - File could not be read
    /// - `TorrentError::InvalidTorrentFile` - Parsing failure
    async fn parse_torrent_file(&self, path: &Path) -> Result<TorrentMetadata, TorrentError>;

    /// Parses magnet link to extract torrent information.
    ///
    /// # Errors
    /// - `TorrentError::InvalidMagnetLink` - Malformed magnet URI
    async fn parse_magnet_link(&self, magnet_url: &str) -> Result<MagnetLink, TorrentError>;
}
