//! BitTorrent domain types, metadata acquisition and piece selection

pub mod bitfield;
pub mod fetch;
pub mod parsing;
pub mod rarity;
pub mod selector;

use std::fmt;

pub use bitfield::Bitfield;
pub use fetch::{HttpMetadataFetcher, MetadataFetcher};
pub use parsing::{
    BencodeTorrentParser, MagnetLink, MagnetParser, ParseMode, PeerAddress, TorrentFile,
    TorrentMetadata, TorrentParser,
};
pub use rarity::RarityTable;
pub use selector::{
    PieceRanking, PieceSelector, RandomSource, RarestFirstSelector, Selection, SelectionError,
    SelectorAdapter, SelectorKind,
};

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte SHA-1 hash of the info dictionary from a torrent file.
/// Used to uniquely identify torrents across the BitTorrent network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates InfoHash from 20-byte SHA-1 hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Returns reference to underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Zero-based index of a piece within a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceIndex(pub u32);

impl PieceIndex {
    /// Creates PieceIndex from zero-based index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying piece index as u32.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PieceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PieceIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Errors raised while acquiring torrent metadata.
///
/// Parse failures surface synchronously where the input is supplied. Fetch
/// failures only surface when a deferred metadata source is invoked.
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    #[error("Failed to parse torrent file: {reason}")]
    InvalidTorrentFile { reason: String },

    #[error("Invalid magnet link: {reason}")]
    InvalidMagnetLink { reason: String },

    #[error("Failed to fetch torrent metadata from {url}: {reason}")]
    MetadataFetchFailed { url: String, reason: String },

    #[error("Metadata supplier did not complete: {reason}")]
    MetadataSupplierAborted { reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error")]
    UrlParsing(#[from] url::ParseError),

    #[error("HTTP error")]
    Http(#[from] reqwest::Error),
}
