//! Torrent metainfo and magnet link parsing.
//!
//! `.torrent` payloads are decoded with bencode-rs; the info hash is the SHA-1
//! of the exact `info` bytes. Magnet URIs are parsed by hand in either strict
//! or lenient mode.

pub mod bencode;
pub mod magnet;
pub mod parser;
pub mod types;

pub use bencode::MetainfoDecoder;
pub use magnet::{MagnetParser, ParseMode};
pub use parser::BencodeTorrentParser;
pub use types::{MagnetLink, PeerAddress, TorrentFile, TorrentMetadata, TorrentParser};
