//! Undertow Core - torrent client builder, source resolution and piece selection
//!
//! This crate turns client configuration into a processing context for a
//! BitTorrent download engine: exactly one metadata source (torrent URL,
//! caller-supplied metadata or magnet link), a storage backend and a piece
//! selection strategy.

pub mod client;
pub mod config;
pub mod storage;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use client::{ConfigurationError, ProcessingContext, TorrentClientBuilder};
pub use config::UndertowConfig;
pub use storage::{FileStorage, MemoryStorage, StorageError};
pub use torrent::{PieceSelector, SelectionError, TorrentError};

/// Errors that can bubble up from any Undertow subsystem.
#[derive(Debug, thiserror::Error)]
pub enum UndertowError {
    #[error("Torrent error: {0}")]
    Torrent(#[from] TorrentError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UndertowError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            UndertowError::Torrent(e) => match e {
                TorrentError::InvalidTorrentFile { reason } => {
                    format!("Invalid torrent file: {reason}")
                }
                TorrentError::InvalidMagnetLink { reason } => {
                    format!("Invalid magnet link: {reason}")
                }
                TorrentError::MetadataFetchFailed { url, .. } => {
                    format!("Could not download torrent metadata from {url}")
                }
                _ => "Could not obtain torrent metadata".to_string(),
            },
            UndertowError::Storage(_) => "Storage error occurred".to_string(),
            UndertowError::Selection(e) => format!("Piece selection failed: {e}"),
            UndertowError::Configuration(ConfigurationError::MissingStorage) => {
                "No download location configured".to_string()
            }
            UndertowError::Configuration(ConfigurationError::MissingSource) => {
                "No torrent given: pass a magnet link, torrent URL or .torrent file".to_string()
            }
            UndertowError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            UndertowError::Configuration(_)
                | UndertowError::Torrent(TorrentError::InvalidTorrentFile { .. })
                | UndertowError::Torrent(TorrentError::InvalidMagnetLink { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, UndertowError>;
