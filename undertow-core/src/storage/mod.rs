//! Storage layer for torrent piece data.
//!
//! Every processing context owns a shared handle to a [`Storage`]. The
//! selection step asks it for a possession [`Bitfield`] so pieces already on
//! hand are never requested again.

pub mod file_storage;
pub mod memory_storage;
#[cfg(test)]
pub mod test_fixtures;

use async_trait::async_trait;
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;

use crate::torrent::{Bitfield, InfoHash, PieceIndex};

/// Storage operations for torrent piece data.
///
/// Shared between every task of a job, so all operations take `&self`;
/// implementations synchronize internally.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores verified piece data.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If file system operation failed
    async fn store_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
        piece_bytes: &[u8],
    ) -> Result<(), StorageError>;

    /// Loads piece data from storage.
    ///
    /// # Errors
    ///
    /// - `StorageError::PieceNotFound` - If piece not yet downloaded
    /// - `StorageError::Io` - If file system operation failed
    async fn load_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
    ) -> Result<Vec<u8>, StorageError>;

    /// Checks if piece exists in storage.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If file system operation failed
    async fn has_piece(&self, info_hash: InfoHash, index: PieceIndex)
    -> Result<bool, StorageError>;

    /// Builds the local possession bitfield for a torrent of `piece_count` pieces.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If file system operation failed
    async fn possession(
        &self,
        info_hash: InfoHash,
        piece_count: u32,
    ) -> Result<Bitfield, StorageError> {
        let mut have = Bitfield::new(piece_count);
        for index in (0..piece_count).map(PieceIndex::new) {
            if self.has_piece(info_hash, index).await? {
                have.set_piece(index);
            }
        }
        Ok(have)
    }
}

/// Errors that occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested piece has not been downloaded yet
    #[error("Piece {index} not found")]
    PieceNotFound { index: PieceIndex },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
