//! In-memory storage for tests and ephemeral jobs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Storage, StorageError};
use crate::torrent::{Bitfield, InfoHash, PieceIndex};

/// Keeps piece data in a map guarded by a read-write lock.
///
/// The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pieces: RwLock<HashMap<(InfoHash, PieceIndex), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pieces stored across all torrents.
    pub fn len(&self) -> usize {
        self.pieces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
        piece_bytes: &[u8],
    ) -> Result<(), StorageError> {
        self.pieces
            .write()
            .insert((info_hash, index), piece_bytes.to_vec());
        Ok(())
    }

    async fn load_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
    ) -> Result<Vec<u8>, StorageError> {
        self.pieces
            .read()
            .get(&(info_hash, index))
            .cloned()
            .ok_or(StorageError::PieceNotFound { index })
    }

    async fn has_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
    ) -> Result<bool, StorageError> {
        Ok(self.pieces.read().contains_key(&(info_hash, index)))
    }

    async fn possession(
        &self,
        info_hash: InfoHash,
        piece_count: u32,
    ) -> Result<Bitfield, StorageError> {
        let pieces = self.pieces.read();
        let held = pieces
            .keys()
            .filter(|(hash, index)| *hash == info_hash && index.as_u32() < piece_count)
            .map(|&(_, index)| index);
        Ok(Bitfield::from_pieces(piece_count, held))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::test_fixtures::test_info_hash;

    #[tokio::test]
    async fn test_store_and_load_piece() {
        let storage = MemoryStorage::new();
        let info_hash = test_info_hash();

        storage
            .store_piece(info_hash, PieceIndex::new(2), b"piece two")
            .await
            .unwrap();

        assert_eq!(storage.len(), 1);
        assert!(storage.has_piece(info_hash, PieceIndex::new(2)).await.unwrap());
        assert_eq!(
            storage.load_piece(info_hash, PieceIndex::new(2)).await.unwrap(),
            b"piece two"
        );
    }

    #[tokio::test]
    async fn test_missing_piece() {
        let storage = MemoryStorage::new();

        let result = storage.load_piece(test_info_hash(), PieceIndex::new(7)).await;
        assert!(matches!(
            result,
            Err(StorageError::PieceNotFound { index }) if index == PieceIndex::new(7)
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_possession_ignores_other_torrents_and_out_of_range() {
        let storage = MemoryStorage::new();
        let info_hash = test_info_hash();
        let other = InfoHash::new([0xaa; 20]);

        for (hash, index) in [(info_hash, 0), (info_hash, 3), (info_hash, 9), (other, 1)] {
            storage
                .store_piece(hash, PieceIndex::new(index), b"x")
                .await
                .unwrap();
        }

        let have = storage.possession(info_hash, 4).await.unwrap();
        let held: Vec<u32> = have.pieces().map(PieceIndex::as_u32).collect();
        assert_eq!(held, vec![0, 3]);
    }

    #[tokio::test]
    async fn test_shared_between_tasks() {
        let storage = Arc::new(MemoryStorage::new());
        let info_hash = test_info_hash();

        let handles: Vec<_> = (0..8u32)
            .map(|index| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    storage
                        .store_piece(info_hash, PieceIndex::new(index), &[index as u8])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let have = storage.possession(info_hash, 8).await.unwrap();
        assert!(have.is_complete());
    }
}
