//! File-based storage implementation

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{Storage, StorageError};
use crate::torrent::{InfoHash, PieceIndex};

/// File system-based storage implementation.
///
/// Stores each piece as its own file in a directory per info hash:
/// `<download_dir>/<info hash>/piece_<index>`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    download_dir: PathBuf,
}

impl FileStorage {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    fn piece_path(&self, info_hash: InfoHash, index: PieceIndex) -> PathBuf {
        self.download_dir
            .join(info_hash.to_string())
            .join(format!("piece_{}", index.as_u32()))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn store_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
        piece_bytes: &[u8],
    ) -> Result<(), StorageError> {
        let piece_path = self.piece_path(info_hash, index);

        if let Some(parent) = piece_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&piece_path, piece_bytes).await?;
        tracing::trace!("Stored piece {} of {} ({} bytes)", index, info_hash, piece_bytes.len());
        Ok(())
    }

    async fn load_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
    ) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.piece_path(info_hash, index)).await {
            Ok(piece_bytes) => Ok(piece_bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::PieceNotFound { index }),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_piece(
        &self,
        info_hash: InfoHash,
        index: PieceIndex,
    ) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.piece_path(info_hash, index)).await?)
    }
}
