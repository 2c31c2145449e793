//! Test fixtures for storage testing.

use crate::torrent::InfoHash;

type TempStorageDir = (tempfile::TempDir, std::path::PathBuf);

/// Creates a temporary download directory.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_storage_dir() -> TempStorageDir {
    let temp_dir = tempfile::tempdir().unwrap();
    let downloads_dir = temp_dir.path().join("downloads");
    std::fs::create_dir_all(&downloads_dir).unwrap();

    (temp_dir, downloads_dir)
}

pub fn test_info_hash() -> InfoHash {
    InfoHash::new([
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd,
        0xef, 0x01, 0x23, 0x45, 0x67,
    ])
}
