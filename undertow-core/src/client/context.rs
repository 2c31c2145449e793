//! Resolved, immutable descriptions of a download job.

use std::sync::Arc;

use super::source::{MetadataSource, SourceKind};
use crate::storage::Storage;
use crate::torrent::{
    Bitfield, InfoHash, MagnetLink, PieceSelector, RarityTable, Selection, TorrentError,
    TorrentMetadata,
};

/// Exactly one kind of job, with its selector and storage attached.
#[derive(Debug, Clone)]
pub enum ProcessingContext {
    Torrent(TorrentContext),
    Magnet(MagnetContext),
}

impl ProcessingContext {
    pub fn selector(&self) -> &Arc<PieceSelector> {
        match self {
            ProcessingContext::Torrent(context) => &context.selector,
            ProcessingContext::Magnet(context) => &context.selector,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        match self {
            ProcessingContext::Torrent(context) => &context.storage,
            ProcessingContext::Magnet(context) => &context.storage,
        }
    }

    /// Info hash if known without running any deferred source.
    pub fn info_hash(&self) -> Option<InfoHash> {
        match self {
            ProcessingContext::Torrent(context) => {
                context.metadata.ready().map(|metadata| metadata.info_hash)
            }
            ProcessingContext::Magnet(context) => Some(context.magnet.info_hash),
        }
    }

    pub fn as_torrent(&self) -> Option<&TorrentContext> {
        match self {
            ProcessingContext::Torrent(context) => Some(context),
            ProcessingContext::Magnet(_) => None,
        }
    }

    pub fn as_magnet(&self) -> Option<&MagnetContext> {
        match self {
            ProcessingContext::Torrent(_) => None,
            ProcessingContext::Magnet(context) => Some(context),
        }
    }

    pub fn is_magnet(&self) -> bool {
        matches!(self, ProcessingContext::Magnet(_))
    }
}

/// Job whose metadata comes from a `.torrent` document or the caller.
#[derive(Clone)]
pub struct TorrentContext {
    pub(crate) selector: Arc<PieceSelector>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) metadata: MetadataSource,
    pub(crate) origin: SourceKind,
}

impl TorrentContext {
    pub fn selector(&self) -> &Arc<PieceSelector> {
        &self.selector
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn metadata_source(&self) -> &MetadataSource {
        &self.metadata
    }

    /// Source variant this context was resolved from (`Url` or `Supplier`).
    pub fn origin(&self) -> SourceKind {
        self.origin
    }

    /// Obtains the metadata, running a deferred source.
    ///
    /// Deferred sources are not cached; the job runner calls this once per job.
    ///
    /// # Errors
    ///
    /// - `TorrentError::MetadataFetchFailed` / `TorrentError::Http` - URL fetch failed
    /// - Any error of a caller-provided supplier, unchanged
    pub async fn metadata(&self) -> Result<Arc<TorrentMetadata>, TorrentError> {
        self.metadata.resolve().await
    }

    /// Initial request order for a job: every piece of the torrent not yet
    /// in storage, ordered by this context's selector.
    ///
    /// # Errors
    ///
    /// - `UndertowError::Torrent` - Metadata could not be obtained
    /// - `UndertowError::Storage` - Possession could not be read
    /// - `UndertowError::Selection` - An adapted ranking failed
    pub async fn plan(&self, rarity: &RarityTable) -> crate::Result<PiecePlan> {
        let metadata = self.metadata().await?;
        let local_have = self
            .storage
            .possession(metadata.info_hash, metadata.piece_count())
            .await?;
        let order = self
            .selector
            .select(metadata.all_pieces(), rarity, &local_have)?;

        tracing::debug!(
            "Planned {} of {} pieces for {} with {} selector",
            order.len(),
            metadata.piece_count(),
            metadata.info_hash,
            self.selector.name()
        );

        Ok(PiecePlan {
            metadata,
            local_have,
            order,
        })
    }
}

impl std::fmt::Debug for TorrentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorrentContext")
            .field("selector", &self.selector)
            .field("metadata", &self.metadata)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Job that joins the swarm first and learns its metadata from peers.
#[derive(Clone)]
pub struct MagnetContext {
    pub(crate) magnet: MagnetLink,
    pub(crate) selector: Arc<PieceSelector>,
    pub(crate) storage: Arc<dyn Storage>,
}

impl MagnetContext {
    pub fn magnet(&self) -> &MagnetLink {
        &self.magnet
    }

    pub fn selector(&self) -> &Arc<PieceSelector> {
        &self.selector
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

impl std::fmt::Debug for MagnetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagnetContext")
            .field("magnet", &self.magnet)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`TorrentContext::plan`].
#[derive(Debug)]
pub struct PiecePlan {
    pub metadata: Arc<TorrentMetadata>,
    pub local_have: Bitfield,
    pub order: Selection,
}
