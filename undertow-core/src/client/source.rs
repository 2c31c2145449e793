//! Where a job gets its torrent metadata from.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use url::Url;

use crate::torrent::{MagnetLink, TorrentError, TorrentMetadata};

type SupplierFn =
    dyn Fn() -> BoxFuture<'static, Result<TorrentMetadata, TorrentError>> + Send + Sync;

/// Deferred metadata acquisition, invoked when a job starts.
///
/// Cheap to clone; clones share the same function. Nothing runs until
/// [`MetadataSupplier::fetch`] is awaited, and every call runs the function
/// again.
#[derive(Clone)]
pub struct MetadataSupplier {
    supplier: Arc<SupplierFn>,
}

impl MetadataSupplier {
    /// Wraps an async function producing metadata.
    pub fn new<F, Fut>(supplier: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TorrentMetadata, TorrentError>> + Send + 'static,
    {
        Self {
            supplier: Arc::new(move || supplier().boxed()),
        }
    }

    /// Wraps a blocking function; each call runs on tokio's blocking pool.
    ///
    /// Must be fetched from within a tokio runtime.
    pub fn blocking<F>(supplier: F) -> Self
    where
        F: Fn() -> Result<TorrentMetadata, TorrentError> + Send + Sync + 'static,
    {
        let supplier = Arc::new(supplier);
        Self::new(move || {
            let supplier = Arc::clone(&supplier);
            async move {
                tokio::task::spawn_blocking(move || (*supplier)())
                    .await
                    .map_err(|e| TorrentError::MetadataSupplierAborted {
                        reason: e.to_string(),
                    })?
            }
        })
    }

    /// Runs the supplier.
    ///
    /// # Errors
    ///
    /// Whatever the supplier returns, unchanged.
    pub async fn fetch(&self) -> Result<TorrentMetadata, TorrentError> {
        (self.supplier)().await
    }
}

impl fmt::Debug for MetadataSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataSupplier").finish_non_exhaustive()
    }
}

/// Metadata supplied by the caller, either on hand or deferred.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    Ready(Arc<TorrentMetadata>),
    Deferred(MetadataSupplier),
}

impl MetadataSource {
    /// Returns the metadata, running a deferred supplier if needed.
    ///
    /// # Errors
    ///
    /// Errors of a deferred supplier, unchanged. Ready metadata never fails.
    pub async fn resolve(&self) -> Result<Arc<TorrentMetadata>, TorrentError> {
        match self {
            MetadataSource::Ready(metadata) => Ok(Arc::clone(metadata)),
            MetadataSource::Deferred(supplier) => supplier.fetch().await.map(Arc::new),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, MetadataSource::Ready(_))
    }

    /// Metadata on hand without running anything.
    pub fn ready(&self) -> Option<&TorrentMetadata> {
        match self {
            MetadataSource::Ready(metadata) => Some(metadata.as_ref()),
            MetadataSource::Deferred(_) => None,
        }
    }
}

impl From<TorrentMetadata> for MetadataSource {
    fn from(metadata: TorrentMetadata) -> Self {
        MetadataSource::Ready(Arc::new(metadata))
    }
}

impl From<MetadataSupplier> for MetadataSource {
    fn from(supplier: MetadataSupplier) -> Self {
        MetadataSource::Deferred(supplier)
    }
}

/// The single active way of acquiring a torrent's metadata.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// `.torrent` document fetched over the network when the job starts
    Url(Url),
    /// Caller-provided metadata
    Supplier(MetadataSource),
    /// Metadata obtained from peers after joining the swarm
    Magnet(MagnetLink),
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::Url(_) => SourceKind::Url,
            SourceDescriptor::Supplier(_) => SourceKind::Supplier,
            SourceDescriptor::Magnet(_) => SourceKind::Magnet,
        }
    }
}

/// Variant tag of a [`SourceDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Supplier,
    Magnet,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Url => write!(f, "url"),
            SourceKind::Supplier => write!(f, "supplier"),
            SourceKind::Magnet => write!(f, "magnet"),
        }
    }
}
