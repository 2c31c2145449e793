//! Turns builder state into exactly one processing context.

use std::sync::Arc;

use super::context::{MagnetContext, ProcessingContext, TorrentContext};
use super::source::{MetadataSource, MetadataSupplier, SourceDescriptor, SourceKind};
use crate::storage::Storage;
use crate::torrent::{MetadataFetcher, PieceSelector};

/// Client configuration that cannot produce a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("No storage configured")]
    MissingStorage,

    #[error("No torrent source configured: set a torrent URL, metadata supplier or magnet link")]
    MissingSource,
}

/// Resolves a processing context.
///
/// Storage is checked before the source. A URL source becomes a deferred
/// fetch through `fetcher`; nothing is fetched here. The inputs are only
/// read, so resolving again yields an independent, equivalent context.
///
/// # Errors
///
/// - `ConfigurationError::MissingStorage` - `storage` is `None`
/// - `ConfigurationError::MissingSource` - `source` is `None`
pub fn resolve(
    storage: Option<Arc<dyn Storage>>,
    source: Option<&SourceDescriptor>,
    selector: Arc<PieceSelector>,
    fetcher: Arc<dyn MetadataFetcher>,
) -> Result<ProcessingContext, ConfigurationError> {
    let storage = storage.ok_or(ConfigurationError::MissingStorage)?;
    let source = source.ok_or(ConfigurationError::MissingSource)?;

    let context = match source {
        SourceDescriptor::Url(url) => {
            let url = url.clone();
            let supplier = MetadataSupplier::new(move || {
                let fetcher = Arc::clone(&fetcher);
                let url = url.clone();
                async move { fetcher.fetch_from_url(&url).await }
            });
            ProcessingContext::Torrent(TorrentContext {
                selector,
                storage,
                metadata: MetadataSource::Deferred(supplier),
                origin: SourceKind::Url,
            })
        }
        SourceDescriptor::Supplier(metadata) => ProcessingContext::Torrent(TorrentContext {
            selector,
            storage,
            metadata: metadata.clone(),
            origin: SourceKind::Supplier,
        }),
        SourceDescriptor::Magnet(magnet) => ProcessingContext::Magnet(MagnetContext {
            magnet: magnet.clone(),
            selector,
            storage,
        }),
    };

    tracing::debug!(
        "Resolved {} source into {} context",
        source.kind(),
        if context.is_magnet() { "magnet" } else { "torrent" }
    );
    Ok(context)
}
