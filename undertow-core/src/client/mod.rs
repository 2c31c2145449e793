//! Client builder and job resolution.
//!
//! [`TorrentClientBuilder`] collects storage, exactly one metadata source and
//! a piece selector. [`TorrentClientBuilder::build`] hands that state to
//! [`resolve`], which produces a [`ProcessingContext`] for the download engine.

pub mod context;
pub mod resolver;
pub mod source;

use std::sync::Arc;

pub use context::{MagnetContext, PiecePlan, ProcessingContext, TorrentContext};
pub use resolver::{ConfigurationError, resolve};
pub use source::{MetadataSource, MetadataSupplier, SourceDescriptor, SourceKind};
use url::Url;

use crate::config::UndertowConfig;
use crate::storage::Storage;
use crate::torrent::{
    MagnetLink, MagnetParser, MetadataFetcher, PieceRanking, PieceSelector, TorrentError,
    TorrentMetadata,
};

/// Collects client configuration and builds processing contexts.
///
/// Source setters share one slot: each replaces whatever source was set
/// before. Selector setters never touch the source. Building only reads the
/// builder, so it can be built repeatedly.
#[derive(Clone)]
pub struct TorrentClientBuilder {
    storage: Option<Arc<dyn Storage>>,
    source: Option<SourceDescriptor>,
    selector: Arc<PieceSelector>,
    seed: Option<u64>,
}

impl Default for TorrentClientBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            source: None,
            selector: Arc::new(PieceSelector::default()),
            seed: None,
        }
    }
}

impl TorrentClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the configured default selector and seed.
    pub fn from_config(config: &UndertowConfig) -> Self {
        let selection = &config.selection;
        Self {
            selector: Arc::new(PieceSelector::from_kind(
                selection.default_selector,
                selection.seed,
            )),
            seed: selection.seed,
            ..Self::default()
        }
    }

    pub fn storage(&mut self, storage: impl Storage + 'static) -> &mut Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Uses a storage handle shared with other jobs.
    pub fn shared_storage(&mut self, storage: Arc<dyn Storage>) -> &mut Self {
        self.storage = Some(storage);
        self
    }

    /// Fetch the `.torrent` document from `url` when the job starts.
    pub fn torrent_url(&mut self, url: Url) -> &mut Self {
        self.replace_source(SourceDescriptor::Url(url))
    }

    /// Run `supplier` for the metadata when the job starts.
    pub fn torrent_supplier(&mut self, supplier: MetadataSupplier) -> &mut Self {
        self.replace_source(SourceDescriptor::Supplier(MetadataSource::Deferred(supplier)))
    }

    /// Use metadata that is already on hand.
    pub fn torrent_metadata(&mut self, metadata: TorrentMetadata) -> &mut Self {
        self.replace_source(SourceDescriptor::Supplier(MetadataSource::from(metadata)))
    }

    /// Parses `magnet_uri` leniently and uses it as the source.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidMagnetLink` - No usable info hash; the builder is unchanged
    pub fn magnet_uri(&mut self, magnet_uri: &str) -> Result<&mut Self, TorrentError> {
        let magnet = MagnetParser::lenient().parse(magnet_uri)?;
        Ok(self.magnet(magnet))
    }

    pub fn magnet(&mut self, magnet: MagnetLink) -> &mut Self {
        self.replace_source(SourceDescriptor::Magnet(magnet))
    }

    pub fn selector(&mut self, selector: PieceSelector) -> &mut Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Uses a ranking-only strategy as the selector.
    pub fn ranking_selector(&mut self, ranking: impl PieceRanking + 'static) -> &mut Self {
        self.selector(PieceSelector::adapted(ranking))
    }

    pub fn sequential_selector(&mut self) -> &mut Self {
        self.selector(PieceSelector::sequential())
    }

    pub fn rarest_selector(&mut self) -> &mut Self {
        self.selector(PieceSelector::rarest())
    }

    /// Randomized rarest-first, seeded when the builder came from a seeded config.
    pub fn randomized_rarest_selector(&mut self) -> &mut Self {
        let selector = match self.seed {
            Some(seed) => PieceSelector::randomized_rarest_seeded(seed),
            None => PieceSelector::randomized_rarest(),
        };
        self.selector(selector)
    }

    /// Active source, if any.
    pub fn source(&self) -> Option<&SourceDescriptor> {
        self.source.as_ref()
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.source {
            Some(SourceDescriptor::Url(url)) => Some(url),
            _ => None,
        }
    }

    pub fn supplier(&self) -> Option<&MetadataSource> {
        match &self.source {
            Some(SourceDescriptor::Supplier(source)) => Some(source),
            _ => None,
        }
    }

    pub fn magnet_link(&self) -> Option<&MagnetLink> {
        match &self.source {
            Some(SourceDescriptor::Magnet(magnet)) => Some(magnet),
            _ => None,
        }
    }

    pub fn current_selector(&self) -> &Arc<PieceSelector> {
        &self.selector
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Resolves the current configuration into a processing context.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::MissingStorage` - No storage set
    /// - `ConfigurationError::MissingSource` - No source set
    pub fn build(
        &self,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Result<ProcessingContext, ConfigurationError> {
        resolve(
            self.storage.clone(),
            self.source.as_ref(),
            Arc::clone(&self.selector),
            fetcher,
        )
    }

    fn replace_source(&mut self, source: SourceDescriptor) -> &mut Self {
        if let Some(previous) = &self.source {
            tracing::debug!("Replacing {} source with {}", previous.kind(), source.kind());
        }
        self.source = Some(source);
        self
    }
}

impl std::fmt::Debug for TorrentClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorrentClientBuilder")
            .field("has_storage", &self.storage.is_some())
            .field("source", &self.source)
            .field("selector", &self.selector)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_metadata(piece_count: usize) -> TorrentMetadata {
    TorrentMetadata {
        info_hash: crate::torrent::InfoHash::new([1; 20]),
        name: "test.bin".to_string(),
        piece_length: 16384,
        piece_hashes: vec![[0; 20]; piece_count],
        total_length: 16384 * piece_count as u64,
        files: vec![crate::torrent::TorrentFile {
            path: vec!["test.bin".to_string()],
            length: 16384 * piece_count as u64,
        }],
        announce_urls: Vec::new(),
    }
}
