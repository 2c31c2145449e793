//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;
use undertow_core::client::{
    MetadataSupplier, ProcessingContext, SourceKind, TorrentClientBuilder,
};
use undertow_core::config::UndertowConfig;
use undertow_core::storage::{FileStorage, MemoryStorage};
use undertow_core::torrent::{
    BencodeTorrentParser, HttpMetadataFetcher, MagnetParser, MetadataFetcher, PieceIndex,
    PieceSelector, RarityTable, SelectorKind, TorrentParser,
};
use url::Url;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a torrent source into a processing context and preview its piece order
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Default)]
pub struct ResolveArgs {
    /// Magnet URI, http(s) URL of a .torrent file, or local .torrent path
    pub source: String,
    /// Directory to store pieces in
    #[arg(long, conflicts_with = "in_memory")]
    pub storage: Option<PathBuf>,
    /// Keep pieces in memory
    #[arg(long)]
    pub in_memory: bool,
    /// Piece selection strategy (defaults to UNDERTOW_SELECTOR or randomized-rarest)
    #[arg(long, value_enum)]
    pub selector: Option<SelectorKind>,
    /// Seed for randomized selection
    #[arg(long)]
    pub seed: Option<u64>,
    /// Reject magnet links with any malformed parameter
    #[arg(long)]
    pub strict: bool,
    /// Obtain the metadata now and plan the piece order
    #[arg(long)]
    pub fetch: bool,
    /// Number of planned pieces to show
    #[arg(long, default_value_t = 10)]
    pub preview: usize,
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// What the resolved job looks like.
#[derive(Debug, Serialize)]
pub struct ContextSummary {
    pub source: SourceKind,
    pub context: &'static str,
    pub selector: &'static str,
    pub info_hash: Option<String>,
    pub name: Option<String>,
    pub trackers: Vec<String>,
    pub piece_count: Option<u32>,
    pub pieces_held: Option<u32>,
    pub preview: Vec<u32>,
}

/// How the SOURCE argument was interpreted.
#[derive(Debug, PartialEq)]
enum SourceArg {
    Magnet(String),
    Url(Url),
    File(PathBuf),
}

fn classify_source(source: &str) -> SourceArg {
    let trimmed = source.trim();
    if trimmed
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:"))
    {
        return SourceArg::Magnet(trimmed.to_string());
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => SourceArg::Url(url),
        _ => SourceArg::File(PathBuf::from(trimmed)),
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Resolve(args) => {
            let summary = resolve_source(&args).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
    }
}

/// Populates a builder from `args`, resolves it and optionally plans the job.
///
/// # Errors
/// - `UndertowError` - Invalid source, missing storage, or failed metadata fetch
pub async fn resolve_source(args: &ResolveArgs) -> anyhow::Result<ContextSummary> {
    let config = UndertowConfig::from_env();
    let mut builder = TorrentClientBuilder::from_config(&config);

    if args.in_memory {
        builder.storage(MemoryStorage::new());
    } else if let Some(dir) = &args.storage {
        builder.storage(FileStorage::new(dir.clone()));
    }

    match (args.selector, args.seed) {
        (Some(kind), seed) => {
            builder.selector(PieceSelector::from_kind(kind, seed.or(config.selection.seed)));
        }
        (None, Some(seed)) => {
            let kind = config.selection.default_selector;
            builder.selector(PieceSelector::from_kind(kind, Some(seed)));
        }
        (None, None) => {}
    }

    match classify_source(&args.source) {
        SourceArg::Magnet(text) if args.strict => {
            let magnet = BencodeTorrentParser::with_magnet_parser(MagnetParser::strict())
                .parse_magnet_link(&text)
                .await
                .map_err(undertow_core::UndertowError::from)?;
            builder.magnet(magnet);
        }
        SourceArg::Magnet(text) => {
            builder
                .magnet_uri(&text)
                .map_err(undertow_core::UndertowError::from)?;
        }
        SourceArg::Url(url) => {
            builder.torrent_url(url);
        }
        SourceArg::File(path) => {
            tracing::debug!("Reading torrent file lazily from {}", path.display());
            let path = Arc::new(path);
            builder.torrent_supplier(MetadataSupplier::new(move || {
                let path = Arc::clone(&path);
                async move { BencodeTorrentParser::new().parse_torrent_file(&path).await }
            }));
        }
    }

    let fetcher: Arc<dyn MetadataFetcher> = Arc::new(
        HttpMetadataFetcher::new(&config.network).context("Failed to create HTTP client")?,
    );
    let context = builder
        .build(fetcher)
        .map_err(undertow_core::UndertowError::from)?;
    tracing::info!("Resolved {} job", context_label(&context));

    summarize(&context, args).await
}

fn context_label(context: &ProcessingContext) -> &'static str {
    if context.is_magnet() { "magnet" } else { "torrent" }
}

async fn summarize(
    context: &ProcessingContext,
    args: &ResolveArgs,
) -> anyhow::Result<ContextSummary> {
    let mut summary = ContextSummary {
        source: SourceKind::Magnet,
        context: context_label(context),
        selector: context.selector().name(),
        info_hash: context.info_hash().map(|hash| hash.to_string()),
        name: None,
        trackers: Vec::new(),
        piece_count: None,
        pieces_held: None,
        preview: Vec::new(),
    };

    match context {
        ProcessingContext::Magnet(magnet) => {
            let link = magnet.magnet();
            summary.name = link.display_name.clone();
            summary.trackers = link.trackers.clone();
            if args.fetch {
                tracing::info!("Magnet metadata comes from peers; nothing to fetch yet");
            }
        }
        ProcessingContext::Torrent(torrent) => {
            summary.source = torrent.origin();
            if let Some(metadata) = torrent.metadata_source().ready() {
                summary.name = Some(metadata.name.clone());
            }

            if args.fetch {
                // No swarm yet, so every piece is equally rare.
                let plan = torrent.plan(&RarityTable::new()).await?;
                summary.info_hash = Some(plan.metadata.info_hash.to_string());
                summary.name = Some(plan.metadata.name.clone());
                summary.trackers = plan.metadata.announce_urls.clone();
                summary.piece_count = Some(plan.metadata.piece_count());
                summary.pieces_held = Some(plan.local_have.count());
                summary.preview = plan
                    .order
                    .take(args.preview)
                    .map(PieceIndex::as_u32)
                    .collect();
            }
        }
    }

    Ok(summary)
}

fn print_summary(summary: &ContextSummary) {
    println!("Resolved {} job from {} source", summary.context, summary.source);
    println!("  Selector: {}", summary.selector);
    if let Some(info_hash) = &summary.info_hash {
        println!("  Info hash: {info_hash}");
    }
    if let Some(name) = &summary.name {
        println!("  Name: {name}");
    }
    for tracker in &summary.trackers {
        println!("  Tracker: {tracker}");
    }
    if let (Some(total), Some(held)) = (summary.piece_count, summary.pieces_held) {
        println!("  Pieces: {held}/{total} already stored");
        let preview: Vec<String> = summary.preview.iter().map(u32::to_string).collect();
        println!("  Next pieces: [{}]", preview.join(", "));
    }
}
