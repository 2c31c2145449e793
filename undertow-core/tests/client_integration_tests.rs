//! Integration tests for the client builder.
//!
//! These tests drive the public API end to end: configure a builder, build a
//! processing context, obtain metadata through the real fetcher or a
//! supplier, and plan the initial piece order against file storage.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use undertow_core::client::{MetadataSupplier, ProcessingContext, SourceKind};
use undertow_core::config::UndertowConfig;
use undertow_core::storage::{FileStorage, Storage};
use undertow_core::torrent::parsing::MetainfoDecoder;
use undertow_core::torrent::{
    HttpMetadataFetcher, MetadataFetcher, PieceIndex, RarityTable, SelectorKind, TorrentError,
};
use undertow_core::{ConfigurationError, TorrentClientBuilder, UndertowError};
use url::Url;

/// Two files, three 512-byte pieces.
const MULTI_FILE: &[u8] = b"d8:announce28:http://tracker.test/announce4:infod5:filesld6:lengthi700e4:pathl1:aeed6:lengthi800e4:pathl3:sub1:beee4:name4:pack12:piece lengthi512e6:pieces60:aaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbccccccccccccccccccccee";

/// Test fixture owning a temporary download directory.
struct ClientFixture {
    _temp_dir: tempfile::TempDir,
    storage: Arc<FileStorage>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl ClientFixture {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(temp_dir.path().join("downloads")));
        let fetcher =
            Arc::new(HttpMetadataFetcher::new(&UndertowConfig::for_testing().network).unwrap());

        Self {
            _temp_dir: temp_dir,
            storage,
            fetcher,
        }
    }

    fn builder(&self) -> TorrentClientBuilder {
        let mut builder = TorrentClientBuilder::from_config(&UndertowConfig::for_testing());
        builder.shared_storage(self.storage.clone());
        builder
    }

    fn build(&self, builder: &TorrentClientBuilder) -> ProcessingContext {
        builder.build(Arc::clone(&self.fetcher)).unwrap()
    }
}

/// Serves `body` with status 200 to a single connection.
async fn serve_torrent(body: &'static [u8]) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-bittorrent\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = socket.write_all(header.as_bytes()).await;
        let _ = socket.write_all(body).await;
        let _ = socket.shutdown().await;
    });

    Url::parse(&format!("http://{addr}/pack.torrent")).unwrap()
}

#[tokio::test]
async fn test_url_source_fetches_when_job_starts() {
    let fixture = ClientFixture::new();
    let url = serve_torrent(MULTI_FILE).await;

    let mut builder = fixture.builder();
    builder.torrent_url(url).sequential_selector();
    let context = fixture.build(&builder);

    let torrent = context.as_torrent().unwrap();
    assert_eq!(torrent.origin(), SourceKind::Url);
    assert_eq!(context.info_hash(), None);

    let plan = torrent.plan(&RarityTable::new()).await.unwrap();
    assert_eq!(plan.metadata.name, "pack");
    assert_eq!(plan.metadata.total_length, 1500);
    assert_eq!(plan.metadata.announce_urls, vec!["http://tracker.test/announce"]);
    let order: Vec<u32> = plan.order.map(PieceIndex::as_u32).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_plan_respects_storage_and_rarity() {
    let fixture = ClientFixture::new();
    let metadata = MetainfoDecoder::decode(MULTI_FILE).unwrap();
    fixture
        .storage
        .store_piece(metadata.info_hash, PieceIndex::new(1), &[0u8; 512])
        .await
        .unwrap();

    let mut builder = fixture.builder();
    builder.torrent_metadata(metadata).rarest_selector();
    let context = fixture.build(&builder);

    let rarity = RarityTable::from([(0, 4), (1, 1), (2, 2)]);
    let plan = context.as_torrent().unwrap().plan(&rarity).await.unwrap();

    assert!(plan.local_have.has_piece(PieceIndex::new(1)));
    let order: Vec<u32> = plan.order.map(PieceIndex::as_u32).collect();
    assert_eq!(order, vec![2, 0]);
}

#[tokio::test]
async fn test_blocking_file_supplier() {
    let fixture = ClientFixture::new();
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("pack.torrent");
    std::fs::write(&path, MULTI_FILE).unwrap();

    let mut builder = fixture.builder();
    builder.torrent_supplier(MetadataSupplier::blocking(move || {
        let bytes = std::fs::read(&path)?;
        MetainfoDecoder::decode(&bytes)
    }));
    let context = fixture.build(&builder);

    let metadata = context.as_torrent().unwrap().metadata().await.unwrap();
    assert_eq!(metadata.files.len(), 2);
    assert_eq!(metadata.files[1].path, vec!["sub", "b"]);
}

#[tokio::test]
async fn test_magnet_context_carries_link() {
    let fixture = ClientFixture::new();
    let mut builder = fixture.builder();
    builder
        .magnet_uri("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&tr=udp%3A%2F%2Ftracker.test%3A80&x.pe=127.0.0.1:51413")
        .unwrap();

    let context = fixture.build(&builder);
    let magnet = context.as_magnet().unwrap().magnet();

    assert_eq!(
        context.info_hash().map(|hash| hash.to_string()).as_deref(),
        Some("0123456789abcdef0123456789abcdef01234567")
    );
    assert_eq!(magnet.trackers, vec!["udp://tracker.test:80"]);
    assert_eq!(magnet.peers.len(), 1);
    assert_eq!(
        context.selector().kind(),
        Some(SelectorKind::RandomizedRarest)
    );
}

#[tokio::test]
async fn test_unreachable_url_fails_only_at_fetch() {
    let fixture = ClientFixture::new();
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut builder = fixture.builder();
    builder.torrent_url(Url::parse(&format!("http://{addr}/gone.torrent")).unwrap());
    let context = fixture.build(&builder);

    let result = context.as_torrent().unwrap().plan(&RarityTable::new()).await;
    assert!(matches!(
        result,
        Err(UndertowError::Torrent(TorrentError::Http(_)))
    ));
}

#[test]
fn test_missing_configuration_is_reported() {
    let fixture = ClientFixture::new();

    let mut builder = TorrentClientBuilder::new();
    builder
        .torrent_url(Url::parse("http://example.com/a.torrent").unwrap());
    assert_eq!(
        builder.build(Arc::clone(&fixture.fetcher)).unwrap_err(),
        ConfigurationError::MissingStorage
    );

    let error = UndertowError::from(
        fixture.builder().build(Arc::clone(&fixture.fetcher)).unwrap_err(),
    );
    assert!(error.is_user_error());
}
