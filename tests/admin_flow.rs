mod common;

use cineview::admin::{AdminCatalog, DeleteOutcome, ImportOutcome, DEFAULT_IMPORT_COUNT};
use cineview::error::{AdminError, AuthError};
use cineview::models::Credentials;
use cineview::session::SessionStore;
use cineview::tmdb::TrailerPolicy;
use cineview::token_store::MemoryTokenStore;
use common::{internal, movie, movies, video, FakeMetadata, FakeServer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Harness {
    admin: AdminCatalog,
    server: Arc<FakeServer>,
    metadata: Arc<FakeMetadata>,
}

async fn harness(metadata: FakeMetadata, server: FakeServer, user: (&str, &str)) -> Harness {
    let server = Arc::new(server);
    let metadata = Arc::new(metadata);
    let session = Arc::new(SessionStore::new(
        server.clone(),
        Arc::new(MemoryTokenStore::new()),
    ));
    session
        .sign_in(&Credentials::new(user.0, user.1))
        .await
        .unwrap();
    let admin = AdminCatalog::new(
        metadata.clone(),
        server.clone(),
        session,
        TrailerPolicy::TrailerOrTeaser,
        CancellationToken::new(),
    );
    Harness {
        admin,
        server,
        metadata,
    }
}

fn seeded_server() -> FakeServer {
    let server = FakeServer::new();
    *server.movies.lock().unwrap() = vec![
        internal("m1", "The Godfather"),
        internal("m2", "Godzilla"),
        internal("m3", "Amélie"),
    ];
    server
}

fn yes(_: &str) -> bool {
    true
}

#[tokio::test]
async fn list_replaces_local_copy_and_filters() {
    let h = harness(FakeMetadata::default(), seeded_server(), ("admin", "secret")).await;

    let listed = h.admin.list().await.unwrap();

    assert_eq!(listed.len(), 3);
    assert_eq!(h.admin.movies().await, listed);
    let god: Vec<_> = h
        .admin
        .filter("GOD")
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(god, vec!["m1", "m2"]);
    assert_eq!(h.admin.filter("").await.len(), 3);
}

#[tokio::test]
async fn non_admin_is_refused_before_any_call() {
    let h = harness(FakeMetadata::default(), seeded_server(), ("viewer", "pw")).await;
    let before = h.server.calls().len();

    let err = h.admin.list().await.unwrap_err();

    assert!(matches!(err, AdminError::Auth(AuthError::Forbidden)));
    assert_eq!(h.server.calls().len(), before);
}

#[tokio::test]
async fn delete_removes_after_confirmation() {
    let h = harness(FakeMetadata::default(), seeded_server(), ("admin", "secret")).await;
    h.admin.list().await.unwrap();

    let outcome = h.admin.delete("m2", &yes).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    let ids: Vec<_> = h.admin.movies().await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["m1", "m3"]);
}

#[tokio::test]
async fn declined_delete_makes_no_request() {
    let h = harness(FakeMetadata::default(), seeded_server(), ("admin", "secret")).await;
    h.admin.list().await.unwrap();
    let asked = AtomicUsize::new(0);
    let decline = |prompt: &str| {
        assert!(prompt.contains("delete"));
        asked.fetch_add(1, Ordering::SeqCst);
        false
    };

    let outcome = h.admin.delete("m1", &decline).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert!(!h.server.calls().contains(&"delete_movie"));
    assert_eq!(h.admin.movies().await.len(), 3);
}

#[tokio::test]
async fn deleting_unknown_id_fails_and_keeps_list() {
    let h = harness(FakeMetadata::default(), seeded_server(), ("admin", "secret")).await;
    let before = h.admin.list().await.unwrap();

    let err = h.admin.delete("missing", &yes).await.unwrap_err();

    match err {
        AdminError::Server(e) => assert_eq!(e.status(), Some(reqwest::StatusCode::NOT_FOUND)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.admin.movies().await, before);
}

#[tokio::test]
async fn import_sends_one_batch_with_trailers() {
    let mut metadata = FakeMetadata {
        popular: movies(1..13, "Hit"),
        ..Default::default()
    };
    metadata
        .videos
        .insert(1, vec![video("Vimeo", "Trailer", "v"), video("YouTube", "Trailer", "yt1")]);
    metadata.videos.insert(2, vec![video("YouTube", "Teaser", "tz2")]);
    let h = harness(metadata, FakeServer::new(), ("admin", "secret")).await;

    let outcome = h.admin.import_popular(DEFAULT_IMPORT_COUNT).await.unwrap();

    assert_eq!(outcome, ImportOutcome::Imported(10));
    let imports = h.server.imports.lock().unwrap().clone();
    assert_eq!(imports.len(), 1);
    let batch = &imports[0];
    assert_eq!(batch.len(), 10);
    assert_eq!(batch[0].id, "1");
    assert_eq!(
        batch[0].trailer_url.as_deref(),
        Some("https://www.youtube.com/watch?v=yt1")
    );
    assert_eq!(
        batch[1].trailer_url.as_deref(),
        Some("https://www.youtube.com/watch?v=tz2")
    );
    assert_eq!(batch[2].trailer_url, None);
    assert_eq!(batch[0].rating, 7.3);
    let video_calls = h
        .metadata
        .calls()
        .iter()
        .filter(|c| c.starts_with("videos"))
        .count();
    assert_eq!(video_calls, 10);
    // refreshed from the server after the import
    assert_eq!(h.admin.movies().await.len(), 10);
}

#[tokio::test]
async fn import_with_empty_popular_list_sends_nothing() {
    let h = harness(FakeMetadata::default(), FakeServer::new(), ("admin", "secret")).await;

    let outcome = h.admin.import_popular(DEFAULT_IMPORT_COUNT).await.unwrap();

    assert_eq!(outcome, ImportOutcome::Nothing);
    assert!(!h.server.calls().contains(&"import_movies"));
    assert!(h.server.imports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn import_aborts_when_videos_fail() {
    let mut metadata = FakeMetadata {
        popular: vec![movie(1, "One"), movie(2, "Two")],
        ..Default::default()
    };
    metadata.failing.insert("videos");
    let h = harness(metadata, FakeServer::new(), ("admin", "secret")).await;

    let err = h.admin.import_popular(5).await.unwrap_err();

    assert!(matches!(err, AdminError::Metadata(ref e) if e.operation == "videos"));
    assert!(h.server.imports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_batch_is_one_error() {
    let mut server = seeded_server();
    server.fail_import = true;
    let metadata = FakeMetadata {
        popular: movies(1..4, "Hit"),
        ..Default::default()
    };
    let h = harness(metadata, server, ("admin", "secret")).await;
    h.admin.list().await.unwrap();

    let err = h.admin.import_popular(3).await.unwrap_err();

    assert!(matches!(err, AdminError::Server(ref e) if e.operation == "import_movies"));
    assert_eq!(h.admin.movies().await.len(), 3);
}

fn paged_metadata(pages: &[(u32, std::ops::Range<i64>)]) -> FakeMetadata {
    let mut metadata = FakeMetadata::default();
    for (page, ids) in pages {
        metadata
            .popular_pages
            .insert(*page, movies(ids.clone(), &format!("Page {page}")));
    }
    metadata
}

#[tokio::test]
async fn import_beyond_one_page_walks_further_pages() {
    let metadata = paged_metadata(&[(1, 1..21), (2, 21..41), (3, 41..61)]);
    let h = harness(metadata, FakeServer::new(), ("admin", "secret")).await;

    let outcome = h.admin.import_popular(30).await.unwrap();

    assert_eq!(outcome, ImportOutcome::Imported(30));
    let batch = h.server.imports.lock().unwrap()[0].clone();
    assert_eq!(batch.len(), 30);
    assert_eq!(batch[0].id, "1");
    assert_eq!(batch[29].id, "30");
    let pages: Vec<_> = h
        .metadata
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("popular"))
        .collect();
    assert_eq!(pages, vec!["popular:1", "popular:2"]);
}

#[tokio::test]
async fn import_stops_at_the_last_page() {
    let metadata = paged_metadata(&[(1, 1..21), (2, 21..26)]);
    let h = harness(metadata, FakeServer::new(), ("admin", "secret")).await;

    let outcome = h.admin.import_popular(30).await.unwrap();

    assert_eq!(outcome, ImportOutcome::Imported(25));
    assert!(h.metadata.calls().contains(&"popular:3".to_string()));
    assert!(!h.metadata.calls().contains(&"popular:4".to_string()));
}

#[tokio::test]
async fn import_skips_movies_repeated_across_pages() {
    let metadata = paged_metadata(&[(1, 1..21), (2, 15..35)]);
    let h = harness(metadata, FakeServer::new(), ("admin", "secret")).await;

    h.admin.import_popular(25).await.unwrap();

    let batch = h.server.imports.lock().unwrap()[0].clone();
    let ids: Vec<_> = batch.iter().map(|m| m.tmdb_id).collect();
    assert_eq!(ids, (1..26).collect::<Vec<i64>>());
}
