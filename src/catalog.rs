use crate::error::{MetadataFetchError, RequestFailure};
use crate::http::cancellable;
use crate::tmdb::{MetadataApi, MetadataMovie, MetadataResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How many popular titles make up the "latest" hero carousel.
pub const LATEST_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Latest,
    Popular,
    GenreA,
    GenreB,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Latest,
        BucketKind::Popular,
        BucketKind::GenreA,
        BucketKind::GenreB,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BucketKind::Latest => "latest",
            BucketKind::Popular => "popular",
            BucketKind::GenreA => "by-genre-A",
            BucketKind::GenreB => "by-genre-B",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreBucket {
    pub genre_id: i64,
    pub movies: Vec<MetadataMovie>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogData {
    pub latest: Vec<MetadataMovie>,
    pub popular: Vec<MetadataMovie>,
    pub genre_a: GenreBucket,
    pub genre_b: GenreBucket,
    pub genre_names: HashMap<i64, String>,
}

impl CatalogData {
    pub fn bucket(&self, kind: BucketKind) -> &[MetadataMovie] {
        match kind {
            BucketKind::Latest => &self.latest,
            BucketKind::Popular => &self.popular,
            BucketKind::GenreA => &self.genre_a.movies,
            BucketKind::GenreB => &self.genre_b.movies,
        }
    }

    /// Display title for a bucket; genre buckets use the genre table name.
    pub fn title(&self, kind: BucketKind) -> String {
        let genre = match kind {
            BucketKind::GenreA => self.genre_a.genre_id,
            BucketKind::GenreB => self.genre_b.genre_id,
            other => return other.key().to_string(),
        };
        self.genre_names
            .get(&genre)
            .cloned()
            .unwrap_or_else(|| format!("genre {genre}"))
    }

    /// Unknown genre ids are skipped.
    pub fn genre_names(&self, movie: &MetadataMovie) -> Vec<&str> {
        movie
            .genre_ids
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.genre_names.get(id).map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogStatus {
    Loading,
    Ready(Arc<CatalogData>),
    Error(String),
}

pub struct CatalogViewModel {
    metadata: Arc<dyn MetadataApi>,
    genre_a: i64,
    genre_b: i64,
    status: watch::Sender<CatalogStatus>,
    cancel: CancellationToken,
}

impl CatalogViewModel {
    pub fn new(
        metadata: Arc<dyn MetadataApi>,
        genre_a: i64,
        genre_b: i64,
        cancel: CancellationToken,
    ) -> Self {
        let (status, _) = watch::channel(CatalogStatus::Loading);
        Self {
            metadata,
            genre_a,
            genre_b,
            status,
            cancel,
        }
    }

    pub fn status(&self) -> CatalogStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogStatus> {
        self.status.subscribe()
    }

    /// All four requests must succeed; a single failure puts the whole view in
    /// `Error`. If the view is torn down mid-load the result is dropped and the
    /// status goes back to what it was before the load.
    pub async fn load(&self) -> CatalogStatus {
        let previous = self.status.send_replace(CatalogStatus::Loading);
        let fetch = async {
            tokio::try_join!(
                self.metadata.popular(1),
                self.metadata.by_genre(self.genre_a, 1),
                self.metadata.by_genre(self.genre_b, 1),
                self.metadata.genres(),
            )
        };

        let next = match cancellable(&self.cancel, fetch).await {
            None => {
                debug!("Catalog load cancelled");
                self.status.send_replace(previous.clone());
                return previous;
            }
            Some(Ok((popular, genre_a, genre_b, genres))) => {
                let data = CatalogData {
                    latest: popular.iter().take(LATEST_COUNT).cloned().collect(),
                    popular,
                    genre_a: GenreBucket {
                        genre_id: self.genre_a,
                        movies: genre_a,
                    },
                    genre_b: GenreBucket {
                        genre_id: self.genre_b,
                        movies: genre_b,
                    },
                    genre_names: genres.into_iter().map(|g| (g.id, g.name)).collect(),
                };
                info!(
                    popular = data.popular.len(),
                    genre_a = data.genre_a.movies.len(),
                    genre_b = data.genre_b.movies.len(),
                    "Catalog loaded"
                );
                CatalogStatus::Ready(Arc::new(data))
            }
            Some(Err(e)) => {
                warn!("Catalog load failed: {}", e);
                CatalogStatus::Error(format!("Could not load movies: {e}"))
            }
        };
        self.status.send_replace(next.clone());
        next
    }

    pub async fn retry(&self) -> CatalogStatus {
        self.load().await
    }

    /// Backs the search-results route reached by submitting the search box.
    pub async fn search_results(&self, query: &str, page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        cancellable(&self.cancel, self.metadata.search(query, page))
            .await
            .unwrap_or_else(|| Err(MetadataFetchError::new("search", RequestFailure::Cancelled)))
    }

    /// Empty until the catalog is ready.
    pub fn genre_names(&self, movie: &MetadataMovie) -> Vec<String> {
        match &*self.status.borrow() {
            CatalogStatus::Ready(data) => data
                .genre_names(movie)
                .into_iter()
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}
