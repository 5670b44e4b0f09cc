use crate::app_server::{AppServerApi, ServerResult};
use crate::error::{AdminError, ApplicationServerError, MetadataFetchError, RequestFailure};
use crate::http::cancellable;
use crate::models::InternalMovie;
use crate::session::SessionStore;
use crate::tmdb::{
    pick_trailer_url_with, to_internal_movie_at, MetadataApi, MetadataMovie, TrailerPolicy,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_IMPORT_COUNT: usize = 10;
/// The metadata service serves at most this many pages of a listing.
const MAX_POPULAR_PAGES: u32 = 500;
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this movie?";

/// Interactive yes/no gate in front of destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The metadata service had nothing to offer; no batch was sent.
    Nothing,
    Imported(usize),
}

pub struct AdminCatalog {
    metadata: Arc<dyn MetadataApi>,
    server: Arc<dyn AppServerApi>,
    session: Arc<SessionStore>,
    trailer_policy: TrailerPolicy,
    movies: RwLock<Vec<InternalMovie>>,
    cancel: CancellationToken,
}

impl AdminCatalog {
    pub fn new(
        metadata: Arc<dyn MetadataApi>,
        server: Arc<dyn AppServerApi>,
        session: Arc<SessionStore>,
        trailer_policy: TrailerPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            metadata,
            server,
            session,
            trailer_policy,
            movies: RwLock::new(Vec::new()),
            cancel,
        }
    }

    /// The local copy as of the last successful `list`.
    pub async fn movies(&self) -> Vec<InternalMovie> {
        self.movies.read().await.clone()
    }

    pub async fn filter(&self, query: &str) -> Vec<InternalMovie> {
        let needle = query.trim().to_lowercase();
        self.movies
            .read()
            .await
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn list(&self) -> Result<Vec<InternalMovie>, AdminError> {
        let session = self.session.require_admin()?;
        let movies = self
            .server_call("list_movies", self.server.list_movies(session.bearer()))
            .await?;
        *self.movies.write().await = movies.clone();
        Ok(movies)
    }

    /// The local list only changes after the server confirms the delete.
    pub async fn delete(&self, id: &str, confirm: &dyn Confirm) -> Result<DeleteOutcome, AdminError> {
        let session = self.session.require_admin()?;
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(e) = self
            .server_call("delete_movie", self.server.delete_movie(session.bearer(), id))
            .await
        {
            warn!("Failed to delete movie {}: {}", id, e);
            return Err(e.into());
        }
        self.movies.write().await.retain(|m| m.id != id);
        info!(id, "Movie deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Converts the top `count` popular movies, trailer included, and sends them
    /// as one batch. Counts above one page pull further pages. Any failure along
    /// the way aborts the whole import.
    pub async fn import_popular(&self, count: usize) -> Result<ImportOutcome, AdminError> {
        let session = self.session.require_admin()?;

        let picked = self.top_popular(count).await?;
        if picked.is_empty() {
            info!("Nothing to import");
            return Ok(ImportOutcome::Nothing);
        }

        let now = Utc::now();
        let policy = self.trailer_policy;
        let conversions = picked.iter().map(|movie| async move {
            let videos = self.metadata.videos(movie.id).await?;
            let mut internal = to_internal_movie_at(movie, now);
            internal.trailer_url = pick_trailer_url_with(&videos, policy);
            Ok::<_, MetadataFetchError>(internal)
        });
        let batch = self
            .metadata_call("videos", try_join_all(conversions))
            .await?;

        self.server_call(
            "import_movies",
            self.server.import_movies(session.bearer(), &batch),
        )
        .await?;
        info!(count = batch.len(), "Imported popular movies");

        if let Err(e) = self.list().await {
            warn!("Import succeeded but refreshing the list failed: {}", e);
        }
        Ok(ImportOutcome::Imported(batch.len()))
    }

    /// Walks the popular pages until `count` distinct movies are collected, a
    /// page comes back empty, or a page adds nothing new.
    async fn top_popular(&self, count: usize) -> Result<Vec<MetadataMovie>, MetadataFetchError> {
        let mut picked = Vec::with_capacity(count);
        let mut seen = HashSet::new();
        let mut page = 1;
        while picked.len() < count && page <= MAX_POPULAR_PAGES {
            let movies = self
                .metadata_call("popular", self.metadata.popular(page))
                .await?;
            let before = picked.len();
            picked.extend(movies.into_iter().filter(|m| seen.insert(m.id)));
            if picked.len() == before {
                break;
            }
            page += 1;
        }
        picked.truncate(count);
        debug!(requested = count, found = picked.len(), "Collected popular movies");
        Ok(picked)
    }

    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    async fn server_call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = ServerResult<T>>,
    ) -> ServerResult<T> {
        cancellable(&self.cancel, fut)
            .await
            .unwrap_or_else(|| Err(ApplicationServerError::new(operation, RequestFailure::Cancelled)))
    }

    async fn metadata_call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, MetadataFetchError>>,
    ) -> Result<T, MetadataFetchError> {
        cancellable(&self.cancel, fut)
            .await
            .unwrap_or_else(|| Err(MetadataFetchError::new(operation, RequestFailure::Cancelled)))
    }
}
