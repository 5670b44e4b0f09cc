use crate::error::{MetadataFetchError, RequestFailure};
use crate::http::cancellable;
use crate::tmdb::{
    image_url, pick_trailer_url_with, round_rating, MetadataApi, MovieDetail, TrailerPolicy,
    BACKDROP_BASE, POSTER_BASE,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything the detail page shows for one movie.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub tagline: Option<String>,
    pub release_date: String,
    pub rating: f64,
    pub runtime: Option<u32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
}

impl MovieDetails {
    fn assemble(detail: MovieDetail, trailer_url: Option<String>) -> Self {
        let MovieDetail {
            movie,
            genres,
            runtime,
            tagline,
        } = detail;
        Self {
            id: movie.id,
            poster_url: image_url(POSTER_BASE, movie.poster_path.as_deref()),
            backdrop_url: image_url(BACKDROP_BASE, movie.backdrop_path.as_deref()),
            rating: round_rating(movie.vote_average),
            title: movie.title,
            overview: movie.overview,
            tagline: tagline.filter(|t| !t.is_empty()),
            release_date: movie.release_date,
            runtime,
            genres: genres.into_iter().map(|g| g.name).collect(),
            trailer_url,
        }
    }
}

pub struct MovieDetailsView {
    metadata: Arc<dyn MetadataApi>,
    trailer_policy: TrailerPolicy,
    cancel: CancellationToken,
}

impl MovieDetailsView {
    pub fn new(
        metadata: Arc<dyn MetadataApi>,
        trailer_policy: TrailerPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            metadata,
            trailer_policy,
            cancel,
        }
    }

    pub async fn load(&self, id: i64) -> Result<MovieDetails, MetadataFetchError> {
        let fetch = async { tokio::try_join!(self.metadata.movie(id), self.metadata.videos(id)) };
        let (detail, videos) = cancellable(&self.cancel, fetch)
            .await
            .unwrap_or_else(|| Err(MetadataFetchError::new("movie", RequestFailure::Cancelled)))?;

        let trailer = pick_trailer_url_with(&videos, self.trailer_policy);
        info!(id, has_trailer = trailer.is_some(), "Loaded movie details");
        Ok(MovieDetails::assemble(detail, trailer))
    }

    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}
