use crate::config::Config;
use crate::error::{MetadataFetchError, RequestFailure};
use crate::http::{build_client, read_json};
use crate::models::{Genre, InternalMovie};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";
const YOUTUBE_WATCH: &str = "https://www.youtube.com/watch?v=";

pub type MetadataResult<T> = Result<T, MetadataFetchError>;

#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn popular(&self, page: u32) -> MetadataResult<Vec<MetadataMovie>>;
    async fn movie(&self, id: i64) -> MetadataResult<MovieDetail>;
    async fn videos(&self, id: i64) -> MetadataResult<Vec<MovieVideo>>;
    async fn search(&self, query: &str, page: u32) -> MetadataResult<Vec<MetadataMovie>>;
    async fn by_genre(&self, genre_id: i64, page: u32) -> MetadataResult<Vec<MetadataMovie>>;
    async fn genres(&self) -> MetadataResult<Vec<Genre>>;
}

/// A movie as the metadata service lists it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: MetadataMovie,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieVideo {
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailerPolicy {
    TrailerOnly,
    #[default]
    TrailerOrTeaser,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            build_client(config.request_timeout)?,
            &config.tmdb_base_url,
            &config.tmdb_api_key,
            &config.language,
        ))
    }

    fn url(&self, path: &str, extra: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language)
        );
        for (key, value) in extra {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> MetadataResult<T> {
        debug!(operation, "metadata request");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataFetchError::new(operation, e))?;
        read_json(res)
            .await
            .map_err(|e| MetadataFetchError::new(operation, e))
    }

    async fn get_results<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> MetadataResult<Vec<T>> {
        #[derive(Deserialize)]
        struct Paged<T> {
            results: Option<Vec<T>>,
        }

        let data: Paged<T> = self.get_json(operation, url).await?;
        data.results
            .ok_or_else(|| MetadataFetchError::new(operation, RequestFailure::Missing("results")))
    }
}

#[async_trait]
impl MetadataApi for TmdbClient {
    async fn popular(&self, page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        let url = self.url("/movie/popular", &[("page", page.to_string())]);
        self.get_results("popular", &url).await
    }

    async fn movie(&self, id: i64) -> MetadataResult<MovieDetail> {
        let url = self.url(&format!("/movie/{id}"), &[]);
        self.get_json("movie", &url).await
    }

    async fn videos(&self, id: i64) -> MetadataResult<Vec<MovieVideo>> {
        let url = self.url(&format!("/movie/{id}/videos"), &[]);
        self.get_results("videos", &url).await
    }

    async fn search(&self, query: &str, page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        let url = self.url(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        );
        self.get_results("search", &url).await
    }

    async fn by_genre(&self, genre_id: i64, page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        let url = self.url(
            "/discover/movie",
            &[("with_genres", genre_id.to_string()), ("page", page.to_string())],
        );
        self.get_results("by_genre", &url).await
    }

    async fn genres(&self) -> MetadataResult<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            genres: Option<Vec<Genre>>,
        }

        let url = self.url("/genre/movie/list", &[]);
        let data: GenreList = self.get_json("genres", &url).await?;
        data.genres
            .ok_or_else(|| MetadataFetchError::new("genres", RequestFailure::Missing("genres")))
    }
}

pub fn to_internal_movie(movie: &MetadataMovie) -> InternalMovie {
    to_internal_movie_at(movie, Utc::now())
}

/// Never fails: absent artwork stays absent instead of becoming a dangling CDN URL.
pub fn to_internal_movie_at(movie: &MetadataMovie, now: DateTime<Utc>) -> InternalMovie {
    InternalMovie {
        id: movie.id.to_string(),
        title: movie.title.clone(),
        overview: movie.overview.clone(),
        poster_path: image_url(POSTER_BASE, movie.poster_path.as_deref()),
        backdrop_path: image_url(BACKDROP_BASE, movie.backdrop_path.as_deref()),
        release_date: movie.release_date.clone(),
        rating: round_rating(movie.vote_average),
        category: "movie".to_string(),
        tmdb_id: movie.id,
        trailer_url: None,
        torrent_url: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty()).map(|p| format!("{base}{p}"))
}

pub fn round_rating(vote_average: f64) -> f64 {
    (vote_average * 10.0).round() / 10.0
}

pub fn pick_trailer_url(videos: &[MovieVideo]) -> Option<String> {
    pick_trailer_url_with(videos, TrailerPolicy::TrailerOnly)
}

/// First match in upstream order; no ranking between trailers and teasers.
pub fn pick_trailer_url_with(videos: &[MovieVideo], policy: TrailerPolicy) -> Option<String> {
    videos
        .iter()
        .find(|v| {
            v.site == "YouTube"
                && (v.video_type == "Trailer"
                    || (policy == TrailerPolicy::TrailerOrTeaser && v.video_type == "Teaser"))
        })
        .map(|v| format!("{YOUTUBE_WATCH}{}", v.key))
}
