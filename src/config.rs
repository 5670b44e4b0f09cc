use crate::tmdb::{TrailerPolicy, TMDB_BASE};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "pt-BR";
pub const DEFAULT_APP_SERVER: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_GENRE_A: i64 = 28; // Action
const DEFAULT_GENRE_B: i64 = 35; // Comedy

pub const REQUIRED_ENV: [&str; 1] = ["TMDB_API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub language: String,
    pub app_server_url: String,
    /// `None` means the platform data directory.
    pub token_path: Option<PathBuf>,
    pub request_timeout: Duration,
    pub genre_a: i64,
    pub genre_b: i64,
    pub trailer_policy: TrailerPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .context("TMDB_API_KEY not set")?;

        let request_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {raw}"))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: env_or("TMDB_BASE_URL", TMDB_BASE),
            language: env_or("TMDB_LANGUAGE", DEFAULT_LANGUAGE),
            app_server_url: env_or("APP_SERVER_URL", DEFAULT_APP_SERVER),
            token_path: env::var("CINEVIEW_TOKEN_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            request_timeout,
            genre_a: genre_env("CATALOG_GENRE_A", DEFAULT_GENRE_A)?,
            genre_b: genre_env("CATALOG_GENRE_B", DEFAULT_GENRE_B)?,
            trailer_policy: if parse_flag(env::var("TRAILER_ACCEPT_TEASERS").ok().as_deref())
                .unwrap_or(true)
            {
                TrailerPolicy::TrailerOrTeaser
            } else {
                TrailerPolicy::TrailerOnly
            },
        })
    }

    /// Defaults for everything but the key; handy for tests and local stubs.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            tmdb_api_key: api_key.into(),
            tmdb_base_url: TMDB_BASE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            app_server_url: DEFAULT_APP_SERVER.to_string(),
            token_path: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            genre_a: DEFAULT_GENRE_A,
            genre_b: DEFAULT_GENRE_B,
            trailer_policy: TrailerPolicy::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn genre_env(key: &str, default: i64) -> Result<i64> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is not a genre id: {raw}")),
        _ => Ok(default),
    }
}

fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
