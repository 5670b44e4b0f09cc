#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use cineview::app_server::{AppServerApi, AuthGrant, RegisterAck, ServerResult};
use cineview::error::{ApplicationServerError, MetadataFetchError, RequestFailure};
use cineview::models::{Credentials, Genre, Identity, InternalMovie, Profile};
use cineview::tmdb::{MetadataApi, MetadataMovie, MetadataResult, MovieDetail, MovieVideo};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub fn movie(id: i64, title: &str) -> MetadataMovie {
    MetadataMovie {
        id,
        title: title.to_string(),
        overview: format!("{title} overview"),
        poster_path: Some(format!("/poster-{id}.jpg")),
        backdrop_path: None,
        release_date: "2024-05-01".to_string(),
        vote_average: 7.25,
        genre_ids: Some(vec![28]),
    }
}

pub fn movies(range: std::ops::Range<i64>, prefix: &str) -> Vec<MetadataMovie> {
    range.map(|i| movie(i, &format!("{prefix} {i}"))).collect()
}

pub fn video(site: &str, kind: &str, key: &str) -> MovieVideo {
    MovieVideo {
        site: site.to_string(),
        video_type: kind.to_string(),
        key: key.to_string(),
    }
}

pub fn internal(id: &str, title: &str) -> InternalMovie {
    let now = Utc::now();
    InternalMovie {
        id: id.to_string(),
        title: title.to_string(),
        overview: String::new(),
        poster_path: None,
        backdrop_path: None,
        release_date: "2020-01-01".to_string(),
        rating: 6.5,
        category: "movie".to_string(),
        tmdb_id: 1,
        trailer_url: None,
        torrent_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn metadata_error(operation: &'static str) -> MetadataFetchError {
    MetadataFetchError::new(
        operation,
        RequestFailure::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "upstream down".to_string(),
        },
    )
}

fn server_error(operation: &'static str, status: StatusCode, body: &str) -> ApplicationServerError {
    ApplicationServerError::new(
        operation,
        RequestFailure::Status {
            status,
            body: body.to_string(),
        },
    )
}

#[derive(Default)]
pub struct FakeMetadata {
    pub popular: Vec<MetadataMovie>,
    /// When set, `popular(page)` serves these instead; missing pages are empty.
    pub popular_pages: HashMap<u32, Vec<MetadataMovie>>,
    pub by_genre: HashMap<i64, Vec<MetadataMovie>>,
    pub genres: Vec<Genre>,
    pub videos: HashMap<i64, Vec<MovieVideo>>,
    pub search: HashMap<String, Vec<MetadataMovie>>,
    pub failing: HashSet<&'static str>,
    pub failing_queries: HashSet<String>,
    pub gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMetadata {
    /// Holds `search(query)` until the sender fires (or is dropped).
    pub fn gate_search(&self, query: &str, gate: oneshot::Receiver<()>) {
        self.gates.lock().unwrap().insert(query.to_string(), gate);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, detail: impl std::fmt::Display) -> MetadataResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{detail}"));
        if self.failing.contains(operation) {
            return Err(metadata_error(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataApi for FakeMetadata {
    async fn popular(&self, page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        self.record("popular", page)?;
        if self.popular_pages.is_empty() {
            return Ok(self.popular.clone());
        }
        Ok(self.popular_pages.get(&page).cloned().unwrap_or_default())
    }

    async fn movie(&self, id: i64) -> MetadataResult<MovieDetail> {
        self.record("movie", id)?;
        let movie = self
            .popular
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| metadata_error("movie"))?;
        Ok(MovieDetail {
            movie,
            genres: self.genres.clone(),
            runtime: Some(120),
            tagline: Some(String::new()),
        })
    }

    async fn videos(&self, id: i64) -> MetadataResult<Vec<MovieVideo>> {
        self.record("videos", id)?;
        Ok(self.videos.get(&id).cloned().unwrap_or_default())
    }

    async fn search(&self, query: &str, _page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        let gate = self.gates.lock().unwrap().remove(query);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.record("search", query)?;
        if self.failing_queries.contains(query) {
            return Err(metadata_error("search"));
        }
        Ok(self.search.get(query).cloned().unwrap_or_default())
    }

    async fn by_genre(&self, genre_id: i64, _page: u32) -> MetadataResult<Vec<MetadataMovie>> {
        self.record("by_genre", genre_id)?;
        Ok(self.by_genre.get(&genre_id).cloned().unwrap_or_default())
    }

    async fn genres(&self) -> MetadataResult<Vec<Genre>> {
        self.record("genres", "")?;
        Ok(self.genres.clone())
    }
}

pub struct FakeServer {
    users: Mutex<HashMap<String, (String, Identity)>>,
    tokens: Mutex<HashMap<String, Identity>>,
    pub movies: Mutex<Vec<InternalMovie>>,
    pub imports: Mutex<Vec<Vec<InternalMovie>>>,
    calls: Mutex<Vec<&'static str>>,
    pub register_ack: RegisterAck,
    pub fail_sign_out: bool,
    pub fail_profile: bool,
    pub fail_import: bool,
}

pub const ADMIN_TOKEN: &str = "tok-admin";

impl FakeServer {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "admin".to_string(),
            (
                "secret".to_string(),
                Identity {
                    id: "u-admin".to_string(),
                    username: "admin".to_string(),
                    is_admin: true,
                },
            ),
        );
        users.insert(
            "viewer".to_string(),
            (
                "pw".to_string(),
                Identity {
                    id: "u-viewer".to_string(),
                    username: "viewer".to_string(),
                    is_admin: false,
                },
            ),
        );
        Self {
            users: Mutex::new(users),
            tokens: Mutex::new(HashMap::new()),
            movies: Mutex::new(Vec::new()),
            imports: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            register_ack: RegisterAck::created(),
            fail_sign_out: false,
            fail_profile: false,
            fail_import: false,
        }
    }

    /// Makes `token` valid for `username` as if they had signed in earlier.
    pub fn issue(&self, token: &str, username: &str) {
        let identity = self.users.lock().unwrap()[username].1.clone();
        self.tokens.lock().unwrap().insert(token.to_string(), identity);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }

    fn authorize(&self, operation: &'static str, token: &str) -> ServerResult<Identity> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| server_error(operation, StatusCode::UNAUTHORIZED, "invalid session"))
    }
}

#[async_trait]
impl AppServerApi for FakeServer {
    async fn session(&self, token: &str) -> ServerResult<Identity> {
        self.record("session");
        self.authorize("session", token)
    }

    async fn profile(&self, user_id: &str, token: &str) -> ServerResult<Profile> {
        self.record("profile");
        let identity = self.authorize("profile", token)?;
        if self.fail_profile {
            return Err(server_error("profile", StatusCode::INTERNAL_SERVER_ERROR, "boom"));
        }
        assert_eq!(identity.id, user_id);
        Ok(Profile {
            id: identity.id,
            username: identity.username,
            avatar_url: None,
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> ServerResult<AuthGrant> {
        self.record("sign_in");
        let users = self.users.lock().unwrap();
        match users.get(&credentials.username) {
            Some((password, identity)) if *password == credentials.password => {
                let token = format!("tok-{}", credentials.username);
                self.tokens
                    .lock()
                    .unwrap()
                    .insert(token.clone(), identity.clone());
                Ok(AuthGrant {
                    token,
                    user: identity.clone(),
                })
            }
            _ => Err(server_error("sign_in", StatusCode::UNAUTHORIZED, "bad credentials")),
        }
    }

    async fn register(&self, credentials: &Credentials) -> ServerResult<RegisterAck> {
        self.record("register");
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&credentials.username) {
            return Err(server_error("register", StatusCode::CONFLICT, "username taken"));
        }
        users.insert(
            credentials.username.clone(),
            (
                credentials.password.clone(),
                Identity {
                    id: format!("u-{}", credentials.username),
                    username: credentials.username.clone(),
                    is_admin: false,
                },
            ),
        );
        Ok(self.register_ack.clone())
    }

    async fn sign_out(&self, token: &str) -> ServerResult<()> {
        self.record("sign_out");
        if self.fail_sign_out {
            return Err(server_error("sign_out", StatusCode::SERVICE_UNAVAILABLE, "down"));
        }
        self.tokens.lock().unwrap().remove(token);
        Ok(())
    }

    async fn list_movies(&self, token: &str) -> ServerResult<Vec<InternalMovie>> {
        self.record("list_movies");
        self.authorize("list_movies", token)?;
        Ok(self.movies.lock().unwrap().clone())
    }

    async fn delete_movie(&self, token: &str, id: &str) -> ServerResult<()> {
        self.record("delete_movie");
        self.authorize("delete_movie", token)?;
        let mut movies = self.movies.lock().unwrap();
        let before = movies.len();
        movies.retain(|m| m.id != id);
        if movies.len() == before {
            return Err(server_error("delete_movie", StatusCode::NOT_FOUND, "no such movie"));
        }
        Ok(())
    }

    async fn import_movies(&self, token: &str, batch: &[InternalMovie]) -> ServerResult<()> {
        self.record("import_movies");
        self.authorize("import_movies", token)?;
        self.imports.lock().unwrap().push(batch.to_vec());
        if self.fail_import {
            return Err(server_error("import_movies", StatusCode::INTERNAL_SERVER_ERROR, "db error"));
        }
        self.movies.lock().unwrap().extend(batch.iter().cloned());
        Ok(())
    }
}
