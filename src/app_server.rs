use crate::config::Config;
use crate::error::{ApplicationServerError, RequestFailure};
use crate::http::{build_client, read_json, read_success};
use crate::models::{Credentials, Identity, InternalMovie, Profile};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type ServerResult<T> = Result<T, ApplicationServerError>;

/// The acknowledgment status `POST register` returns on success.
pub const REGISTER_CREATED: &str = "created";

#[async_trait]
pub trait AppServerApi: Send + Sync {
    async fn session(&self, token: &str) -> ServerResult<Identity>;
    async fn profile(&self, user_id: &str, token: &str) -> ServerResult<Profile>;
    async fn sign_in(&self, credentials: &Credentials) -> ServerResult<AuthGrant>;
    async fn register(&self, credentials: &Credentials) -> ServerResult<RegisterAck>;
    async fn sign_out(&self, token: &str) -> ServerResult<()>;
    async fn list_movies(&self, token: &str) -> ServerResult<Vec<InternalMovie>>;
    async fn delete_movie(&self, token: &str, id: &str) -> ServerResult<()>;
    /// All-or-nothing: a non-2xx answer means none of the batch was stored.
    async fn import_movies(&self, token: &str, movies: &[InternalMovie]) -> ServerResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterAck {
    pub status: String,
}

impl RegisterAck {
    pub fn created() -> Self {
        Self {
            status: REGISTER_CREATED.to_string(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.status == REGISTER_CREATED
    }
}

#[derive(Debug, Clone)]
pub struct AppServerClient {
    client: Client,
    base_url: String,
}

impl AppServerClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            build_client(config.request_timeout)?,
            &config.app_server_url,
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        req: RequestBuilder,
    ) -> ServerResult<T> {
        debug!(operation, "application server request");
        let res = req
            .send()
            .await
            .map_err(|e| ApplicationServerError::new(operation, e))?;
        read_json(res)
            .await
            .map_err(|e| ApplicationServerError::new(operation, e))
    }

    async fn send_empty(&self, operation: &'static str, req: RequestBuilder) -> ServerResult<()> {
        debug!(operation, "application server request");
        let res = req
            .send()
            .await
            .map_err(|e| ApplicationServerError::new(operation, e))?;
        read_success(res)
            .await
            .map(|_| ())
            .map_err(|e| ApplicationServerError::new(operation, e))
    }
}

#[async_trait]
impl AppServerApi for AppServerClient {
    async fn session(&self, token: &str) -> ServerResult<Identity> {
        #[derive(Deserialize)]
        struct SessionBody {
            user: Option<Identity>,
        }

        let req = self.client.get(self.url("session")).bearer_auth(token);
        let body: SessionBody = self.send_json("session", req).await?;
        body.user
            .ok_or_else(|| ApplicationServerError::new("session", RequestFailure::Missing("user")))
    }

    async fn profile(&self, user_id: &str, token: &str) -> ServerResult<Profile> {
        let url = self.url(&format!("profile/{}", urlencoding::encode(user_id)));
        let req = self.client.get(url).bearer_auth(token);
        self.send_json("profile", req).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> ServerResult<AuthGrant> {
        let req = self.client.post(self.url("auth")).json(credentials);
        self.send_json("sign_in", req).await
    }

    async fn register(&self, credentials: &Credentials) -> ServerResult<RegisterAck> {
        let req = self.client.post(self.url("register")).json(credentials);
        self.send_json("register", req).await
    }

    async fn sign_out(&self, token: &str) -> ServerResult<()> {
        let req = self.client.post(self.url("signout")).bearer_auth(token);
        self.send_empty("sign_out", req).await
    }

    async fn list_movies(&self, token: &str) -> ServerResult<Vec<InternalMovie>> {
        let req = self.client.get(self.url("movies")).bearer_auth(token);
        self.send_json("list_movies", req).await
    }

    async fn delete_movie(&self, token: &str, id: &str) -> ServerResult<()> {
        let url = self.url(&format!("movies/{}", urlencoding::encode(id)));
        let req = self.client.delete(url).bearer_auth(token);
        self.send_empty("delete_movie", req).await
    }

    async fn import_movies(&self, token: &str, movies: &[InternalMovie]) -> ServerResult<()> {
        let req = self
            .client
            .post(self.url("movies/import"))
            .bearer_auth(token)
            .json(movies);
        self.send_empty("import_movies", req).await
    }
}
