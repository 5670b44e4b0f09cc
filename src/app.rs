use crate::admin::AdminCatalog;
use crate::app_server::{AppServerApi, AppServerClient};
use crate::catalog::CatalogViewModel;
use crate::config::Config;
use crate::details::MovieDetailsView;
use crate::session::{SessionState, SessionStore};
use crate::suggest::SearchSuggest;
use crate::tmdb::{MetadataApi, TmdbClient, TrailerPolicy};
use crate::token_store::{FileTokenStore, TokenStore};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Process-wide services. Views are created from here and inherit a child of the
/// root cancellation token, so `teardown` stops everything still in flight.
#[derive(Clone)]
pub struct AppContext {
    pub metadata: Arc<dyn MetadataApi>,
    pub server: Arc<dyn AppServerApi>,
    pub session: Arc<SessionStore>,
    genre_a: i64,
    genre_b: i64,
    trailer_policy: TrailerPolicy,
    shutdown: CancellationToken,
}

impl AppContext {
    pub async fn init(config: &Config) -> Result<Self> {
        let metadata: Arc<dyn MetadataApi> = Arc::new(TmdbClient::from_config(config)?);
        let server: Arc<dyn AppServerApi> = Arc::new(AppServerClient::from_config(config)?);
        let store = match &config.token_path {
            Some(path) => FileTokenStore::new(path),
            None => FileTokenStore::in_data_dir()?,
        };
        debug!(path = %store.path().display(), "Session token file");
        let tokens: Arc<dyn TokenStore> = Arc::new(store);
        let ctx = Self::with_services(metadata, server, tokens, config);
        ctx.start().await;
        Ok(ctx)
    }

    /// Wires pre-built services without touching the network.
    pub fn with_services(
        metadata: Arc<dyn MetadataApi>,
        server: Arc<dyn AppServerApi>,
        tokens: Arc<dyn TokenStore>,
        config: &Config,
    ) -> Self {
        let session = Arc::new(SessionStore::new(server.clone(), tokens));
        Self {
            metadata,
            server,
            session,
            genre_a: config.genre_a,
            genre_b: config.genre_b,
            trailer_policy: config.trailer_policy,
            shutdown: CancellationToken::new(),
        }
    }

    /// Restores the previous session, once, at start-up.
    pub async fn start(&self) -> SessionState {
        let state = self.session.restore_session().await;
        info!(
            authenticated = state.is_authenticated(),
            "Application context ready"
        );
        state
    }

    pub fn catalog(&self) -> CatalogViewModel {
        CatalogViewModel::new(
            self.metadata.clone(),
            self.genre_a,
            self.genre_b,
            self.shutdown.child_token(),
        )
    }

    pub fn search_suggest(&self) -> SearchSuggest {
        SearchSuggest::new(self.metadata.clone(), self.shutdown.child_token())
    }

    pub fn movie_details(&self) -> MovieDetailsView {
        MovieDetailsView::new(
            self.metadata.clone(),
            self.trailer_policy,
            self.shutdown.child_token(),
        )
    }

    pub fn admin(&self) -> AdminCatalog {
        AdminCatalog::new(
            self.metadata.clone(),
            self.server.clone(),
            self.session.clone(),
            self.trailer_policy,
            self.shutdown.child_token(),
        )
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancels every view's outstanding requests. The stored token is kept so the
    /// next start can restore the session.
    pub fn teardown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Tearing down application context");
            self.shutdown.cancel();
        }
    }
}
