//! Shared plumbing for the metadata and application server clients.
use crate::error::RequestFailure;
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn build_client(timeout: Duration) -> Result<Client> {
    let user_agent = format!("cineview/{}", env!("CARGO_PKG_VERSION"));
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// Reads the whole body, failing on non-2xx with the body text attached.
pub(crate) async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, RequestFailure> {
    let bytes = read_success(res).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) async fn read_success(res: Response) -> Result<Vec<u8>, RequestFailure> {
    let status = res.status();
    let bytes = res.bytes().await?;
    if !status.is_success() {
        return Err(RequestFailure::Status {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(bytes.to_vec())
}

/// Runs `fut` unless `token` fires first; `None` means the caller was torn down
/// and the result must be dropped.
pub async fn cancellable<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}
