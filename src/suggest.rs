//! Search box with as-you-type suggestions.
//!
//! Every keystroke fires a search. Responses can arrive out of order, so each
//! request carries a generation number and only the newest generation may write
//! the suggestion list.

use crate::error::MetadataFetchError;
use crate::http::cancellable;
use crate::tmdb::{MetadataApi, MetadataMovie};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    MovieDetail(i64),
    SearchResults(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestOutcome {
    Cleared,
    Applied(usize),
    /// A newer keystroke (or teardown) superseded this request.
    Stale,
}

pub struct SearchSuggest {
    metadata: Arc<dyn MetadataApi>,
    generation: AtomicU64,
    suggestions: watch::Sender<Vec<MetadataMovie>>,
    cancel: CancellationToken,
}

impl SearchSuggest {
    pub fn new(metadata: Arc<dyn MetadataApi>, cancel: CancellationToken) -> Self {
        let (suggestions, _) = watch::channel(Vec::new());
        Self {
            metadata,
            generation: AtomicU64::new(0),
            suggestions,
            cancel,
        }
    }

    pub fn suggestions(&self) -> Vec<MetadataMovie> {
        self.suggestions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<MetadataMovie>> {
        self.suggestions.subscribe()
    }

    pub async fn input(&self, query: &str) -> Result<SuggestOutcome, MetadataFetchError> {
        let generation = self.bump();
        let query = query.trim();
        if query.is_empty() {
            self.clear();
            return Ok(SuggestOutcome::Cleared);
        }

        let Some(result) = cancellable(&self.cancel, self.metadata.search(query, 1)).await else {
            debug!(query, "Suggestion request cancelled");
            return Ok(SuggestOutcome::Stale);
        };

        match result {
            Ok(mut movies) => {
                movies.truncate(SUGGESTION_LIMIT);
                let count = movies.len();
                // Checked under the channel's write lock so a newer generation's
                // write can never be overtaken by this one.
                let applied = self.suggestions.send_if_modified(|current| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *current = movies;
                    true
                });
                if applied {
                    Ok(SuggestOutcome::Applied(count))
                } else {
                    debug!(query, generation, "Discarding stale suggestions");
                    Ok(SuggestOutcome::Stale)
                }
            }
            Err(e) => {
                // The list belongs to an older query by now; drop it unless a
                // newer generation has already taken over.
                let mut stale = false;
                self.suggestions.send_if_modified(|current| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        stale = true;
                        return false;
                    }
                    let had_any = !current.is_empty();
                    current.clear();
                    had_any
                });
                if stale {
                    return Ok(SuggestOutcome::Stale);
                }
                warn!("Failed to fetch suggestions for '{}': {}", query, e);
                Err(e)
            }
        }
    }

    pub fn select(&self, movie_id: i64) -> Navigation {
        self.bump();
        self.clear();
        Navigation::MovieDetail(movie_id)
    }

    /// `None` for a blank query; the form does nothing in that case.
    pub fn submit(&self, query: &str) -> Option<Navigation> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.bump();
        self.clear();
        Some(Navigation::SearchResults(query.to_string()))
    }

    pub fn teardown(&self) {
        self.bump();
        self.cancel.cancel();
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn clear(&self) {
        self.suggestions.send_if_modified(|current| {
            if current.is_empty() {
                return false;
            }
            current.clear();
            true
        });
    }
}
