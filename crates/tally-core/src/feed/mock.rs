//! Mock provider for testing
//!
//! Returns a scripted snapshot (or failure) for every fetch and counts calls,
//! so reconciler tests can run without a network. The `since` window is
//! ignored, like a provider that over-returns history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::FeedProviderKind;

use super::{BankFeedProvider, FeedSnapshot};

/// What the next fetch should do
#[derive(Debug, Clone)]
pub enum MockResponse {
    Snapshot(FeedSnapshot),
    /// Fail with a credential error carrying this text
    Revoked(String),
    /// Fail with a non-credential provider error
    Unavailable(String),
    /// Sleep before answering, to exercise timeouts
    Delay(Duration, FeedSnapshot),
}

#[derive(Clone)]
pub struct MockProvider {
    kind: FeedProviderKind,
    response: Arc<Mutex<MockResponse>>,
    fetches: Arc<AtomicUsize>,
}

impl MockProvider {
    /// A SimpleFIN-flavoured mock that returns an empty snapshot
    pub fn new() -> Self {
        Self::with_kind(FeedProviderKind::SimpleFin)
    }

    pub fn with_kind(kind: FeedProviderKind) -> Self {
        Self {
            kind,
            response: Arc::new(Mutex::new(MockResponse::Snapshot(FeedSnapshot::default()))),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the scripted response (shared by all clones)
    pub fn respond_with(&self, response: MockResponse) {
        if let Ok(mut current) = self.response.lock() {
            *current = response;
        }
    }

    /// Number of `fetch_accounts` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankFeedProvider for MockProvider {
    fn kind(&self) -> FeedProviderKind {
        self.kind
    }

    async fn claim_access_credential(&self, setup_token: &str) -> Result<String> {
        let token = setup_token.trim();
        if token.is_empty() || token == "revoked" {
            return Err(Error::Credential {
                provider: "Mock".to_string(),
                message: "Setup token rejected".to_string(),
            });
        }
        Ok(format!("mock-access-{}", token))
    }

    async fn fetch_accounts(&self, _credential: &str, _since: NaiveDate) -> Result<FeedSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = self
            .response
            .lock()
            .map_err(|_| Error::Provider("Mock response lock poisoned".to_string()))?
            .clone();

        match response {
            MockResponse::Snapshot(s) => Ok(s),
            MockResponse::Revoked(message) => Err(Error::Credential {
                provider: "Mock".to_string(),
                message,
            }),
            MockResponse::Unavailable(message) => Err(Error::Provider(message)),
            MockResponse::Delay(delay, s) => {
                tokio::time::sleep(delay).await;
                Ok(s)
            }
        }
    }
}
