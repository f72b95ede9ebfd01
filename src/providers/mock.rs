/*!
 * Mock translation client for testing and dry runs.
 *
 * This module provides a client that simulates different backend behaviors:
 * - `MockClient::working()` - Always replies with a well-formed translation
 * - `MockClient::failing_first(n)` - Fails the first `n` calls, then works
 * - `MockClient::failing()` - Always fails with a network error
 * - `MockClient::unparseable()` - Replies with text the parser rejects
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::TranslationClient;
use crate::errors::NetworkError;
use crate::translation::planner::Batch;

/// Behavior mode for the mock client
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails the first `failures` calls across all batches
    FailingFirst { failures: usize },
    /// Always fails
    Failing,
    /// Succeeds with a reply that contains no page fields
    Unparseable,
    /// Fails every call for batches covering any of these pages
    FailingPages(HashSet<u32>),
}

/// Mock client for testing dispatch behavior
#[derive(Debug, Clone)]
pub struct MockClient {
    /// Behavior mode
    behavior: MockBehavior,
    /// Calls made so far, shared between clones
    call_count: Arc<AtomicUsize>,
    /// Batch indexes in the order their calls completed
    completions: Arc<Mutex<Vec<usize>>>,
    /// Simulated latency for a batch index
    delay: Option<fn(usize) -> Duration>,
    /// Custom reply generator
    custom_reply: Option<fn(&Batch) -> String>,
}

impl MockClient {
    /// Create a new mock client with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            completions: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            custom_reply: None,
        }
    }

    /// Client that always replies with a translation
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Client whose first `failures` calls fail
    pub fn failing_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailingFirst { failures })
    }

    /// Client that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Client whose replies cannot be parsed
    pub fn unparseable() -> Self {
        Self::new(MockBehavior::Unparseable)
    }

    /// Client that fails every batch containing one of `pages`
    pub fn failing_pages(pages: impl IntoIterator<Item = u32>) -> Self {
        Self::new(MockBehavior::FailingPages(pages.into_iter().collect()))
    }

    /// Simulate latency depending on the batch index
    pub fn with_delay(mut self, delay: fn(usize) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set a custom reply generator
    pub fn with_custom_reply(mut self, generator: fn(&Batch) -> String) -> Self {
        self.custom_reply = Some(generator);
        self
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Batch indexes in completion order
    pub fn completion_order(&self) -> Vec<usize> {
        self.completions.lock().clone()
    }

    /// Translation the working mock produces for a page text
    pub fn translated(text: &str) -> String {
        format!("[TRANSLATED] {}", text)
    }

    /// Generate a well-formed reply for every page of the batch
    pub fn generate_reply(batch: &Batch) -> String {
        let objects: Vec<String> = batch
            .items
            .iter()
            .map(|page| {
                let text = serde_json::to_string(&Self::translated(&page.text)).unwrap_or_default();
                format!("  {{\"page\": {}, \"translated_text\": {}}}", page.page_number, text)
            })
            .collect();
        format!("```json\n[\n{}\n]\n```", objects.join(",\n"))
    }

    fn reply(&self, batch: &Batch, call: usize) -> Result<String, NetworkError> {
        let ok = || Ok(self.custom_reply.map_or_else(|| Self::generate_reply(batch), |g| g(batch)));

        match &self.behavior {
            MockBehavior::Working => ok(),
            MockBehavior::FailingFirst { failures } if call < *failures => Err(NetworkError::Status {
                status_code: 503,
                message: format!("Simulated failure (call #{})", call + 1),
            }),
            MockBehavior::FailingFirst { .. } => ok(),
            MockBehavior::Failing => Err(NetworkError::Connection("Simulated connection failure".to_string())),
            MockBehavior::Unparseable => Ok("Sorry, I can only answer in prose today.".to_string()),
            MockBehavior::FailingPages(pages) if batch.items.iter().any(|p| pages.contains(&p.page_number)) => {
                Err(NetworkError::Timeout(1))
            }
            MockBehavior::FailingPages(_) => ok(),
        }
    }
}

#[async_trait]
impl TranslationClient for MockClient {
    async fn translate(&self, batch: &Batch) -> Result<String, NetworkError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay(batch.index)).await;
        }

        let reply = self.reply(batch, call);
        self.completions.lock().push(batch.index);
        reply
    }
}
