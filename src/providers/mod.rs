/*!
 * Translation backend clients.
 *
 * - `openai`: OpenAI-compatible chat completions endpoint
 * - `mock`: Scripted client for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::NetworkError;
use crate::translation::planner::Batch;

/// Common trait for all translation backends
///
/// An implementation turns one batch into one prompt, submits it, and returns
/// the backend's raw reply text. Replies are parsed by the caller.
#[async_trait]
pub trait TranslationClient: Send + Sync + Debug {
    /// Translate one batch
    ///
    /// # Arguments
    /// * `batch` - The batch to translate, including its continuity context
    ///
    /// # Returns
    /// * `Result<String, NetworkError>` - The raw reply or a retryable failure
    async fn translate(&self, batch: &Batch) -> Result<String, NetworkError>;
}

pub mod mock;
pub mod openai;
