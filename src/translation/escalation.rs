/*!
 * Operator escalation for batches that exhausted their retries.
 *
 * All escalations of a run go through one `EscalationGate`, so concurrent
 * failures are presented to the operator one at a time. The gate is held only
 * while a decision is being made.
 */

use async_trait::async_trait;
use indicatif::ProgressBar;
use log::{info, warn};
use parking_lot::Mutex as SyncMutex;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::cancellation::CancellationSignal;
use crate::errors::BatchError;

/// Operator choice for an escalated batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Reset the attempt counter and try again
    Retry,
    /// Give up on this batch, its pages are marked failed
    Skip,
    /// Stop the whole run
    Abort,
}

/// Failure context shown to the operator
#[derive(Debug, Clone)]
pub struct EscalationRequest {
    /// Index of the failing batch
    pub batch_index: usize,
    /// Number of batches in the run
    pub total_batches: usize,
    /// Pages covered by the failing batch
    pub page_numbers: Vec<u32>,
    /// Attempts spent since the last reset
    pub attempts: u32,
    /// Error of the most recent attempt
    pub last_error: BatchError,
}

impl EscalationRequest {
    /// Human readable one-line description
    pub fn describe(&self) -> String {
        format!(
            "Batch {}/{} (pages {}) failed {} time(s). Last error: {}",
            self.batch_index + 1,
            self.total_batches,
            format_pages(&self.page_numbers),
            self.attempts,
            self.last_error
        )
    }
}

/// Compact page list, e.g. `5-6` or `3`
pub fn format_pages(pages: &[u32]) -> String {
    match (pages.first(), pages.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => String::from("none"),
    }
}

/// Source of escalation decisions
#[async_trait]
pub trait EscalationHandler: Send + Sync {
    /// Decide what happens to an escalated batch
    async fn decide(&self, request: &EscalationRequest) -> EscalationDecision;
}

/// Serializes escalations across the whole scheduler
#[derive(Clone)]
pub struct EscalationGate {
    lock: Arc<Mutex<()>>,
    handler: Arc<dyn EscalationHandler>,
}

impl EscalationGate {
    /// Create a gate around `handler`
    pub fn new(handler: Arc<dyn EscalationHandler>) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            handler,
        }
    }

    /// Ask for a decision, waiting for any escalation already in progress
    pub async fn escalate(&self, request: &EscalationRequest) -> EscalationDecision {
        let _guard = self.lock.lock().await;
        self.decide_locked(request).await
    }

    /// Like `escalate`, but gives up without asking once `cancel` fires
    ///
    /// Cancellation is only observed while waiting for the gate; a question
    /// already on screen is always answered.
    pub async fn escalate_unless_cancelled(
        &self,
        request: &EscalationRequest,
        cancel: &CancellationSignal,
    ) -> Option<EscalationDecision> {
        let _guard = tokio::select! {
            guard = self.lock.lock() => guard,
            _ = cancel.cancelled() => return None,
        };
        if cancel.is_cancelled() {
            return None;
        }
        Some(self.decide_locked(request).await)
    }

    async fn decide_locked(&self, request: &EscalationRequest) -> EscalationDecision {
        let decision = self.handler.decide(request).await;
        info!(
            "Operator chose {:?} for batch {} (pages {})",
            decision,
            request.batch_index + 1,
            format_pages(&request.page_numbers)
        );
        decision
    }
}

/// Always returns the same decision, for non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub EscalationDecision);

#[async_trait]
impl EscalationHandler for FixedDecision {
    async fn decide(&self, request: &EscalationRequest) -> EscalationDecision {
        warn!("{} Applying configured policy: {:?}", request.describe(), self.0);
        self.0
    }
}

/// Replays a queue of decisions and records every request it receives
///
/// Falls back to `fallback` once the queue is empty.
#[derive(Debug)]
pub struct ScriptedDecisions {
    queue: SyncMutex<VecDeque<EscalationDecision>>,
    fallback: EscalationDecision,
    seen: SyncMutex<Vec<EscalationRequest>>,
}

impl ScriptedDecisions {
    /// Create a handler answering with `decisions` in order
    pub fn new(decisions: Vec<EscalationDecision>, fallback: EscalationDecision) -> Self {
        Self {
            queue: SyncMutex::new(VecDeque::from(decisions)),
            fallback,
            seen: SyncMutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<EscalationRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EscalationHandler for ScriptedDecisions {
    async fn decide(&self, request: &EscalationRequest) -> EscalationDecision {
        self.seen.lock().push(request.clone());
        self.queue.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// Interactive console prompt
///
/// The progress bar, if any, is suspended while the question is on screen.
pub struct ConsolePrompt {
    progress: Option<ProgressBar>,
}

impl ConsolePrompt {
    /// Prompt without a progress bar
    pub fn new() -> Self {
        Self { progress: None }
    }

    /// Prompt that hides `progress` while asking
    pub fn with_progress(progress: ProgressBar) -> Self {
        Self { progress: Some(progress) }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an operator answer to a decision
pub fn parse_answer(answer: &str) -> Option<EscalationDecision> {
    match answer.trim().to_lowercase().as_str() {
        "r" | "retry" => Some(EscalationDecision::Retry),
        "s" | "skip" => Some(EscalationDecision::Skip),
        "a" | "abort" => Some(EscalationDecision::Abort),
        _ => None,
    }
}

fn ask_on_console(description: &str) -> EscalationDecision {
    let stdin = std::io::stdin();
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n{}", description);

    loop {
        let _ = write!(stderr, "[r]etry, [s]kip or [a]bort? ");
        let _ = stderr.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            // Closed stdin cannot answer, keep the run going without this batch
            Ok(0) | Err(_) => return EscalationDecision::Skip,
            Ok(_) => {
                if let Some(decision) = parse_answer(&line) {
                    return decision;
                }
            }
        }
    }
}

#[async_trait]
impl EscalationHandler for ConsolePrompt {
    async fn decide(&self, request: &EscalationRequest) -> EscalationDecision {
        let description = request.describe();
        let progress = self.progress.clone();

        let answer = tokio::task::spawn_blocking(move || match progress {
            Some(pb) => pb.suspend(|| ask_on_console(&description)),
            None => ask_on_console(&description),
        })
        .await;

        answer.unwrap_or(EscalationDecision::Skip)
    }
}
