/*!
 * Concurrent dispatch of planned batches.
 *
 * A fixed number of workers pull batches, send them to the translation
 * client and parse the replies. Failed attempts are retried after a delay;
 * once the retry budget is spent the batch is escalated to the operator
 * through the shared `EscalationGate`.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use super::cancellation::CancellationSignal;
use super::escalation::{EscalationDecision, EscalationGate, EscalationRequest, format_pages};
use super::parser::ResponseParser;
use super::planner::Batch;
use super::retry::RetryPolicy;
use crate::errors::{BatchError, DispatchError};
use crate::providers::TranslationClient;

/// How an operator abort ends the run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbortMode {
    /// Drop all in-flight and pending work and fail the run
    #[default]
    Immediate,
    /// Stop outstanding workers and keep what already succeeded
    Graceful,
}

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Number of batches processed at the same time
    pub concurrent_requests: usize,
    /// Retry budget and delays
    pub retry: RetryPolicy,
    /// Abort behavior
    pub abort_mode: AbortMode,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrent_requests: 4,
            retry: RetryPolicy::default(),
            abort_mode: AbortMode::default(),
        }
    }
}

/// Lifecycle of a single batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchState {
    /// Not attempted yet
    Pending,
    /// About to make attempt number `attempt` since the last reset
    Retrying { attempt: u32 },
    /// Retry budget exhausted, waiting for an operator decision
    Escalated { attempts: u32, last_error: BatchError },
    /// Parsed translations by page number
    Succeeded(BTreeMap<u32, String>),
    /// Given up on by the operator
    Skipped,
    /// Stopped by an abort
    Aborted,
}

impl BatchState {
    /// Number of the next attempt since the last reset
    fn attempt_number(&self) -> u32 {
        match self {
            Self::Retrying { attempt } => *attempt,
            _ => 1,
        }
    }

    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Skipped | Self::Aborted)
    }
}

/// Final status of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    /// Parsed translations by page number
    Succeeded(BTreeMap<u32, String>),
    /// Skipped after escalation, contributes no pages
    Skipped,
    /// Never completed because the run was aborted
    Aborted,
}

/// A batch together with its final status
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// The batch as planned
    pub batch: Batch,
    /// How processing ended
    pub status: BatchStatus,
    /// Backend invocations spent on the batch
    pub attempts: u32,
}

impl BatchOutcome {
    /// Whether the batch produced translations
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Succeeded(_))
    }
}

/// Runs batches through the client and parser on a bounded worker pool
pub struct DispatchScheduler {
    client: Arc<dyn TranslationClient>,
    parser: Arc<ResponseParser>,
    gate: EscalationGate,
    options: SchedulerOptions,
}

impl DispatchScheduler {
    /// Create a new scheduler with the default response parser
    pub fn new(client: Arc<dyn TranslationClient>, gate: EscalationGate, options: SchedulerOptions) -> Self {
        Self {
            client,
            parser: Arc::new(ResponseParser::default()),
            gate,
            options,
        }
    }

    /// Replace the response parser
    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Scheduler options in use
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Process every batch and return the outcomes in batch order
    ///
    /// `progress_callback` receives `(completed, total)` each time a batch
    /// reaches a terminal state. With `AbortMode::Immediate` an operator abort
    /// returns `DispatchError::Aborted` and all unfinished work is dropped.
    pub async fn run(
        &self,
        batches: Vec<Batch>,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<Vec<BatchOutcome>, DispatchError> {
        let total_batches = batches.len();
        let workers = self.options.concurrent_requests.max(1);
        let cancel = CancellationSignal::new();
        let abort_origin: SyncMutex<Option<(usize, Vec<u32>)>> = SyncMutex::new(None);
        let processed_batches = AtomicUsize::new(0);
        let start_time = Instant::now();

        info!("Dispatching {} batch(es) with {} worker(s)", total_batches, workers);

        let mut results = stream::iter(batches)
            .map(|batch| {
                let cancel = &cancel;
                let abort_origin = &abort_origin;
                let processed_batches = &processed_batches;
                let progress_callback = &progress_callback;

                async move {
                    let outcome = self.process_batch(batch, total_batches, cancel, abort_origin).await;
                    let current = processed_batches.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_batches);
                    outcome
                }
            })
            .buffer_unordered(workers);

        let mut outcomes = Vec::with_capacity(total_batches);
        while let Some(outcome) = results.next().await {
            if outcome.status == BatchStatus::Aborted && self.options.abort_mode == AbortMode::Immediate {
                let (batch_index, page_numbers) = abort_origin
                    .lock()
                    .clone()
                    .unwrap_or_else(|| (outcome.batch.index, outcome.batch.page_numbers()));
                error!(
                    "Run aborted at batch {}, discarding all remaining work",
                    batch_index + 1
                );
                return Err(DispatchError::Aborted {
                    batch_index,
                    page_numbers,
                });
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by_key(|outcome| outcome.batch.index);
        info!(
            "Dispatch finished in {:?}: {} of {} batch(es) succeeded",
            start_time.elapsed(),
            outcomes.iter().filter(|o| o.is_success()).count(),
            total_batches
        );
        Ok(outcomes)
    }

    /// One backend call plus parsing
    async fn attempt(&self, batch: &Batch) -> Result<BTreeMap<u32, String>, BatchError> {
        let raw = self.client.translate(batch).await?;
        let pages = self.parser.parse(&raw)?;
        Ok(pages)
    }

    /// Drive one batch through its state machine until it is terminal
    async fn process_batch(
        &self,
        batch: Batch,
        total_batches: usize,
        cancel: &CancellationSignal,
        abort_origin: &SyncMutex<Option<(usize, Vec<u32>)>>,
    ) -> BatchOutcome {
        let label = format!("Batch {}/{} (pages {})", batch.index + 1, total_batches, format_pages(&batch.page_numbers()));
        let retry = &self.options.retry;
        let mut state = BatchState::Pending;
        let mut total_attempts = 0u32;

        while !state.is_terminal() {
            state = match state {
                BatchState::Pending | BatchState::Retrying { .. } if cancel.is_cancelled() => BatchState::Aborted,

                ready @ (BatchState::Pending | BatchState::Retrying { .. }) => {
                    let attempt = ready.attempt_number();
                    total_attempts += 1;
                    debug!("{} attempt {}", label, attempt);

                    let result = tokio::select! {
                        _ = cancel.cancelled() => None,
                        result = self.attempt(&batch) => Some(result),
                    };

                    match result {
                        None => BatchState::Aborted,
                        Some(Ok(pages)) => {
                            let missing: Vec<u32> = batch
                                .page_numbers()
                                .into_iter()
                                .filter(|n| !pages.contains_key(n))
                                .collect();
                            if !pages.is_empty() && missing.len() == batch.items.len() {
                                warn!(
                                    "{} reply only has page id(s) {:?}, none of its pages {:?}; the model may have renumbered them",
                                    label,
                                    pages.keys().collect::<Vec<_>>(),
                                    missing
                                );
                            } else if !missing.is_empty() {
                                warn!("{} reply is missing page(s) {:?}", label, missing);
                            }
                            BatchState::Succeeded(pages)
                        }
                        Some(Err(e)) => {
                            warn!("{} attempt {} failed: {}", label, attempt, e);
                            if retry.should_retry(attempt) {
                                let delay = retry.delay_for(attempt);
                                tokio::select! {
                                    _ = cancel.cancelled() => BatchState::Aborted,
                                    _ = tokio::time::sleep(delay) => BatchState::Retrying { attempt: attempt + 1 },
                                }
                            } else {
                                BatchState::Escalated {
                                    attempts: attempt,
                                    last_error: e,
                                }
                            }
                        }
                    }
                }

                BatchState::Escalated { attempts, last_error } => {
                    error!("{} exhausted its retries: {}", label, last_error);
                    let request = EscalationRequest {
                        batch_index: batch.index,
                        total_batches,
                        page_numbers: batch.page_numbers(),
                        attempts,
                        last_error,
                    };

                    match self.gate.escalate_unless_cancelled(&request, cancel).await {
                        Some(EscalationDecision::Retry) => BatchState::Retrying { attempt: 1 },
                        Some(EscalationDecision::Skip) => {
                            warn!("{} skipped, its pages will be marked as failed", label);
                            BatchState::Skipped
                        }
                        Some(EscalationDecision::Abort) => {
                            abort_origin
                                .lock()
                                .get_or_insert_with(|| (batch.index, batch.page_numbers()));
                            cancel.cancel();
                            BatchState::Aborted
                        }
                        None => BatchState::Aborted,
                    }
                }

                terminal => terminal,
            };
        }

        let status = match state {
            BatchState::Succeeded(pages) => {
                info!("{} translated after {} attempt(s)", label, total_attempts);
                BatchStatus::Succeeded(pages)
            }
            BatchState::Skipped => BatchStatus::Skipped,
            _ => BatchStatus::Aborted,
        };

        BatchOutcome {
            batch,
            status,
            attempts: total_attempts,
        }
    }
}
