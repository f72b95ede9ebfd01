/*!
 * Batch translation pipeline for paged documents.
 *
 * This module contains the pipeline that turns ordered page records into
 * ordered translations. It is split into several submodules:
 *
 * - `planner`: Partitioning of pages into size-bounded batches
 * - `prompts`: Prompt templates and batch serialization
 * - `parser`: Recovery of per-page translations from backend replies
 * - `retry`: Retry timing
 * - `cancellation`: Cooperative cancellation of outstanding work
 * - `escalation`: Operator decisions for batches that keep failing
 * - `scheduler`: Concurrent dispatch with retries and escalation
 * - `aggregator`: Reassembly of results in page order
 */

// Re-export main types for easier usage
pub use self::aggregator::{FAILURE_SENTINEL, OutputRecord, PageTranslation, RunSummary, aggregate, summarize};
pub use self::escalation::{EscalationDecision, EscalationGate, EscalationHandler, EscalationRequest};
pub use self::parser::ResponseParser;
pub use self::planner::{Batch, PageRecord, START_CONTEXT, plan_batches};
pub use self::prompts::PromptBuilder;
pub use self::retry::RetryPolicy;
pub use self::scheduler::{AbortMode, BatchOutcome, BatchStatus, DispatchScheduler, SchedulerOptions};

// Submodules
pub mod aggregator;
pub mod cancellation;
pub mod escalation;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod retry;
pub mod scheduler;
