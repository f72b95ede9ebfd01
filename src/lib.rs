/*!
 * # pagetran - batch translation of paged documents
 *
 * A Rust library for translating page-structured text through a
 * conversational language-model backend.
 *
 * ## Features
 *
 * - Greedy, size-bounded batching of pages with cross-batch context
 * - Concurrent dispatch to an OpenAI-compatible chat completions endpoint
 * - Tolerant recovery of per-page translations from free-form replies
 * - Automatic retries, then operator escalation (retry, skip or abort)
 * - Page-ordered side-by-side Markdown output with right-to-left support
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The batch pipeline:
 *   - `translation::planner`: Batch planning
 *   - `translation::parser`: Response parsing
 *   - `translation::scheduler`: Concurrent dispatch, retries and escalation
 *   - `translation::aggregator`: Result aggregation
 * - `providers`: Translation backend clients
 * - `document_processor`: Page source and Markdown output
 * - `app_controller`: Main application controller
 * - `language_utils`: Language names and text direction
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document_processor;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunReport};
pub use errors::{AppError, BatchError, DispatchError, NetworkError, ParseError};
pub use language_utils::{display_name, is_right_to_left};
pub use providers::TranslationClient;
pub use translation::{Batch, DispatchScheduler, OutputRecord, PageRecord, ResponseParser, plan_batches};
