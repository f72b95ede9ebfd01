/*!
 * Reassembly of batch outcomes into page-ordered output records.
 */

use log::warn;
use std::collections::HashMap;
use std::time::Duration;

use super::planner::PageRecord;
use super::scheduler::{BatchOutcome, BatchStatus};

/// Placeholder text for a page whose translation could not be obtained
pub const FAILURE_SENTINEL: &str = "[TRANSLATION FAILED]";

/// Translation state of one output page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTranslation {
    /// Text recovered from the backend
    Translated(String),
    /// No translation available
    Failed,
}

impl PageTranslation {
    /// Text to render, the failure sentinel for failed pages
    pub fn as_str(&self) -> &str {
        match self {
            Self::Translated(text) => text,
            Self::Failed => FAILURE_SENTINEL,
        }
    }

    /// Whether this page is missing its translation
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// One page of the final result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// 1-based page number
    pub page_number: u32,
    /// Source text of the page
    pub original_text: String,
    /// Translation or failure marker
    pub translation: PageTranslation,
}

/// Per-run statistics
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of planned batches
    pub total_batches: usize,
    /// Batches that produced translations
    pub succeeded: usize,
    /// Batches skipped after escalation
    pub skipped: usize,
    /// Batches that never finished
    pub aborted: usize,
    /// Pages rendered with the failure sentinel
    pub failed_pages: Vec<u32>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Multi-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Run Summary:\n\
             Batches: {} total, {} succeeded, {} skipped, {} aborted\n\
             Failed pages: {}\n\
             Elapsed time: {:.2} minutes",
            self.total_batches,
            self.succeeded,
            self.skipped,
            self.aborted,
            if self.failed_pages.is_empty() {
                "none".to_string()
            } else {
                format!("{:?}", self.failed_pages)
            },
            self.elapsed.as_secs_f64() / 60.0
        )
    }
}

/// Merge batch outcomes into one record per input page, in input order
///
/// A page only takes a translation from a succeeded batch that actually
/// contains it, so stray ids in one batch's reply never leak into other
/// pages. Pages without a translation get `PageTranslation::Failed`, except
/// blank source pages, which have nothing to translate and stay empty.
pub fn aggregate(pages: &[PageRecord], outcomes: &[BatchOutcome]) -> Vec<OutputRecord> {
    let mut translations: HashMap<u32, &str> = HashMap::new();

    for outcome in outcomes {
        let BatchStatus::Succeeded(map) = &outcome.status else {
            continue;
        };
        for page in &outcome.batch.items {
            if let Some(text) = map.get(&page.page_number) {
                translations.insert(page.page_number, text.as_str());
            }
        }
        let stray: Vec<&u32> = map
            .keys()
            .filter(|n| !outcome.batch.items.iter().any(|p| p.page_number == **n))
            .collect();
        if !stray.is_empty() {
            warn!("Ignoring page(s) {:?} in reply of batch {}: not part of that batch", stray, outcome.batch.index + 1);
        }
    }

    pages
        .iter()
        .map(|page| OutputRecord {
            page_number: page.page_number,
            original_text: page.text.clone(),
            translation: match translations.get(&page.page_number) {
                Some(text) => PageTranslation::Translated((*text).to_string()),
                None if page.text.trim().is_empty() => PageTranslation::Translated(String::new()),
                None => PageTranslation::Failed,
            },
        })
        .collect()
}

/// Count batch statuses and failed pages
pub fn summarize(outcomes: &[BatchOutcome], records: &[OutputRecord], elapsed: Duration) -> RunSummary {
    let count = |wanted: fn(&BatchStatus) -> bool| outcomes.iter().filter(|o| wanted(&o.status)).count();

    RunSummary {
        total_batches: outcomes.len(),
        succeeded: count(|s| matches!(s, BatchStatus::Succeeded(_))),
        skipped: count(|s| matches!(s, BatchStatus::Skipped)),
        aborted: count(|s| matches!(s, BatchStatus::Aborted)),
        failed_pages: records
            .iter()
            .filter(|r| r.translation.is_failed())
            .map(|r| r.page_number)
            .collect(),
        elapsed,
    }
}
