/*!
 * Batch planning.
 *
 * Partitions the ordered page records of a document into batches whose
 * serialized size stays under a character budget, and computes the
 * continuity context each batch carries into its prompt.
 */

use log::{debug, error};
use serde::{Deserialize, Serialize};

/// Context value given to the first batch of a document
pub const START_CONTEXT: &str = "(beginning of the document, no previous text)";

/// Text of a single page as produced by the page source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number
    #[serde(rename = "page")]
    pub page_number: u32,

    /// Extracted text, empty for blank or unreadable pages
    pub text: String,
}

impl PageRecord {
    /// Create a new page record
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// A contiguous group of pages submitted to the backend together
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Position of the batch in the plan
    pub index: usize,

    /// Pages of the batch, never empty
    pub items: Vec<PageRecord>,

    /// Trailing text of the previous batch's last page, or `START_CONTEXT`
    pub context: String,
}

impl Batch {
    /// Page numbers covered by this batch
    pub fn page_numbers(&self) -> Vec<u32> {
        self.items.iter().map(|p| p.page_number).collect()
    }

    /// Total serialized size of the batch items
    pub fn serialized_size(&self) -> usize {
        self.items.iter().map(serialized_page_size).sum()
    }
}

/// Size of a page as it appears inside the request payload
///
/// This is the byte length of the compact JSON object `{"page":n,"text":"..."}`
/// with the text escaped exactly as the prompt builder embeds it.
pub fn serialized_page_size(page: &PageRecord) -> usize {
    serde_json::to_string(page)
        .map(|s| s.len())
        // Only reachable if serialization of two plain fields fails
        .unwrap_or(page.text.len() + 20)
}

/// Last `max_chars` characters of `text`, cut on a character boundary
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    text.chars().skip(total - max_chars).collect()
}

/// Split pages into batches under `max_chars_per_batch`
///
/// Single greedy forward pass. A page is never split: a page whose own size
/// exceeds the budget becomes a batch of one. Batch `i > 0` carries the tail
/// of batch `i - 1`'s last page as context; batch 0 carries `START_CONTEXT`.
pub fn plan_batches(pages: &[PageRecord], max_chars_per_batch: usize, context_tail_chars: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<PageRecord> = Vec::new();
    let mut current_size = 0usize;
    let mut current_context = START_CONTEXT.to_string();
    let mut last_page_text = String::new();

    for page in pages {
        let page_size = serialized_page_size(page);

        if !current.is_empty() && current_size + page_size > max_chars_per_batch {
            batches.push(Batch {
                index: batches.len(),
                items: std::mem::take(&mut current),
                context: std::mem::replace(&mut current_context, tail_chars(&last_page_text, context_tail_chars)),
            });
            current_size = 0;
        }

        if page_size > max_chars_per_batch {
            debug!("Page {} is oversized ({} chars), it forms its own batch", page.page_number, page_size);
        }

        current.push(page.clone());
        current_size += page_size;
        last_page_text.clone_from(&page.text);
    }

    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            items: current,
            context: current_context,
        });
    }

    let planned: usize = batches.iter().map(|b| b.items.len()).sum();
    if planned != pages.len() {
        error!("CRITICAL ERROR: Lost pages during batch planning! Original: {}, planned: {}", pages.len(), planned);
    } else if log::max_level() >= log::LevelFilter::Debug {
        for batch in &batches {
            debug!(
                "Batch {}: pages {:?} ({} chars)",
                batch.index + 1,
                batch.page_numbers(),
                batch.serialized_size()
            );
        }
    }

    batches
}
