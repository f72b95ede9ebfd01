/*!
 * Recovery of per-page translations from free-form backend replies.
 *
 * Backends are asked for a JSON array but frequently wrap it in prose or code
 * fences, leave raw line breaks inside strings, or rename the content field.
 * Instead of strict JSON decoding the parser runs an ordered list of pattern
 * strategies and takes the first one that finds anything.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::errors::ParseError;

/// Page id field followed by the primary content field
static PRIMARY_PATTERN: Lazy<Regex> = Lazy::new(|| page_pattern("translated_text"));

/// Page id field followed by the alternate content field
static ALTERNATE_PATTERN: Lazy<Regex> = Lazy::new(|| page_pattern("translation"));

fn page_pattern(content_field: &str) -> Regex {
    // The content group accepts any escaped character and raw newlines.
    let pattern = format!(
        r#"(?s)"page(?:_number)?"\s*:\s*"?(\d+)"?\s*,\s*"{}"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        regex::escape(content_field)
    );
    Regex::new(&pattern).expect("page pattern is a valid regex")
}

/// Undo JSON string escaping in the fixed order `\n`, `\"`, `\\`
pub fn unescape_content(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\\"", "\"").replace("\\\\", "\\")
}

/// One way of pulling page translations out of a reply
pub trait ParseStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Every page found by this strategy, possibly none
    fn extract(&self, raw: &str) -> BTreeMap<u32, String>;
}

/// Strategy matching a page id followed by a named content field
pub struct FieldPairStrategy {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
}

impl FieldPairStrategy {
    /// `"page"` paired with `"translated_text"`
    pub fn primary() -> Self {
        Self {
            name: "translated_text",
            pattern: &PRIMARY_PATTERN,
        }
    }

    /// `"page"` paired with `"translation"`
    pub fn alternate() -> Self {
        Self {
            name: "translation",
            pattern: &ALTERNATE_PATTERN,
        }
    }
}

impl ParseStrategy for FieldPairStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, raw: &str) -> BTreeMap<u32, String> {
        let mut pages = BTreeMap::new();
        for captures in self.pattern.captures_iter(raw) {
            let Ok(page_number) = captures[1].parse::<u32>() else {
                continue;
            };
            pages.insert(page_number, unescape_content(&captures[2]));
        }
        pages
    }
}

/// Tiered parser over an ordered list of strategies
pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(FieldPairStrategy::primary()),
            Box::new(FieldPairStrategy::alternate()),
        ])
    }
}

impl std::fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ResponseParser").field("strategies", &names).finish()
    }
}

impl ResponseParser {
    /// Create a parser trying `strategies` in order
    pub fn new(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    /// Map page numbers to translated text
    ///
    /// The first strategy yielding at least one page wins. If none does the
    /// reply is rejected as a whole.
    pub fn parse(&self, raw: &str) -> Result<BTreeMap<u32, String>, ParseError> {
        for strategy in &self.strategies {
            let pages = strategy.extract(raw);
            if !pages.is_empty() {
                log::debug!("Parsed {} page(s) using '{}' field", pages.len(), strategy.name());
                return Ok(pages);
            }
        }
        Err(ParseError::from_reply(raw))
    }
}
