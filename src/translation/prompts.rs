/*!
 * Prompt assembly for batch translation requests.
 *
 * Templates recognize the placeholders `{source_language}`,
 * `{target_language}`, `{context}` and `{batch_content}`. The original
 * single-page template name `{text_to_translate}` is accepted as an alias of
 * `{batch_content}`.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::planner::Batch;

/// Placeholder for the serialized batch items
pub const BATCH_CONTENT: &str = "{batch_content}";
/// Alias for `BATCH_CONTENT`
pub const TEXT_TO_TRANSLATE: &str = "{text_to_translate}";

/// Any recognized placeholder
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(source_language|target_language|context|batch_content|text_to_translate)\}")
        .expect("placeholder pattern is a valid regex")
});

/// Whether the template has somewhere to put the pages
pub fn has_batch_placeholder(template: &str) -> bool {
    template.contains(BATCH_CONTENT) || template.contains(TEXT_TO_TRANSLATE)
}

/// Serialize the batch pages as the JSON array embedded in the prompt
pub fn serialize_batch_content(batch: &Batch) -> String {
    let objects: Vec<String> = batch
        .items
        .iter()
        .map(|page| serde_json::to_string(page).unwrap_or_default())
        .collect();
    format!("[{}]", objects.join(",\n"))
}

/// Builds backend prompts from a template and a language pair
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
    source_language: String,
    target_language: String,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(
        template: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Source language name used in prompts
    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Target language name used in prompts
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Assemble the prompt for one batch
    ///
    /// Placeholders are substituted in one pass over the template, so
    /// placeholder names inside page text or context are left as written.
    pub fn build(&self, batch: &Batch) -> String {
        let content = serialize_batch_content(batch);
        PLACEHOLDER_PATTERN
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "source_language" => self.source_language.clone(),
                "target_language" => self.target_language.clone(),
                "context" => batch.context.clone(),
                _ => content.clone(),
            })
            .into_owned()
    }
}
