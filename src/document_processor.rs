use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::language_utils;
use crate::translation::aggregator::OutputRecord;
use crate::translation::planner::PageRecord;

// @module: Page source and Markdown sink

/// Page separator in extracted text
pub const PAGE_BREAK: char = '\u{000C}';

// @struct: Inclusive 1-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    // @checks: Page number inside the range
    pub fn contains(&self, page_number: u32) -> bool {
        (self.start..=self.end).contains(&page_number)
    }
}

impl FromStr for PageRange {
    type Err = anyhow::Error;

    /// Parse `"3-17"` or a single page `"5"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (start, end) = match s.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (s, s),
        };
        let start: u32 = start.parse().map_err(|_| anyhow!("Invalid page range start in '{}'", s))?;
        let end: u32 = end.parse().map_err(|_| anyhow!("Invalid page range end in '{}'", s))?;

        if start == 0 {
            return Err(anyhow!("Page numbers start at 1, got '{}'", s));
        }
        if start > end {
            return Err(anyhow!("Page range start is after its end: '{}'", s));
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// @struct: Header information for the rendered document
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    /// Name of the input document
    pub source_name: String,
    pub source_language: String,
    pub target_language: String,
}

/// Split extracted text into numbered pages
///
/// Pages are separated by form feeds. A single trailing empty page produced
/// by a final form feed is dropped.
pub fn split_pages(content: &str) -> Vec<PageRecord> {
    let mut parts: Vec<&str> = content.split(PAGE_BREAK).collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
        parts.pop();
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageRecord::new(i as u32 + 1, text.trim_end_matches(['\r', '\n'])))
        .collect()
}

/// Read a text document and return its pages, optionally limited to a range
pub fn load_pages<P: AsRef<Path>>(path: P, range: Option<PageRange>) -> Result<Vec<PageRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read document: {}", path.display()))?;

    let mut pages = split_pages(&content);
    let total = pages.len();

    if let Some(range) = range {
        pages.retain(|page| range.contains(page.page_number));
        if pages.is_empty() {
            return Err(anyhow!(
                "Page range {} selects no pages, document has {} page(s)",
                range,
                total
            ));
        }
    }

    info!("Loaded {} of {} page(s) from {}", pages.len(), total, path.display());
    Ok(pages)
}

// @generates: Output path for the translated document
pub fn output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
    input_file: P1,
    output_dir: P2,
    source_language: &str,
    target_language: &str,
) -> PathBuf {
    let stem = input_file.as_ref().file_stem().unwrap_or_default().to_string_lossy();
    let file_name = format!(
        "{}_translated_{}_to_{}.md",
        stem,
        filename_part(source_language),
        filename_part(target_language)
    );
    output_dir.as_ref().join(file_name)
}

fn filename_part(language: &str) -> String {
    language.trim().split_whitespace().collect::<Vec<_>>().join("_")
}

/// Escape text for a Markdown table cell
pub fn escape_cell(text: &str) -> String {
    text.trim()
        .replace('|', "\\|")
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

fn cell(text: &str, rtl: bool) -> String {
    let escaped = escape_cell(text);
    if rtl {
        format!("<div dir=\"rtl\">{}</div>", escaped)
    } else {
        escaped
    }
}

/// Render records as a Markdown document with one table per page
pub fn render_markdown(records: &[OutputRecord], meta: &DocumentMeta) -> String {
    let source_rtl = language_utils::is_right_to_left(&meta.source_language);
    let target_rtl = language_utils::is_right_to_left(&meta.target_language);
    let source_name = language_utils::display_name(&meta.source_language);
    let target_name = language_utils::display_name(&meta.target_language);

    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", meta.source_name));
    out.push_str(&format!("- Source language: {}\n", source_name));
    out.push_str(&format!("- Target language: {}\n", target_name));

    for record in records {
        out.push_str(&format!("\n## Page {}\n\n", record.page_number));
        out.push_str(&format!("| {} | {} |\n", source_name, target_name));
        out.push_str("| --- | --- |\n");
        out.push_str(&format!(
            "| {} | {} |\n",
            cell(&record.original_text, source_rtl),
            cell(record.translation.as_str(), target_rtl)
        ));
    }

    out
}

/// Write the rendered document, creating the parent directory if needed
pub fn write_markdown<P: AsRef<Path>>(path: P, records: &[OutputRecord], meta: &DocumentMeta) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let rendered = render_markdown(records, meta);
    fs::write(path, &rendered).with_context(|| format!("Failed to write output: {}", path.display()))?;

    debug!("Wrote {} bytes to {}", rendered.len(), path.display());
    Ok(())
}
