use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for prompt language names and text direction
///
/// Languages may be configured either as human-readable names ("Farsi") or
/// as ISO 639-1 / ISO 639-2 codes ("fa", "per", "fas"). Codes are resolved
/// to English names before they are put into prompts.

/// Languages written right-to-left, matched against lowercase names
const RTL_LANGUAGES: &[&str] = &["arabic", "urdu", "hebrew", "persian", "farsi"];

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterparts
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "ice" => Some("isl"),
        "alb" => Some("sqi"),
        "arm" => Some("hye"),
        "baq" => Some("eus"),
        "bur" => Some("mya"),
        "per" => Some("fas"),
        "geo" => Some("kat"),
        "may" => Some("msa"),
        "mac" => Some("mkd"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        "wel" => Some("cym"),
        _ => None,
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some(part2t) = part2b_to_part2t(&normalized_code) {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Name to use for a configured language
///
/// ISO codes resolve to their English name, anything else is treated as a
/// name already and returned trimmed.
pub fn display_name(language: &str) -> String {
    get_language_name(language).unwrap_or_else(|_| language.trim().to_string())
}

/// Check if two configured languages denote the same language
pub fn languages_match(first: &str, second: &str) -> bool {
    display_name(first).eq_ignore_ascii_case(&display_name(second))
}

/// Whether text in this language is written right-to-left
pub fn is_right_to_left(language: &str) -> bool {
    let name = display_name(language).to_lowercase();
    RTL_LANGUAGES.iter().any(|rtl| name.contains(rtl))
}
