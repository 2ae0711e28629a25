//! ZIP code detection in free-form page text.
//!
//! A ZIP is any standalone run of exactly five ASCII digits (a `\b\d{5}\b`
//! match). Runs that look like years (`19xxx`, `20xxx`) and the placeholder
//! `00000` are skipped. The filter is a heuristic: it never checks that the
//! ZIP actually exists.

use regex::Regex;

/// Prefixes that usually belong to a year glued to other digits, not a ZIP.
const YEAR_PREFIXES: [&str; 2] = ["19", "20"];
const PLACEHOLDER_ZIP: &str = "00000";

/// True when `s` is exactly five ASCII digits.
pub fn is_valid_zip(s: &str) -> bool {
    s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Find the first plausible ZIP code in `text`.
pub fn extract_zip(text: &str) -> Option<String> {
    // A `\b\d{5}\b` match is exactly a maximal ASCII word run made of five digits.
    let words = Regex::new(r"[A-Za-z0-9_]+").ok()?;

    words
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| is_valid_zip(word))
        .find(|zip| !YEAR_PREFIXES.iter().any(|p| zip.starts_with(p)) && *zip != PLACEHOLDER_ZIP)
        .map(|zip| zip.to_string())
}

/// Tracks the last ZIP detected on a page and only reports changes.
#[derive(Debug, Clone, Default)]
pub struct ZipWatcher {
    last: Option<String>,
}

impl ZipWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `text`; returns the detected ZIP only if it differs from the
    /// previously reported one.
    pub fn observe(&mut self, text: &str) -> Option<String> {
        let zip = extract_zip(text)?;
        if self.last.as_deref() == Some(zip.as_str()) {
            return None;
        }
        self.last = Some(zip.clone());
        Some(zip)
    }

    /// Last ZIP reported by [`observe`](Self::observe).
    pub fn current(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
