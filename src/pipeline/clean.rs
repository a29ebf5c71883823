//! Text cleanup: strip running headers/footers, page numbers, watermark
//! residue and OCR noise from raw Tesseract output.
//!
//! ## Rule Order
//!
//! Line-level normalisation runs first so every later rule sees the same
//! form of a line that ends up in the output:
//!
//! 1. Normalise line endings, drop invisible Unicode
//! 2. Merge words hyphenated across a line break
//! 3. Per line: remove `||`/`__` runs, collapse whitespace, trim
//! 4. Drop page-number lines (`12`, `- 12 -`, `Page 3 of 10`)
//! 5. Drop lines matching a header/footer pattern (built-in + configured)
//! 6. Drop lines that repeat at the edges of many pages
//! 7. Drop watermark-like lines (too short, no letters, or mostly
//!    non-letters when standing alone between blank lines)
//! 8. Collapse runs of blank lines
//!
//! Because matching happens on the final form of each line, a cleaned page
//! never contains a line that fully matches a configured pattern.

use crate::config::CleanOptions;
use crate::error::Ocr2MdError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Header/footer/watermark lines seen on typical scanned course material
/// and reports. Matched case-insensitively against the whole line.
pub const DEFAULT_STRIP_PATTERNS: &[&str] = &[
    r"page\s+\d+(?:\s+of\s+\d+)?",
    r"(?:©|\(c\)|copyright)\s*\d{4}.*",
    r"version\s+\d+(?:\.\d+)+",
    r"release\s+\d+(?:\.\d+)*",
    r"produced\s+\d{1,2}\s+\w+\s+\d{4}",
    r"confidential",
    r"sample",
    r"watermark",
    r"preview",
    r"draft",
    r"do\s+not\s+(?:copy|distribute)",
];

static RE_HYPHEN_WRAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})-[ \t]*\n[ \t]*(\p{Ll})").unwrap());

static RE_RULE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|_]{2,}").unwrap());

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[-–—]\s*)?(?:p(?:age|g)?\.?\s*)?\d{1,4}(?:\s*(?:of|/)\s*\d{1,4})?(?:\s*[-–—])?$")
        .unwrap()
});

/// Compiled cleanup rules for one conversion.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    patterns: Vec<Regex>,
    opts: CleanOptions,
}

impl TextCleaner {
    /// Compile the built-in and configured patterns.
    pub fn new(opts: &CleanOptions) -> Result<Self, Ocr2MdError> {
        let builtin: &[&str] = if opts.use_default_patterns {
            DEFAULT_STRIP_PATTERNS
        } else {
            &[]
        };
        let patterns = builtin
            .iter()
            .copied()
            .chain(opts.strip_patterns.iter().map(String::as_str))
            .map(|p| {
                Regex::new(&format!(r"(?i)^(?:{p})$")).map_err(|e| {
                    Ocr2MdError::InvalidConfig(format!("Invalid strip pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            opts: opts.clone(),
        })
    }

    /// Find header/footer lines repeated across pages.
    ///
    /// Only the first and last `edge_lines` non-blank lines of each page are
    /// candidates. On short pages the window is clamped to `(len - 1) / 2`
    /// lines per edge, so a 4-line page offers its first and last line and a
    /// 2-line page offers none. A candidate signature is kept when it occurs
    /// on at least `repeat_ratio` of the pages (and on two pages minimum).
    /// Signatures
    /// ignore case, punctuation and digits, so `Chapter 2 · page 14` and
    /// `Chapter 2 · page 15` count as the same line.
    pub fn detect_repeating(&self, raw_pages: &[String]) -> HashSet<String> {
        if !self.opts.detect_repeating || raw_pages.len() < 2 || self.opts.edge_lines == 0 {
            return HashSet::new();
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for raw in raw_pages {
            let lines: Vec<String> = normalise_lines(raw)
                .into_iter()
                .filter(|l| !l.is_empty())
                .collect();
            // The window shrinks on short pages so at least one line stays
            // outside it; a single-line page contributes nothing.
            let n = self.opts.edge_lines.min(lines.len().saturating_sub(1) / 2);
            if n == 0 {
                continue;
            }
            let edges = lines[..n].iter().chain(lines[lines.len() - n..].iter());

            let on_this_page: HashSet<String> = edges
                .map(|l| line_signature(l))
                .filter(|sig| !sig.is_empty())
                .collect();
            for sig in on_this_page {
                *counts.entry(sig).or_insert(0) += 1;
            }
        }

        let needed = ((raw_pages.len() as f32 * self.opts.repeat_ratio).ceil() as usize).max(2);
        let repeated: HashSet<String> = counts
            .into_iter()
            .filter(|(_, c)| *c >= needed)
            .map(|(sig, _)| sig)
            .collect();

        if !repeated.is_empty() {
            debug!(
                "Detected {} repeating header/footer lines across {} pages",
                repeated.len(),
                raw_pages.len()
            );
        }
        repeated
    }

    /// Clean one page of raw OCR text.
    ///
    /// `repeated` comes from [`TextCleaner::detect_repeating`]; pass an empty
    /// set to skip cross-page detection.
    pub fn clean_page(&self, raw: &str, repeated: &HashSet<String>) -> String {
        let mut kept: Vec<String> = Vec::new();
        let mut dropped = 0usize;

        let lines = normalise_lines(raw);
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                kept.push(String::new());
                continue;
            }
            let blank_at = |j: Option<usize>| {
                j.and_then(|j| lines.get(j)).map_or(true, |l| l.is_empty())
            };
            let isolated = blank_at(i.checked_sub(1)) && blank_at(Some(i + 1));
            if self.should_drop(line, repeated, isolated) {
                dropped += 1;
                continue;
            }
            kept.push(line.clone());
        }

        if dropped > 0 {
            debug!("Dropped {} header/footer/noise lines", dropped);
        }
        collapse_blank_lines(kept)
    }

    fn should_drop(&self, line: &str, repeated: &HashSet<String>, isolated: bool) -> bool {
        if RE_PAGE_NUMBER.is_match(line) {
            return true;
        }
        if self.patterns.iter().any(|re| re.is_match(line)) {
            return true;
        }
        if !repeated.is_empty() && repeated.contains(&line_signature(line)) {
            return true;
        }
        self.is_watermark(line, isolated)
    }

    /// Noise and watermark residue. Lines without letters or shorter than
    /// `min_line_chars` always go; the letter-density rule only applies to a
    /// line standing alone between blank lines, so figures inside a
    /// paragraph survive.
    fn is_watermark(&self, line: &str, isolated: bool) -> bool {
        let chars = line.chars().count();
        if chars < self.opts.min_line_chars {
            return true;
        }
        let visible = line.chars().filter(|c| !c.is_whitespace()).count();
        let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
        if alpha == 0 {
            return true;
        }
        isolated
            && chars <= self.opts.watermark_max_chars
            && (alpha as f32) < self.opts.min_alpha_ratio * visible as f32
    }
}

/// Steps 1–3: line endings, invisible chars, hyphen merge, per-line tidy.
fn normalise_lines(raw: &str) -> Vec<String> {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n").replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{000C}',
        ],
        "",
    );
    let text = RE_HYPHEN_WRAP.replace_all(&text, "$1$2");

    text.lines()
        .map(|line| {
            let line = RE_RULE_RUNS.replace_all(line, " ");
            RE_SPACES.replace_all(&line, " ").trim().to_string()
        })
        .collect()
}

/// Comparison key for "near-identical" lines: lowercase letters and spaces,
/// digits folded to `#`, everything else dropped.
pub fn line_signature(line: &str) -> String {
    let folded: String = line
        .chars()
        .filter_map(|c| {
            if c.is_ascii_digit() {
                Some('#')
            } else if c.is_alphanumeric() || c.is_whitespace() {
                Some(c)
            } else {
                None
            }
        })
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Step 8: at most one blank line in a row, none at either end.
fn collapse_blank_lines(lines: Vec<String>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() && out.last().map_or(true, |l: &String| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
