//! Markdown formatting: turn cleaned page text into headings, paragraphs and
//! lists, then assemble pages into one document.
//!
//! OCR output carries no font information, so headings are guessed from the
//! shape of a line: short, capitalised, no closing punctuation, and starting
//! a new block. All-caps headings become `##`, title-case ones `###`; the
//! document title is the only `#`.

use crate::config::{ConversionConfig, FormatOptions};
use crate::output::PageResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Shown for pages where cleanup left nothing.
pub const NO_TEXT_PLACEHOLDER: &str = "*No text could be extracted from this page*";

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•·▪◦■□●○*\-–]\s+(\S.*)$").unwrap());

static RE_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+(?:\.\d+)*\.?|[IVXLC]+\.)\s+").unwrap());

enum Block {
    Heading(usize, String),
    Paragraph(Vec<String>),
    List(Vec<String>),
}

impl Block {
    fn render(&self) -> String {
        match self {
            Block::Heading(level, text) => format!("{} {}", "#".repeat(*level), text),
            Block::Paragraph(lines) => lines.join(" "),
            Block::List(items) => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Format one page of cleaned text as Markdown.
///
/// Blank lines end a paragraph; consecutive non-heading lines are joined
/// with a single space. Returns an empty string for an empty page.
pub fn format_page(cleaned: &str, opts: &FormatOptions) -> String {
    let mut blocks: Vec<Block> = Vec::new();
    let mut at_block_start = true;

    for line in cleaned.lines().map(str::trim) {
        if line.is_empty() {
            at_block_start = true;
            continue;
        }

        let starts_block = at_block_start || ends_sentence(blocks.last());
        if starts_block {
            if let Some(level) = heading_level(line, opts) {
                blocks.push(Block::Heading(level, line.to_string()));
                at_block_start = true;
                continue;
            }
        }

        if let Some(caps) = RE_BULLET.captures(line) {
            let item = caps[1].to_string();
            match blocks.last_mut() {
                Some(Block::List(items)) if !at_block_start => items.push(item),
                _ => blocks.push(Block::List(vec![item])),
            }
        } else {
            match blocks.last_mut() {
                Some(Block::Paragraph(lines)) if !at_block_start => lines.push(line.to_string()),
                Some(Block::List(items)) if !at_block_start => {
                    if let Some(last) = items.last_mut() {
                        last.push(' ');
                        last.push_str(line);
                    }
                }
                _ => blocks.push(Block::Paragraph(vec![line.to_string()])),
            }
        }
        at_block_start = false;
    }

    blocks
        .iter()
        .map(Block::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// True when the text so far ends a sentence, so the next line may open a
/// new block even without a blank line in between.
fn ends_sentence(last: Option<&Block>) -> bool {
    let tail = match last {
        Some(Block::Paragraph(lines)) => lines.last(),
        Some(Block::List(items)) => items.last(),
        Some(Block::Heading(..)) => return true,
        None => return true,
    };
    tail.and_then(|l| l.chars().last())
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ':'))
}

/// Heading level for `line`, or `None` if it reads as body text.
pub fn heading_level(line: &str, opts: &FormatOptions) -> Option<usize> {
    if line.chars().count() > opts.heading_max_chars {
        return None;
    }
    let word_count = line.split_whitespace().count();
    if word_count == 0 || word_count > opts.heading_max_words {
        return None;
    }
    let last = line.chars().last()?;
    if matches!(last, '.' | ',' | ';' | ':' | '!' | '?') {
        return None;
    }

    let body = RE_NUMBERING.replace(line, "");
    if !body.chars().next()?.is_uppercase() {
        return None;
    }

    let letters: Vec<char> = body.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 2 {
        return None;
    }

    let words: Vec<&str> = body
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_alphanumeric))
        .collect();
    if words.is_empty() {
        return None;
    }
    let titled = words
        .iter()
        .filter(|w| {
            w.chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        })
        .count();
    if (titled as f32) < opts.heading_min_title_ratio * words.len() as f32 {
        return None;
    }

    if letters.iter().all(|c| c.is_uppercase()) {
        Some(2)
    } else {
        Some(3)
    }
}

/// Human title for a file stem: separators become spaces, each word is
/// capitalised. `annual_report-2023` → `Annual Report 2023`.
pub fn document_title(stem: &str) -> String {
    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Assemble per-page Markdown into the final document.
///
/// Pages appear in the order given (ascending page index). The output is a
/// pure function of its inputs: no timestamps, no run-specific paths.
pub fn assemble_document(doc_stem: &str, pages: &[PageResult], config: &ConversionConfig) -> String {
    let mut out = String::new();

    if config.include_title {
        out.push_str(&format!("# {}\n\n", document_title(doc_stem)));
    }

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(&config.page_separator.render(page.page_num));
        }
        if config.page_labels {
            out.push_str(&format!("**Page {}**\n\n", page.page_num));
        }
        if page.markdown.trim().is_empty() {
            out.push_str(NO_TEXT_PLACEHOLDER);
        } else {
            out.push_str(&page.markdown);
        }
    }

    polish(&out)
}

/// Final whitespace pass over the assembled document.
///
/// 1. Normalise line endings
/// 2. Trim trailing whitespace per line
/// 3. Collapse runs of blank lines to one
/// 4. Ensure the file ends with exactly one newline
pub fn polish(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 4: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSeparator;
    use std::path::PathBuf;

    fn fmt(text: &str) -> String {
        format_page(text, &FormatOptions::default())
    }

    fn page(num: usize, markdown: &str) -> PageResult {
        PageResult {
            page_index: num - 1,
            page_num: num,
            image_path: PathBuf::from(format!("images/doc-page-{num:03}.png")),
            width: 10,
            height: 10,
            raw_text: markdown.to_string(),
            cleaned_text: markdown.to_string(),
            markdown: markdown.to_string(),
            ocr_duration_ms: 0,
        }
    }

    #[test]
    fn all_caps_line_is_h2() {
        assert_eq!(
            fmt("INTRODUCTION\nThis guide covers budgets."),
            "## INTRODUCTION\n\nThis guide covers budgets."
        );
    }

    #[test]
    fn title_case_line_is_h3() {
        assert_eq!(
            fmt("Managing Cash Flow\nCash moves in and out."),
            "### Managing Cash Flow\n\nCash moves in and out."
        );
    }

    #[test]
    fn numbered_heading_is_detected() {
        assert_eq!(heading_level("2.1 Budget Controls", &FormatOptions::default()), Some(3));
        assert_eq!(heading_level("IV. SUMMARY", &FormatOptions::default()), Some(2));
    }

    #[test]
    fn sentences_are_not_headings() {
        let opts = FormatOptions::default();
        assert_eq!(heading_level("This is a sentence.", &opts), None);
        assert_eq!(heading_level("the budget is set by the manager", &opts), None);
        assert_eq!(heading_level("Budgets are set by the finance team each year", &opts), None);
        assert_eq!(heading_level("Note:", &opts), None);
    }

    #[test]
    fn wrapped_lines_join_into_paragraph() {
        assert_eq!(
            fmt("The first line of a paragraph\ncontinues here and\nends here.\n\nSecond one."),
            "The first line of a paragraph continues here and ends here.\n\nSecond one."
        );
    }

    #[test]
    fn capitalised_continuation_is_not_a_heading() {
        assert_eq!(
            fmt("Payments are approved by\nThe Finance Director"),
            "Payments are approved by The Finance Director"
        );
    }

    #[test]
    fn heading_after_sentence_end_without_blank_line() {
        assert_eq!(
            fmt("The year closed well.\nNext Steps\nPlan for growth."),
            "The year closed well.\n\n### Next Steps\n\nPlan for growth."
        );
    }

    #[test]
    fn bullets_become_list_items() {
        assert_eq!(
            fmt("Key points:\n• Track spending\n• Review monthly\nand adjust.\n\nDone here."),
            "Key points:\n\n- Track spending\n- Review monthly and adjust.\n\nDone here."
        );
    }

    #[test]
    fn empty_page_formats_to_empty() {
        assert_eq!(fmt(""), "");
    }

    #[test]
    fn document_title_from_stem() {
        assert_eq!(document_title("annual_report-2023"), "Annual Report 2023");
        assert_eq!(document_title("BSBFIN601_learner_GUIDE"), "Bsbfin601 Learner Guide");
    }

    #[test]
    fn assemble_orders_and_labels_pages() {
        let config = ConversionConfig::default();
        let md = assemble_document(
            "my_doc",
            &[page(1, "First page."), page(2, ""), page(3, "Third page.")],
            &config,
        );
        assert_eq!(
            md,
            "# My Doc\n\n**Page 1**\n\nFirst page.\n\n---\n\n**Page 2**\n\n\
             *No text could be extracted from this page*\n\n---\n\n**Page 3**\n\nThird page.\n"
        );
    }

    #[test]
    fn assemble_without_title_labels_or_separator() {
        let config = ConversionConfig::builder()
            .include_title(false)
            .page_labels(false)
            .page_separator(PageSeparator::None)
            .build()
            .unwrap();
        let md = assemble_document("doc", &[page(1, "One."), page(2, "Two.")], &config);
        assert_eq!(md, "One.\n\nTwo.\n");
    }

    #[test]
    fn assemble_is_deterministic() {
        let config = ConversionConfig::default();
        let pages = [page(1, "## HELLO\n\nBody."), page(2, "More body.")];
        assert_eq!(
            assemble_document("doc", &pages, &config),
            assemble_document("doc", &pages, &config)
        );
    }

    #[test]
    fn polish_rules() {
        assert_eq!(polish("a  \r\nb\n\n\n\n\nc"), "a\nb\n\nc\n");
        assert_eq!(polish(""), "\n");
    }
}
