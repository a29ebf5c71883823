//! Result types returned by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything produced by a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The assembled Markdown document.
    pub markdown: String,
    /// Per-page results in ascending page order.
    pub pages: Vec<PageResult>,
    /// Metadata of the source document.
    pub metadata: DocumentMetadata,
    /// Aggregate statistics for the run.
    pub stats: ConversionStats,
}

/// The outcome of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 0-based page index in the source document.
    pub page_index: usize,
    /// 1-based page number, as shown in labels and file names.
    pub page_num: usize,
    /// Where the rasterised page image was saved.
    pub image_path: PathBuf,
    /// Rendered image width in pixels.
    pub width: u32,
    /// Rendered image height in pixels.
    pub height: u32,
    /// Text exactly as returned by the OCR engine.
    pub raw_text: String,
    /// Text after header/footer/watermark removal.
    pub cleaned_text: String,
    /// Markdown for this page (headings and paragraphs, no label).
    pub markdown: String,
    /// Wall-clock time spent preprocessing and recognising this page.
    pub ocr_duration_ms: u64,
}

impl PageResult {
    /// True when cleanup left any text on the page.
    pub fn has_text(&self) -> bool {
        !self.cleaned_text.trim().is_empty()
    }
}

/// Information about the source PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate numbers for a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages that went through the pipeline.
    pub processed_pages: usize,
    /// Processed pages that kept some text after cleanup.
    pub pages_with_text: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Markdown file written by [`crate::convert::convert_to_file`].
    pub output_file: Option<PathBuf>,
}
