//! Configuration types for scanned-PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Nothing is persisted between runs:
//! the CLI maps its flags onto the builder and the library takes the result.
//!
//! The heuristic knobs (cleanup thresholds, heading detection, image
//! enhancement strengths) are grouped into [`CleanOptions`],
//! [`FormatOptions`] and [`PreprocessOptions`]. Their defaults are tuned for
//! full-page scans of prose documents; none of them is a hard contract.

use crate::error::Ocr2MdError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a scanned-PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr2md::{ConversionConfig, PageSelection};
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .pages(PageSelection::Indices(vec![0, 1]))
///     .output_dir("out")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation resolution in dots per inch. Range: 72–600. Default: 300.
    ///
    /// Tesseract is trained on text with a cap height of roughly 20–30 px,
    /// which 300 DPI delivers for ordinary 10–12 pt body text.
    pub dpi: u32,

    /// Optional cap on either rendered dimension, in pixels. Default: None.
    ///
    /// Large-format pages at high DPI can produce images of several hundred
    /// megabytes. When set, the longer edge is clamped and the other scaled
    /// proportionally.
    pub max_rendered_pixels: Option<u32>,

    /// Page selection (0-based). Default: all pages.
    pub pages: PageSelection,

    /// Directory receiving `<name>_clean.md`. Default: `output`.
    pub output_dir: PathBuf,

    /// Directory receiving `<docname>-page-NNN.png`. Default: `images`.
    pub image_dir: PathBuf,

    /// Base name of the Markdown file. Default: the PDF file stem.
    pub output_name: Option<String>,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub language: String,

    /// Explicit path to the `tesseract` executable. Default: search `PATH`.
    pub tesseract_path: Option<PathBuf>,

    /// Explicit path to the pdfium shared library. Default: `PDFIUM_LIB_PATH`,
    /// the working directory, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_path`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Emit a `# Title` heading derived from the file name. Default: true.
    pub include_title: bool,

    /// Emit a `**Page N**` label before each page. Default: true.
    pub page_labels: bool,

    /// Separator between pages in the assembled output. Default: `---`.
    pub page_separator: PageSeparator,

    /// Image enhancement applied before OCR.
    pub preprocess: PreprocessOptions,

    /// Text cleanup rules applied to raw OCR output.
    pub cleaning: CleanOptions,

    /// Heading/paragraph detection thresholds.
    pub format: FormatOptions,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: None,
            pages: PageSelection::default(),
            output_dir: PathBuf::from("output"),
            image_dir: PathBuf::from("images"),
            output_name: None,
            language: "eng".to_string(),
            tesseract_path: None,
            pdfium_lib_path: None,
            ocr_engine: None,
            include_title: true,
            page_labels: true,
            page_separator: PageSeparator::default(),
            preprocess: PreprocessOptions::default(),
            cleaning: CleanOptions::default(),
            format: FormatOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pages", &self.pages)
            .field("output_dir", &self.output_dir)
            .field("image_dir", &self.image_dir)
            .field("output_name", &self.output_name)
            .field("language", &self.language)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("include_title", &self.include_title)
            .field("page_labels", &self.page_labels)
            .field("page_separator", &self.page_separator)
            .field("preprocess", &self.preprocess)
            .field("cleaning", &self.cleaning)
            .field("format", &self.format)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Markdown base name for a document with the given file stem.
    pub fn resolved_output_name<'a>(&'a self, doc_stem: &'a str) -> &'a str {
        match self.output_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => doc_stem,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = Some(px.max(100));
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = Some(name.into());
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn include_title(mut self, v: bool) -> Self {
        self.config.include_title = v;
        self
    }

    pub fn page_labels(mut self, v: bool) -> Self {
        self.config.page_labels = v;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn preprocess(mut self, opts: PreprocessOptions) -> Self {
        self.config.preprocess = opts;
        self
    }

    pub fn cleaning(mut self, opts: CleanOptions) -> Self {
        self.config.cleaning = opts;
        self
    }

    /// Append one extra header/footer/watermark regex to the cleanup rules.
    pub fn strip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.cleaning.strip_patterns.push(pattern.into());
        self
    }

    pub fn detect_repeating(mut self, v: bool) -> Self {
        self.config.cleaning.detect_repeating = v;
        self
    }

    pub fn format(mut self, opts: FormatOptions) -> Self {
        self.config.format = opts;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Ocr2MdError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.language.trim().is_empty() {
            return Err(Ocr2MdError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if let PageSelection::Indices(ref idx) = c.pages {
            if idx.is_empty() {
                return Err(Ocr2MdError::InvalidConfig(
                    "Page list must contain at least one index".into(),
                ));
            }
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start >= end {
                return Err(Ocr2MdError::InvalidConfig(format!(
                    "Page range {start}..{end} is empty"
                )));
            }
        }
        for pattern in &c.cleaning.strip_patterns {
            Regex::new(pattern).map_err(|e| {
                Ocr2MdError::InvalidConfig(format!("Invalid strip pattern '{pattern}': {e}"))
            })?;
        }
        for (name, ratio) in [
            ("repeat_ratio", c.cleaning.repeat_ratio),
            ("min_alpha_ratio", c.cleaning.min_alpha_ratio),
            ("heading_min_title_ratio", c.format.heading_min_title_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(Ocr2MdError::InvalidConfig(format!(
                    "{name} must be within 0.0–1.0, got {ratio}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Heuristic option groups ──────────────────────────────────────────────

/// Image enhancement strengths applied before OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Contrast change in percent (`imageops::contrast`). Default: 50.0.
    ///
    /// Stretching contrast pushes faint background watermarks towards white
    /// while keeping body text black.
    pub contrast: f32,
    /// Unsharp-mask blur radius. Default: 1.0.
    pub sharpen_sigma: f32,
    /// Unsharp-mask threshold. Default: 2.
    pub sharpen_threshold: i32,
    /// Median filter radius in pixels; 0 disables the pass. Default: 1.
    ///
    /// Radius 1 is a 3×3 window: it clears isolated specks and scanner dust
    /// but also thins strokes one pixel wide. Below [`MEDIAN_MIN_DPI`] glyph
    /// strokes are often that thin, so the pass is skipped there (see
    /// [`PreprocessOptions::for_dpi`]).
    pub median_radius: u32,
}

/// Renders below this DPI skip the median filter.
pub const MEDIAN_MIN_DPI: u32 = 150;

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            contrast: 50.0,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
            median_radius: 1,
        }
    }
}

impl PreprocessOptions {
    /// The options to apply to a page rendered at `dpi`.
    ///
    /// At low resolution the median filter is turned off so thin strokes
    /// are not eroded; everything else is unchanged.
    pub fn for_dpi(&self, dpi: u32) -> Self {
        let mut opts = self.clone();
        if dpi < MEDIAN_MIN_DPI {
            opts.median_radius = 0;
        }
        opts
    }
}

/// Cleanup rules for raw OCR text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Apply the built-in header/footer/watermark patterns. Default: true.
    pub use_default_patterns: bool,
    /// Extra case-insensitive regexes; a line matching one in full is removed.
    pub strip_patterns: Vec<String>,
    /// Remove lines that repeat at the top/bottom of several pages. Default: true.
    pub detect_repeating: bool,
    /// How many lines at each edge of a page are header/footer candidates. Default: 3.
    ///
    /// Clamped per page to `(lines - 1) / 2`, so short pages still take part
    /// and a single-line page never does.
    pub edge_lines: usize,
    /// Fraction of pages a candidate must appear on. Default: 0.5.
    pub repeat_ratio: f32,
    /// Lines shorter than this (in chars) are dropped as noise. Default: 3.
    pub min_line_chars: usize,
    /// Lines up to this length are watermark candidates. Default: 40.
    pub watermark_max_chars: usize,
    /// Candidates whose alphabetic share of non-space chars is below this
    /// are dropped. Default: 0.5.
    pub min_alpha_ratio: f32,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            strip_patterns: Vec::new(),
            detect_repeating: true,
            edge_lines: 3,
            repeat_ratio: 0.5,
            min_line_chars: 3,
            watermark_max_chars: 40,
            min_alpha_ratio: 0.5,
        }
    }
}

/// Heading detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Headings are at most this many characters. Default: 60.
    pub heading_max_chars: usize,
    /// Headings are at most this many words. Default: 10.
    pub heading_max_words: usize,
    /// Minimum share of words starting with an uppercase letter or digit. Default: 0.5.
    pub heading_min_title_ratio: f32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            heading_max_chars: 60,
            heading_max_words: 10,
            heading_min_title_ratio: 0.5,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert. Indices are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a contiguous half-open range `start..end`.
    Range(usize, usize),
    /// Convert specific pages, in any order, duplicates allowed.
    ///
    /// Signed so that negative indices coming from the command line are
    /// reported as out of range instead of failing to parse.
    Indices(Vec<i64>),
}

impl PageSelection {
    /// Resolve the selection against a document with `total_pages` pages.
    ///
    /// Returns the ascending, deduplicated list of 0-based indices. Any
    /// index outside `0..total_pages` is an error; nothing is clipped.
    pub fn resolve(&self, total_pages: usize) -> Result<Vec<usize>, Ocr2MdError> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Range(start, end) => {
                if start >= end {
                    return Err(Ocr2MdError::InvalidConfig(format!(
                        "Page range {start}..{end} is empty"
                    )));
                }
                if *end > total_pages {
                    return Err(Ocr2MdError::PageOutOfRange {
                        page: (*end - 1) as i64,
                        total: total_pages,
                    });
                }
                (*start..*end).collect()
            }
            PageSelection::Indices(pages) => {
                let mut out = Vec::with_capacity(pages.len());
                for &p in pages {
                    if p < 0 || p as u64 >= total_pages as u64 {
                        return Err(Ocr2MdError::PageOutOfRange {
                            page: p,
                            total: total_pages,
                        });
                    }
                    out.push(p as usize);
                }
                out
            }
        };
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }
}

/// How to separate pages in the assembled Markdown output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with a blank line.
    None,
    /// Horizontal rule: "\n\n---\n\n" (default)
    #[default]
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
