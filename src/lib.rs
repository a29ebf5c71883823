//! # ocr2md
//!
//! Convert scanned (image-only) PDF documents to clean Markdown with OCR.
//!
//! ## Why this crate?
//!
//! Scanned course material, reports and forms carry no text layer, so text
//! extractors return nothing. This crate rasterises each page, enhances the
//! image, runs Tesseract over it and then removes what OCR picks up besides
//! the body text: running headers and footers, page numbers, watermark
//! residue and speckle noise. The remaining text is shaped into headings and
//! paragraphs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       validate path and %PDF magic
//!  ├─ 2. Render      rasterise pages via pdfium → images/<doc>-page-NNN.png
//!  ├─ 3. Preprocess  grayscale, contrast, sharpen, median denoise
//!  ├─ 4. OCR         tesseract --psm 6 --oem 3, page by page
//!  ├─ 5. Clean       strip headers/footers/page numbers/watermarks
//!  ├─ 6. Format      headings + paragraphs, pages assembled in order
//!  └─ 7. Write       output/<name>_clean.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2md::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .dpi(300)
//!         .output_dir("output")
//!         .image_dir("images")
//!         .build()?;
//!     let stats = convert_to_file("scan.pdf", &config).await?;
//!     eprintln!("{} of {} pages had text", stats.pages_with_text, stats.processed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! - A pdfium shared library (`PDFIUM_LIB_PATH`, working directory, or system)
//! - The `tesseract` executable with the requested language data, unless a
//!   custom [`OcrEngine`] is injected

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CleanOptions, ConversionConfig, ConversionConfigBuilder, FormatOptions, PageSelection,
    PageSeparator, PreprocessOptions,
};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file, inspect};
pub use error::{ErrorKind, Ocr2MdError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
