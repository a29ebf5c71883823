//! Pipeline stages for scanned-PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested without the others (and without pdfium or tesseract installed).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ ocr ──▶ clean ──▶ format ──▶ write
//! (path)   (pdfium)   (image ops)   (tesseract) (rules) (markdown) (disk)
//! ```
//!
//! 1. [`input`]      — validate the path and `%PDF` magic bytes
//! 2. [`render`]     — rasterise selected pages to PNG files; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`preprocess`] — grayscale, contrast, sharpen, denoise
//! 4. [`ocr`]        — recognise text through an [`ocr::OcrEngine`]
//! 5. [`clean`]      — drop headers, footers, page numbers and watermarks
//! 6. [`format`]     — headings and paragraphs, document assembly
//! 7. [`write`]      — atomic write of `<name>_clean.md`

pub mod clean;
pub mod format;
pub mod input;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod write;
