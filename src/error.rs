//! Error types for the ocr2md library.
//!
//! Every failure in the pipeline is fatal: a scanned document is converted
//! in one pass and the first error aborts the run before the Markdown file
//! is written. There is therefore a single error enum, [`Ocr2MdError`],
//! grouped by the stage that produces each variant.
//!
//! Callers that only care about the broad category (for exit codes or
//! user-facing summaries) use [`Ocr2MdError::kind`], which folds the
//! variants into the four user-visible kinds — input, page range, OCR and
//! output — plus configuration and internal failures.

use std::path::PathBuf;
use thiserror::Error;

/// Broad category of an [`Ocr2MdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Missing, unreadable, invalid or protected PDF; unsupported image.
    Input,
    /// A requested page index is outside the document.
    PageRange,
    /// The OCR engine is missing or failed.
    Ocr,
    /// Markdown or image output could not be written.
    Output,
    /// The configuration was rejected by the builder.
    Config,
    /// Unexpected internal failure (e.g. a worker task panicked).
    Internal,
}

/// All errors returned by the ocr2md library.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF is encrypted; protected documents are not supported.
    #[error("PDF '{path}' is password-protected.\nRemove the protection first, e.g.: qpdf --decrypt in.pdf out.pdf")]
    PasswordProtected { path: PathBuf },

    /// The PDF opened fine but contains no pages.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// A page image could not be decoded or encoded.
    #[error("Unsupported image '{path}': {detail}")]
    UnsupportedImage { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium and either:\n\
  • place libpdfium next to the executable or in the working directory,\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • pass --pdfium-lib-path /path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Page selection errors ─────────────────────────────────────────────
    /// A selected page index (0-based) is outside the document.
    #[error("Page {page} is out of range (document has {total} pages, valid indices are 0..{total})")]
    PageOutOfRange { page: i64, total: usize },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR executable could not be located.
    #[error(
        "OCR engine not found: {detail}\n\
Install Tesseract (e.g. `apt install tesseract-ocr` or `brew install tesseract`)\n\
or point --tesseract-path / TESSERACT_CMD at the executable."
    )]
    OcrEngineNotFound { detail: String },

    /// The OCR engine ran but failed on a page.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Ocr2MdError {
    /// The broad category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Ocr2MdError::FileNotFound { .. }
            | Ocr2MdError::PermissionDenied { .. }
            | Ocr2MdError::NotAPdf { .. }
            | Ocr2MdError::CorruptPdf { .. }
            | Ocr2MdError::PasswordProtected { .. }
            | Ocr2MdError::EmptyDocument { .. }
            | Ocr2MdError::UnsupportedImage { .. }
            | Ocr2MdError::RasterisationFailed { .. }
            | Ocr2MdError::PdfiumBindingFailed(_) => ErrorKind::Input,
            Ocr2MdError::PageOutOfRange { .. } => ErrorKind::PageRange,
            Ocr2MdError::OcrEngineNotFound { .. } | Ocr2MdError::OcrFailed { .. } => {
                ErrorKind::Ocr
            }
            Ocr2MdError::OutputWriteFailed { .. } => ErrorKind::Output,
            Ocr2MdError::InvalidConfig(_) => ErrorKind::Config,
            Ocr2MdError::Internal(_) => ErrorKind::Internal,
        }
    }
}
