//! Conversion entry points.
//!
//! A run is one pass over the document: render every selected page to disk,
//! recognise each page in ascending order, then clean and format the text
//! once all pages are in. Cleanup needs the whole document because running
//! headers and footers are only recognisable by their repetition across
//! pages, so only the recognised text (not the images) is held until then.
//!
//! Every error is fatal. Discovery of the OCR engine and validation of the
//! page selection happen before anything is written to disk.

use crate::config::ConversionConfig;
use crate::error::Ocr2MdError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult};
use crate::pipeline::clean::TextCleaner;
use crate::pipeline::ocr::{self, OcrEngine};
use crate::pipeline::render::RenderedPage;
use crate::pipeline::{format, input, preprocess, render, write};
use std::io::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a scanned PDF to Markdown.
///
/// Page images are written to `config.image_dir` as a side effect; the
/// Markdown is returned, not written. Use [`convert_to_file`] to also
/// persist `<name>_clean.md`.
///
/// # Errors
/// The first failure aborts the run:
/// - file not found, unreadable, not a PDF, corrupt, password-protected
/// - a selected page outside the document
/// - OCR engine missing, or failing on any page
/// - page images that cannot be written
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Ocr2MdError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str)?;
    let pdf_path = resolved.path().to_path_buf();
    let doc_stem = resolved.stem().to_string();

    // ── Step 2: Compile cleanup rules, locate the OCR engine ─────────────
    let cleaner = TextCleaner::new(&config.cleaning)?;
    let engine = ocr::resolve_engine(config)?;
    debug!("OCR engine: {}", engine.name());

    // ── Step 3: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(&pdf_path, config).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 4: Validate page selection ──────────────────────────────────
    let page_indices = config.pages.resolve(total_pages)?;
    let selected = page_indices.len();
    debug!("Selected {} pages for conversion", selected);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    // ── Step 5: Rasterise pages to disk ──────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(&pdf_path, config, &page_indices, &doc_stem).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

    // ── Step 6: Preprocess + OCR, one page at a time ─────────────────────
    let ocr_start = Instant::now();
    let mut recognised: Vec<(RenderedPage, String, u64)> = Vec::with_capacity(selected);
    for page in rendered {
        let (text, ms) = recognise_page(&engine, &page, config, selected).await?;
        recognised.push((page, text, ms));
    }
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 7: Clean + format ───────────────────────────────────────────
    let raw_texts: Vec<String> = recognised.iter().map(|(_, t, _)| t.clone()).collect();
    let repeated = cleaner.detect_repeating(&raw_texts);

    let pages: Vec<PageResult> = recognised
        .into_iter()
        .map(|(page, raw_text, ms)| {
            let cleaned_text = cleaner.clean_page(&raw_text, &repeated);
            let markdown = format::format_page(&cleaned_text, &config.format);
            if markdown.is_empty() {
                warn!("Page {}: no text left after cleanup", page.page_index + 1);
            }
            PageResult {
                page_index: page.page_index,
                page_num: page.page_index + 1,
                image_path: page.image_path,
                width: page.width,
                height: page.height,
                raw_text,
                cleaned_text,
                markdown,
                ocr_duration_ms: ms,
            }
        })
        .collect();

    // ── Step 8: Assemble ─────────────────────────────────────────────────
    write::verify_page_images(&pages)?;
    let markdown = format::assemble_document(&doc_stem, &pages, config);

    let pages_with_text = pages.iter().filter(|p| p.has_text()).count();
    let stats = ConversionStats {
        total_pages,
        processed_pages: pages.len(),
        pages_with_text,
        render_duration_ms,
        ocr_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        output_file: None,
    };

    info!(
        "Conversion complete: {}/{} pages with text, {}ms total",
        pages_with_text, stats.processed_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, pages_with_text);
    }

    Ok(ConversionOutput {
        markdown,
        pages,
        metadata,
        stats,
    })
}

/// Preprocess and recognise one rendered page on the blocking pool.
async fn recognise_page(
    engine: &Arc<dyn OcrEngine>,
    page: &RenderedPage,
    config: &ConversionConfig,
    selected: usize,
) -> Result<(String, u64), Ocr2MdError> {
    let page_num = page.page_index + 1;
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(page_num, selected);
    }

    let start = Instant::now();
    let engine = Arc::clone(engine);
    let path = page.image_path.clone();
    let opts = config.preprocess.for_dpi(config.dpi);
    let result = tokio::task::spawn_blocking(move || {
        let img = preprocess::load_and_preprocess(&path, &opts)?;
        engine.recognize(&img, page_num)
    })
    .await
    .map_err(|e| Ocr2MdError::Internal(format!("OCR task panicked: {}", e)))
    .and_then(|r| r);
    let ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(text) => {
            debug!("Page {}: {} chars in {}ms", page_num, text.len(), ms);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_complete(page_num, selected, text.chars().count());
            }
            Ok((text, ms))
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_error(page_num, selected, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Convert a PDF and write `<output_dir>/<name>_clean.md`.
///
/// `<name>` is `config.output_name`, or the PDF file stem. The write is
/// atomic and replaces an existing file.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Ocr2MdError> {
    let input_str = input_str.as_ref();
    let output = convert(input_str, config).await?;

    let stem = input::document_stem(std::path::Path::new(input_str));
    let name = config.resolved_output_name(&stem);
    let path = write::write_markdown(&config.output_dir, name, &output.markdown).await?;

    let mut stats = output.stats;
    stats.output_file = Some(path);
    Ok(stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Ocr2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Ocr2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without rendering or OCR.
///
/// Needs pdfium but not tesseract.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Ocr2MdError> {
    let resolved = input::resolve_input(input_str.as_ref())?;
    render::extract_metadata(resolved.path(), config).await
}

/// Convert PDF bytes held in memory.
///
/// `name` stands in for the file stem: it names the page images and the
/// document title. The bytes are written to a managed temporary directory
/// that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use ocr2md::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("scan.pdf")?;
/// let output = convert_from_bytes(&bytes, "scan", &ConversionConfig::default()).await?;
/// println!("{}", output.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Ocr2MdError> {
    let dir = tempfile::tempdir().map_err(|e| Ocr2MdError::Internal(format!("tempdir: {e}")))?;
    let stem = input::document_stem(std::path::Path::new(name));
    let path = dir.path().join(format!("{stem}.pdf"));

    let mut file = std::fs::File::create(&path)
        .map_err(|e| Ocr2MdError::Internal(format!("tempfile create: {e}")))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| Ocr2MdError::Internal(format!("tempfile write: {e}")))?;
    drop(file);

    // `dir` is removed when it goes out of scope after `convert` returns
    convert(path.to_string_lossy(), config).await
}
