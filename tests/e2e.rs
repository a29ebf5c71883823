//! End-to-end integration tests for ocr2md.
//!
//! Tests that need the pdfium library (and, for the OCR test, the
//! `tesseract` executable) are gated behind the `E2E_ENABLED` environment
//! variable. They build a small synthetic PDF in a temp directory, so no
//! fixture files are required.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! Input validation and the pure cleaning/formatting properties always run.

use image::DynamicImage;
use ocr2md::pipeline::clean::TextCleaner;
use ocr2md::pipeline::format;
use ocr2md::{
    convert, convert_to_file, inspect, CleanOptions, ConversionConfig, ConversionProgressCallback,
    ErrorKind, Ocr2MdError, OcrEngine, PageSelection,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set and pdfium can be bound.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if let Err(e) = ocr2md::pipeline::render::bind_pdfium(None) {
            println!("SKIP — pdfium not available: {e}");
            return;
        }
    }};
}

/// Build a PDF with one page per entry of `lines`, each showing that text
/// in 48 pt Helvetica near the top of a US-letter page.
fn synthetic_pdf(lines: &[&str]) -> Vec<u8> {
    let n = lines.len();
    let mut objects: Vec<String> = Vec::new();

    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (i, text) in lines.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let stream = format!("BT /F1 48 Tf 72 650 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    pdf.into_bytes()
}

/// Write a 3-page "Hello World" document as `doc.pdf` in `dir`.
fn hello_world_pdf(dir: &Path) -> PathBuf {
    let path = dir.join("doc.pdf");
    std::fs::write(&path, synthetic_pdf(&["Hello World"; 3])).unwrap();
    path
}

/// OCR engine that records the order it was called in and returns a
/// page-specific sentence.
#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<usize>>,
    fail_on: Option<usize>,
}

impl OcrEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn recognize(&self, image: &DynamicImage, page_num: usize) -> Result<String, Ocr2MdError> {
        assert!(image.width() > 0 && image.height() > 0);
        self.calls.lock().unwrap().push(page_num);
        if self.fail_on == Some(page_num) {
            return Err(Ocr2MdError::OcrFailed {
                page: page_num,
                detail: "simulated failure".into(),
            });
        }
        Ok(format!("Recognised text from scan number {page_num}.\n"))
    }
}

fn config_in(dir: &Path, engine: Arc<RecordingEngine>) -> ocr2md::ConversionConfigBuilder {
    ConversionConfig::builder()
        .dpi(72)
        .output_dir(dir.join("output"))
        .image_dir(dir.join("images"))
        .ocr_engine(engine)
}

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    finished: AtomicUsize,
}

impl ConversionProgressCallback for CountingCallback {
    fn on_page_start(&self, _page_num: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _page_num: usize, _total: usize, _chars: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_error(&self, _page_num: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, _total: usize, _with_text: usize) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Input validation (always on) ─────────────────────────────────────────────

#[tokio::test]
async fn test_missing_file_is_input_error() {
    let err = convert("/definitely/not/here.pdf", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_non_pdf_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.pdf");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot a pdf").unwrap();

    let err = tokio_test::block_on(inspect(
        path.to_string_lossy(),
        &ConversionConfig::default(),
    ))
    .unwrap_err();
    assert!(matches!(err, Ocr2MdError::NotAPdf { .. }), "{err}");
}

#[tokio::test]
async fn test_invalid_pdf_writes_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pdf");
    std::fs::write(&path, b"").unwrap();

    let config = config_in(dir.path(), Arc::new(RecordingEngine::default()))
        .build()
        .unwrap();
    let err = convert_to_file(path.to_string_lossy(), &config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!dir.path().join("output").exists());
    assert!(!dir.path().join("images").exists());
}

// ── Cleaning & formatting properties (always on) ─────────────────────────────

#[test]
fn test_cleaned_text_never_contains_configured_pattern_line() {
    let patterns = ["ACME Training Pty Ltd", r"Unit BSB\d+ Learner Guide", "Internal use only"];
    let opts = CleanOptions {
        strip_patterns: patterns.iter().map(|s| s.to_string()).collect(),
        ..CleanOptions::default()
    };
    let cleaner = TextCleaner::new(&opts).unwrap();

    let pages = [
        "ACME Training Pty Ltd\nBudgets are planned yearly.\nUnit BSB601 Learner Guide",
        "  acme   training pty LTD  \nCash flow matters.\r\nInternal use only\r\n",
        "Unit BSB602 Learner Guide\n\n\nReview the variance report.\nINTERNAL USE ONLY",
        "ACME Training Pty Ltd\u{200B}\nThe ACME Training Pty Ltd handbook is mentioned inline.",
    ];
    let raw: Vec<String> = pages.iter().map(|s| s.to_string()).collect();
    let repeated = cleaner.detect_repeating(&raw);

    let whole_line: Vec<regex::Regex> = patterns
        .iter()
        .map(|p| regex::Regex::new(&format!("(?i)^(?:{p})$")).unwrap())
        .collect();

    for page in &raw {
        let cleaned = cleaner.clean_page(page, &repeated);
        for line in cleaned.lines() {
            assert!(
                !whole_line.iter().any(|re| re.is_match(line)),
                "configured pattern survived as a line: {line:?}"
            );
        }
    }

    let last = cleaner.clean_page(&raw[3], &repeated);
    assert!(last.contains("handbook is mentioned inline"));
}

#[test]
fn test_formatting_is_deterministic_and_ordered() {
    let config = ConversionConfig::default();
    let pages: Vec<ocr2md::PageResult> = (1..=3)
        .map(|n| ocr2md::PageResult {
            page_index: n - 1,
            page_num: n,
            image_path: PathBuf::from(format!("images/doc-page-{n:03}.png")),
            width: 100,
            height: 100,
            raw_text: String::new(),
            cleaned_text: format!("Section {n} body text."),
            markdown: format::format_page(
                &format!("Section {n} body text."),
                &config.format,
            ),
            ocr_duration_ms: n as u64,
        })
        .collect();

    let a = format::assemble_document("doc", &pages, &config);
    let b = format::assemble_document("doc", &pages, &config);
    assert_eq!(a, b);

    let p1 = a.find("Section 1").unwrap();
    let p2 = a.find("Section 2").unwrap();
    let p3 = a.find("Section 3").unwrap();
    assert!(p1 < p2 && p2 < p3);
    assert!(a.starts_with("# Doc\n"));
}

// ── Pipeline with pdfium (gated) ─────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_synthetic_pdf() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());

    let meta = inspect(pdf.to_string_lossy(), &ConversionConfig::default())
        .await
        .expect("inspect() should succeed");
    assert_eq!(meta.page_count, 3);
    assert!(!meta.pdf_version.is_empty());
}

#[tokio::test]
async fn test_all_pages_in_ascending_order() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());
    let engine = Arc::new(RecordingEngine::default());

    let config = config_in(dir.path(), engine.clone()).build().unwrap();
    let output = convert(pdf.to_string_lossy(), &config).await.unwrap();

    assert_eq!(*engine.calls.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(output.stats.processed_pages, 3);
    assert_eq!(output.stats.pages_with_text, 3);
    for (i, page) in output.pages.iter().enumerate() {
        assert_eq!(page.page_index, i);
        let name = format!("doc-page-{:03}.png", i + 1);
        assert!(page.image_path.ends_with(&name), "{:?}", page.image_path);
        assert!(page.image_path.is_file());
    }
}

#[tokio::test]
async fn test_page_list_order_does_not_change_output_order() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());
    let engine = Arc::new(RecordingEngine::default());

    let config = config_in(dir.path(), engine.clone())
        .pages(PageSelection::Indices(vec![2, 0, 1]))
        .build()
        .unwrap();
    let output = convert(pdf.to_string_lossy(), &config).await.unwrap();

    assert_eq!(*engine.calls.lock().unwrap(), vec![1, 2, 3]);
    let md = &output.markdown;
    let p1 = md.find("scan number 1").unwrap();
    let p2 = md.find("scan number 2").unwrap();
    let p3 = md.find("scan number 3").unwrap();
    assert!(p1 < p2 && p2 < p3, "{md}");
}

#[tokio::test]
async fn test_out_of_range_pages_write_nothing() {
    e2e_skip_unless_ready!();
    for bad in [vec![0, 3], vec![-1], vec![7]] {
        let dir = tempfile::tempdir().unwrap();
        let pdf = hello_world_pdf(dir.path());
        let engine = Arc::new(RecordingEngine::default());

        let config = config_in(dir.path(), engine.clone())
            .pages(PageSelection::Indices(bad.clone()))
            .build()
            .unwrap();
        let err = convert_to_file(pdf.to_string_lossy(), &config)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PageRange, "{bad:?}: {err}");
        assert!(engine.calls.lock().unwrap().is_empty());
        assert!(!dir.path().join("images").exists(), "{bad:?}");
        assert!(!dir.path().join("output").exists(), "{bad:?}");
    }
}

#[tokio::test]
async fn test_ocr_failure_aborts_without_markdown() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());
    let engine = Arc::new(RecordingEngine {
        fail_on: Some(2),
        ..RecordingEngine::default()
    });
    let cb = Arc::new(CountingCallback::default());

    let config = config_in(dir.path(), engine.clone())
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let err = convert_to_file(pdf.to_string_lossy(), &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Ocr);
    assert_eq!(*engine.calls.lock().unwrap(), vec![1, 2]);
    assert_eq!(cb.started.load(Ordering::SeqCst), 2);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 1);
    assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    assert_eq!(cb.finished.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("output/doc_clean.md").exists());
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());

    let config = config_in(dir.path(), Arc::new(RecordingEngine::default()))
        .output_name("notes")
        .build()
        .unwrap();

    let first = convert_to_file(pdf.to_string_lossy(), &config).await.unwrap();
    let path = first.output_file.clone().unwrap();
    assert!(path.ends_with("notes_clean.md"));
    let a = std::fs::read(&path).unwrap();

    let second = convert_to_file(pdf.to_string_lossy(), &config).await.unwrap();
    assert_eq!(second.output_file.as_deref(), Some(path.as_path()));
    let b = std::fs::read(&path).unwrap();
    assert_eq!(a, b);
}

// ── Full OCR with tesseract (gated) ──────────────────────────────────────────

#[tokio::test]
async fn test_hello_world_three_pages_with_tesseract() {
    e2e_skip_unless_ready!();
    if ocr2md::pipeline::ocr::locate_tesseract(None).is_err() {
        println!("SKIP — tesseract not found");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let pdf = hello_world_pdf(dir.path());
    let images = dir.path().join("images");

    let config = ConversionConfig::builder()
        .dpi(300)
        .output_dir(dir.path().join("output"))
        .image_dir(&images)
        .build()
        .unwrap();
    let stats = convert_to_file(pdf.to_string_lossy(), &config).await.unwrap();

    for n in 1..=3 {
        let png = images.join(format!("doc-page-{n:03}.png"));
        assert!(png.is_file(), "missing {}", png.display());
    }

    let md = std::fs::read_to_string(stats.output_file.unwrap()).unwrap();
    println!("{md}");
    let sections: Vec<&str> = md.split("\n---\n").collect();
    assert_eq!(sections.len(), 3, "{md}");

    let mut seen = HashSet::new();
    for (i, section) in sections.iter().enumerate() {
        let lower = section.to_lowercase();
        // Tolerate a misread letter or two.
        assert!(
            lower.contains("hello") || lower.contains("world"),
            "section {i} lacks the page text: {section:?}"
        );
        seen.insert(i);
    }
    assert_eq!(seen.len(), 3);
}
