//! CLI binary for ocr2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr2md::{
    convert_to_file, inspect, ConversionConfig, ConversionProgressCallback, PageSelection,
    PageSeparator, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// recognised page. Pages arrive strictly in order, so one start time is
/// enough.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_conversion_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Printed once the page selection is known, before rendering starts.
fn start_banner(total_pages: usize) -> String {
    let noun = if total_pages == 1 { "page" } else { "pages" };
    format!("Converting {total_pages} {noun}…")
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&start_banner(total_pages))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, _total: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}  {:<8}  {}",
            green("✓"),
            page_num,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{:.1}s", self.page_elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, _total: usize, error: &str) {
        let elapsed = self.page_elapsed_secs();
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} Page {:>3}  {}  {}",
            red("✗"),
            page_num,
            red(first_line),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, total_pages: usize, pages_with_text: usize) {
        self.bar.finish_and_clear();
        let empty = total_pages.saturating_sub(pages_with_text);
        if empty == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&total_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages with text  ({} empty after cleanup)",
                cyan("⚠"),
                bold(&pages_with_text.to_string()),
                total_pages,
                empty,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every page → output/scan_clean.md, images/scan-page-NNN.png
  ocr2md scan.pdf

  # First three pages (0-based), custom names and directories
  ocr2md scan.pdf --pages 0 1 2 --output-name notes --output-dir md --image-dir png

  # Lower DPI for a quick draft, German + English OCR
  ocr2md scan.pdf --dpi 200 --lang deu+eng

  # Strip a course-specific footer on top of the built-in rules
  ocr2md guide.pdf --strip-pattern 'BSBFIN\d+ learner guide' --strip-pattern 'acme training'

  # Inspect the PDF only (no OCR)
  ocr2md --inspect-only scan.pdf

  # Machine-readable run summary
  ocr2md --json --no-progress scan.pdf > summary.json

ENVIRONMENT VARIABLES:
  OCR2MD_OUTPUT_DIR   Default for --output-dir
  OCR2MD_IMAGE_DIR    Default for --image-dir
  OCR2MD_DPI          Default for --dpi
  OCR2MD_LANG         Default for --lang
  TESSERACT_CMD       Path to the tesseract executable
  PDFIUM_LIB_PATH     Path to the pdfium shared library
  RUST_LOG            Overrides the log filter (e.g. ocr2md=trace)

SETUP:
  Tesseract:  apt install tesseract-ocr   |  brew install tesseract
  PDFium:     download libpdfium from bblanchon/pdfium-binaries and place it
              in the working directory or point PDFIUM_LIB_PATH at it.
"#;

/// Convert scanned PDF documents to clean Markdown using OCR.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2md",
    version,
    about = "Convert scanned PDF documents to clean Markdown using OCR",
    long_about = "Rasterise each page of a scanned PDF, enhance the image, run Tesseract OCR \
and turn the recognised text into Markdown with running headers, footers, page numbers and \
watermark residue removed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Scanned PDF file.
    pdf_file: PathBuf,

    /// Base name of the Markdown file (default: PDF file stem).
    #[arg(long)]
    output_name: Option<String>,

    /// Directory for `<name>_clean.md`.
    #[arg(long, env = "OCR2MD_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory for the page images.
    #[arg(long, env = "OCR2MD_IMAGE_DIR", default_value = "images")]
    image_dir: PathBuf,

    /// 0-based page indices to convert (default: all pages).
    #[arg(long, num_args = 1.., allow_negative_numbers = true, value_name = "N")]
    pages: Option<Vec<i64>>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "OCR2MD_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s), e.g. eng or eng+deu.
    #[arg(long, env = "OCR2MD_LANG", default_value = "eng")]
    lang: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_path: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Extra header/footer regex; matching lines are removed (repeatable).
    #[arg(long, value_name = "REGEX")]
    strip_pattern: Vec<String>,

    /// Keep lines that repeat at the top/bottom of many pages.
    #[arg(long)]
    no_repeat_detection: bool,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, default_value = "hr")]
    separator: String,

    /// Do not emit a `# Title` heading.
    #[arg(long)]
    no_title: bool,

    /// Do not emit `**Page N**` labels.
    #[arg(long)]
    no_page_labels: bool,

    /// Cap either rendered dimension at this many pixels.
    #[arg(long, value_name = "PX")]
    max_pixels: Option<u32>,

    /// Print the run summary (or metadata) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Print PDF metadata only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let input = cli.pdf_file.to_string_lossy().into_owned();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = convert_to_file(&input, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        let output_file = stats
            .output_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "{}  {}/{} pages processed  {} with text  {}ms  →  {}",
            green("✔"),
            stats.processed_pages,
            stats.total_pages,
            stats.pages_with_text,
            stats.total_duration_ms,
            bold(&output_file),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "render {}ms  /  ocr {}ms  /  images in {}",
                stats.render_duration_ms,
                stats.ocr_duration_ms,
                config.image_dir.display()
            )),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = match cli.pages {
        Some(ref list) => PageSelection::Indices(list.clone()),
        None => PageSelection::All,
    };

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .pages(pages)
        .output_dir(&cli.output_dir)
        .image_dir(&cli.image_dir)
        .language(&cli.lang)
        .page_separator(parse_separator(&cli.separator))
        .include_title(!cli.no_title)
        .page_labels(!cli.no_page_labels)
        .detect_repeating(!cli.no_repeat_detection);

    if let Some(ref name) = cli.output_name {
        builder = builder.output_name(name);
    }
    if let Some(ref path) = cli.tesseract_path {
        builder = builder.tesseract_path(path);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    for pattern in &cli.strip_pattern {
        builder = builder.strip_pattern(pattern);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
