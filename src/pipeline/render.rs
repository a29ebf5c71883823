//! PDF rasterisation: render selected pages to PNG files via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not
//! safe to call from async contexts. `tokio::task::spawn_blocking` moves the
//! work onto the blocking pool so the runtime's worker threads never stall.
//!
//! ## Why write straight to disk?
//!
//! A 300 DPI letter page is ~25 MB of RGBA pixels. Each page is saved as
//! `<docname>-page-NNN.png` as soon as it is rendered and the bitmap is
//! dropped, so at most one page image is resident at a time. The OCR stage
//! re-reads the file it needs.

use crate::config::ConversionConfig;
use crate::error::Ocr2MdError;
use crate::output::DocumentMetadata;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rasterised page, persisted to the image directory.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page index in the source document.
    pub page_index: usize,
    /// Where the PNG was written.
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Resolution the page was rendered at.
    pub dpi: u32,
}

/// File name for a page image: `<docname>-page-NNN.png`, 1-based, zero-padded.
pub fn page_image_name(doc_stem: &str, page_index: usize) -> String {
    format!("{}-page-{:03}.png", doc_stem, page_index + 1)
}

/// Rasterise selected pages of a PDF into PNG files under `config.image_dir`.
///
/// `page_indices` must already be validated against the page count.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
    page_indices: &[usize],
    doc_stem: &str,
) -> Result<Vec<RenderedPage>, Ocr2MdError> {
    let path = pdf_path.to_path_buf();
    let lib_path = config.pdfium_lib_path.clone();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let image_dir = config.image_dir.clone();
    let stem = doc_stem.to_string();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(
            &path,
            lib_path.as_deref(),
            dpi,
            max_pixels,
            &image_dir,
            &stem,
            &indices,
        )
    })
    .await
    .map_err(|e| Ocr2MdError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    lib_path: Option<&Path>,
    dpi: u32,
    max_pixels: Option<u32>,
    image_dir: &Path,
    doc_stem: &str,
    page_indices: &[usize],
) -> Result<Vec<RenderedPage>, Ocr2MdError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = open_document(&pdfium, pdf_path)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    std::fs::create_dir_all(image_dir).map_err(|e| Ocr2MdError::OutputWriteFailed {
        path: image_dir.to_path_buf(),
        source: e,
    })?;

    let mut render_config =
        PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);
    if let Some(px) = max_pixels {
        render_config = render_config
            .set_maximum_width(px as i32)
            .set_maximum_height(px as i32);
    }

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            return Err(Ocr2MdError::PageOutOfRange {
                page: idx as i64,
                total: total_pages,
            });
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| Ocr2MdError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Ocr2MdError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let image_path = image_dir.join(page_image_name(doc_stem, idx));
        save_png(&image, &image_path)?;

        debug!(
            "Rendered page {} → {}x{} px → {}",
            idx + 1,
            image.width(),
            image.height(),
            image_path.display()
        );

        results.push(RenderedPage {
            page_index: idx,
            image_path,
            width: image.width(),
            height: image.height(),
            dpi,
        });
    }

    info!(
        "Rendered {} of {} pages at {} DPI into {}",
        results.len(),
        total_pages,
        dpi,
        image_dir.display()
    );
    Ok(results)
}

/// Write `image` as PNG, mapping I/O failures to output errors.
fn save_png(image: &DynamicImage, path: &Path) -> Result<(), Ocr2MdError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::IoError(source) => Ocr2MdError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            },
            other => Ocr2MdError::UnsupportedImage {
                path: path.to_path_buf(),
                detail: other.to_string(),
            },
        })
}

/// Extract document metadata (including the page count) without rendering.
pub async fn extract_metadata(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Ocr2MdError> {
    let path = pdf_path.to_path_buf();
    let lib_path = config.pdfium_lib_path.clone();

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, lib_path.as_deref()))
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdf_path: &Path,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Ocr2MdError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = open_document(&pdfium, pdf_path)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let page_count = pages.len() as usize;
    if page_count == 0 {
        return Err(Ocr2MdError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Open a PDF, classifying pdfium's failure.
///
/// Password-protected documents are rejected outright; no password is ever
/// supplied.
fn open_document<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, Ocr2MdError> {
    pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Ocr2MdError::PasswordProtected {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Ocr2MdError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Bind to a pdfium library.
///
/// Resolution order: explicit path, `PDFIUM_LIB_PATH`, the working
/// directory, then whatever the system loader finds.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, Ocr2MdError> {
    let from_env = std::env::var_os("PDFIUM_LIB_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(from_env) {
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| Ocr2MdError::PdfiumBindingFailed(format!("{}: {}", path.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Ocr2MdError::PdfiumBindingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_image_names_are_one_based_and_padded() {
        assert_eq!(page_image_name("doc", 0), "doc-page-001.png");
        assert_eq!(page_image_name("doc", 2), "doc-page-003.png");
        assert_eq!(page_image_name("scan", 999), "scan-page-1000.png");
    }

    #[test]
    fn save_png_into_missing_dir_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::new_luma8(4, 4);
        let err = save_png(&img, &dir.path().join("missing/sub/page.png")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Output);
    }

    #[test]
    fn save_png_roundtrips_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(page_image_name("doc", 0));
        save_png(&DynamicImage::new_rgb8(12, 7), &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (12, 7));
    }
}
