//! Image enhancement applied to each page before OCR.
//!
//! Four passes, in order: grayscale, contrast stretch, unsharp mask, median
//! filter. Contrast pushes faint watermarks and paper texture towards white,
//! sharpening restores glyph edges softened by scanning, and the median
//! filter removes salt-and-pepper speckle that Tesseract would otherwise
//! read as punctuation. The median pass also erodes strokes one pixel wide,
//! so low-DPI renders skip it (`PreprocessOptions::for_dpi`). Output
//! dimensions always equal input dimensions.

use crate::config::PreprocessOptions;
use crate::error::Ocr2MdError;
use image::{imageops, DynamicImage, GrayImage};
use std::path::Path;
use tracing::debug;

/// Enhance a page image for OCR.
pub fn preprocess(img: &DynamicImage, opts: &PreprocessOptions) -> DynamicImage {
    let gray: GrayImage = img.to_luma8();
    let contrasted = imageops::contrast(&gray, opts.contrast);
    let sharpened = imageops::unsharpen(&contrasted, opts.sharpen_sigma, opts.sharpen_threshold);
    let denoised = if opts.median_radius > 0 {
        imageproc::filter::median_filter(&sharpened, opts.median_radius, opts.median_radius)
    } else {
        sharpened
    };
    DynamicImage::ImageLuma8(denoised)
}

/// Load a persisted page image and enhance it.
pub fn load_and_preprocess(
    path: &Path,
    opts: &PreprocessOptions,
) -> Result<DynamicImage, Ocr2MdError> {
    let img = image::open(path).map_err(|e| Ocr2MdError::UnsupportedImage {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!(
        "Preprocessing {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(preprocess(&img, opts))
}
