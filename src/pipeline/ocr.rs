//! OCR engine adapter.
//!
//! [`OcrEngine`] is the seam between the pipeline and whatever turns pixels
//! into text. The built-in [`TesseractEngine`] shells out to the `tesseract`
//! executable; library callers (and tests) can inject their own engine via
//! [`crate::config::ConversionConfigBuilder::ocr_engine`].
//!
//! Tesseract runs with a fixed configuration: `--psm 6` (assume a single
//! uniform block of text, which suits full-page body text) and `--oem 3`
//! (default engine, LSTM where available). There is no retry and no
//! timeout; a failing call aborts the conversion.

use crate::config::ConversionConfig;
use crate::error::Ocr2MdError;
use image::{DynamicImage, ImageFormat};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};

/// Page segmentation mode: single uniform block of text.
pub const TESSERACT_PSM: u8 = 6;
/// OCR engine mode: default (LSTM when available).
pub const TESSERACT_OEM: u8 = 3;

/// Install locations checked when `tesseract` is not on `PATH`.
const WELL_KNOWN_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Text-in-image recogniser.
///
/// Implementations are called from tokio's blocking pool and may block.
pub trait OcrEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Recognise the text on one preprocessed page image.
    ///
    /// `page_num` is 1-based and only used for error reporting.
    fn recognize(&self, image: &DynamicImage, page_num: usize) -> Result<String, Ocr2MdError>;
}

/// OCR through the `tesseract` command-line program.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    language: String,
}

impl TesseractEngine {
    /// Use the given executable and language without further checks.
    pub fn new(executable: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            language: language.into(),
        }
    }

    /// Locate the executable (see [`locate_tesseract`]) and build an engine.
    pub fn discover(explicit: Option<&Path>, language: &str) -> Result<Self, Ocr2MdError> {
        let executable = locate_tesseract(explicit)?;
        info!("Using tesseract at {}", executable.display());
        Ok(Self::new(executable, language))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments for recognising `image_path`, writing text to stdout.
    pub fn command_args(&self, image_path: &Path) -> Vec<String> {
        vec![
            image_path.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            TESSERACT_PSM.to_string(),
            "--oem".to_string(),
            TESSERACT_OEM.to_string(),
        ]
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage, page_num: usize) -> Result<String, Ocr2MdError> {
        // tesseract reads from a file; the temp file is removed on drop.
        let mut tmp = tempfile::Builder::new()
            .prefix("ocr2md-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| Ocr2MdError::Internal(format!("tempfile: {e}")))?;
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| Ocr2MdError::UnsupportedImage {
                path: tmp.path().to_path_buf(),
                detail: e.to_string(),
            })?;
        tmp.write_all(&buf)
            .and_then(|_| tmp.flush())
            .map_err(|e| Ocr2MdError::Internal(format!("tempfile write: {e}")))?;

        let output = Command::new(&self.executable)
            .args(self.command_args(tmp.path()))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ocr2MdError::OcrEngineNotFound {
                        detail: format!("{} could not be executed", self.executable.display()),
                    }
                } else {
                    Ocr2MdError::OcrFailed {
                        page: page_num,
                        detail: format!("failed to run {}: {e}", self.executable.display()),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Ocr2MdError::OcrFailed {
                page: page_num,
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} chars for page {}", text.len(), page_num);
        Ok(text)
    }
}

/// Find the `tesseract` executable.
///
/// An explicit path must exist. Otherwise `TESSERACT_CMD`, then every `PATH`
/// entry, then a few well-known install directories are tried.
pub fn locate_tesseract(explicit: Option<&Path>) -> Result<PathBuf, Ocr2MdError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(Ocr2MdError::OcrEngineNotFound {
                detail: format!("'{}' does not exist", path.display()),
            })
        };
    }

    if let Some(cmd) = std::env::var_os("TESSERACT_CMD").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(cmd);
        if path.is_file() {
            return Ok(path);
        }
        return Err(Ocr2MdError::OcrEngineNotFound {
            detail: format!("TESSERACT_CMD '{}' does not exist", path.display()),
        });
    }

    let exe = executable_name();
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&search_path)
        .chain(WELL_KNOWN_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Ocr2MdError::OcrEngineNotFound {
            detail: format!("'{exe}' was not found on PATH"),
        })
}

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

/// Resolve the OCR engine for a conversion.
///
/// A pre-built engine in the config wins; otherwise Tesseract is located.
/// Called before any page is rendered so a missing engine fails fast.
pub fn resolve_engine(config: &ConversionConfig) -> Result<Arc<dyn OcrEngine>, Ocr2MdError> {
    if let Some(ref engine) = config.ocr_engine {
        return Ok(Arc::clone(engine));
    }
    let engine = TesseractEngine::discover(config.tesseract_path.as_deref(), &config.language)?;
    Ok(Arc::new(engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn command_args_use_fixed_modes() {
        let engine = TesseractEngine::new("/usr/bin/tesseract", "eng+deu");
        let args = engine.command_args(Path::new("/tmp/p.png"));
        assert_eq!(
            args,
            ["/tmp/p.png", "stdout", "-l", "eng+deu", "--psm", "6", "--oem", "3"]
        );
    }

    #[test]
    fn explicit_missing_path_is_ocr_error() {
        let err = locate_tesseract(Some(Path::new("/nope/tesseract"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ocr);
        assert!(err.to_string().contains("/nope/tesseract"));
    }

    #[test]
    fn explicit_existing_path_is_used() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let found = locate_tesseract(Some(tmp.path())).unwrap();
        assert_eq!(found, tmp.path());
    }

    #[test]
    fn missing_executable_maps_to_not_found() {
        let engine = TesseractEngine::new("/nope/tesseract", "eng");
        let err = engine
            .recognize(&DynamicImage::new_luma8(8, 8), 1)
            .unwrap_err();
        assert!(matches!(err, Ocr2MdError::OcrEngineNotFound { .. }), "{err}");
    }

    #[test]
    fn injected_engine_takes_precedence() {
        struct Fixed;
        impl OcrEngine for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn recognize(&self, _: &DynamicImage, _: usize) -> Result<String, Ocr2MdError> {
                Ok("text".into())
            }
        }
        let config = ConversionConfig::builder()
            .ocr_engine(Arc::new(Fixed))
            .tesseract_path("/nope/tesseract")
            .build()
            .unwrap();
        let engine = resolve_engine(&config).unwrap();
        assert_eq!(engine.name(), "fixed");
    }
}
