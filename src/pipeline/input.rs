//! Input resolution: validate the user-supplied PDF path.
//!
//! We check existence, read permission and the `%PDF` magic bytes before
//! pdfium ever sees the file, so callers get a meaningful error rather than
//! a generic pdfium load failure.

use crate::error::Ocr2MdError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated local PDF.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    path: PathBuf,
    stem: String,
}

impl ResolvedInput {
    /// Path to the PDF file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, used to name page images.
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(path_str: &str) -> Result<ResolvedInput, Ocr2MdError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Ocr2MdError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(Ocr2MdError::NotAPdf {
            path,
            magic: [0; 4],
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let read = f.read(&mut magic).unwrap_or(0);
            if read < magic.len() || &magic != b"%PDF" {
                return Err(Ocr2MdError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Ocr2MdError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Ocr2MdError::FileNotFound { path });
        }
    }

    let stem = document_stem(&path);
    debug!("Resolved local PDF: {} (stem '{}')", path.display(), stem);
    Ok(ResolvedInput { path, stem })
}

/// File stem of `path`, falling back to `document` for odd names.
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn missing_file_is_input_error() {
        let err = resolve_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, Ocr2MdError::FileNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn non_pdf_is_rejected() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"GIF89a not a pdf").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap()).unwrap_err();
        match err {
            Ocr2MdError::NotAPdf { magic, .. } => assert_eq!(&magic, b"GIF8"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%P").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Ocr2MdError::NotAPdf { .. }));
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annual_report.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
        let resolved = resolve_input(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved.stem(), "annual_report");
        assert_eq!(resolved.path(), path.as_path());
    }

    #[test]
    fn stem_fallback() {
        assert_eq!(document_stem(Path::new("/tmp/doc.pdf")), "doc");
        assert_eq!(document_stem(Path::new("/")), "document");
    }
}
