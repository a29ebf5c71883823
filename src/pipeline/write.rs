//! Output writing: persist the assembled Markdown next to the page images.
//!
//! The Markdown file is written atomically (temp file + rename) so an
//! interrupted run never leaves a half-written `<name>_clean.md` behind.
//! An existing file with the same name is replaced.

use crate::error::Ocr2MdError;
use crate::output::PageResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<name>_clean.md`
pub fn markdown_file_name(name: &str) -> String {
    format!("{name}_clean.md")
}

/// Write `markdown` to `<output_dir>/<name>_clean.md`, creating the
/// directory if needed. Returns the final path.
pub async fn write_markdown(
    output_dir: &Path,
    name: &str,
    markdown: &str,
) -> Result<PathBuf, Ocr2MdError> {
    let path = output_dir.join(markdown_file_name(name));
    let write_err = |source: std::io::Error| Ocr2MdError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(write_err)?;

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), markdown.len());
    Ok(path)
}

/// Confirm every page image the run reports is actually on disk.
pub fn verify_page_images(pages: &[PageResult]) -> Result<(), Ocr2MdError> {
    match pages.iter().find(|p| !p.image_path.is_file()) {
        Some(missing) => Err(Ocr2MdError::OutputWriteFailed {
            path: missing.image_path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "page image missing after rendering",
            ),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_has_clean_suffix() {
        assert_eq!(markdown_file_name("report"), "report_clean.md");
    }

    #[tokio::test]
    async fn creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");

        let first = write_markdown(&out, "doc", "first\n").await.unwrap();
        assert_eq!(first, out.join("doc_clean.md"));
        let second = write_markdown(&out, "doc", "second\n").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "second\n");
        assert!(!out.join("doc_clean.md.tmp").exists());
    }

    #[tokio::test]
    async fn unwritable_dir_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = write_markdown(&blocker.join("sub"), "doc", "text")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Output);
    }

    #[test]
    fn missing_image_is_reported() {
        let page = PageResult {
            page_index: 0,
            page_num: 1,
            image_path: PathBuf::from("/nope/doc-page-001.png"),
            width: 1,
            height: 1,
            raw_text: String::new(),
            cleaned_text: String::new(),
            markdown: String::new(),
            ocr_duration_ms: 0,
        };
        let err = verify_page_images(&[page]).unwrap_err();
        assert!(err.to_string().contains("doc-page-001.png"));
    }
}
