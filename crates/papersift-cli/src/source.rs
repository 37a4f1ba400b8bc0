//! Document text sources.

use papersift_domain::TextSource;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Text layer of a PDF, via `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl TextSource for PdfTextSource {
    type Error = String;

    fn extract_text(&self, path: &Path) -> Result<String, Self::Error> {
        // pdf-extract can panic on malformed PDFs
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text(path)
        }));

        match result {
            Ok(Ok(text)) => {
                debug!("Extracted {} chars from {}", text.len(), path.display());
                Ok(text)
            }
            Ok(Err(e)) => Err(format!(
                "Failed to extract text from PDF {}: {}",
                path.display(),
                e
            )),
            Err(_) => Err(format!(
                "PDF extraction panicked on {} (malformed PDF)",
                path.display()
            )),
        }
    }
}

/// UTF-8 text files read as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    type Error = String;

    fn extract_text(&self, path: &Path) -> Result<String, Self::Error> {
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
    }
}

/// Chooses a source by file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoTextSource {
    pdf: PdfTextSource,
    plain: PlainTextSource,
}

/// Extensions the batch driver picks up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Whether `path` has an extension in [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(path: &Path) -> bool {
    extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

impl TextSource for AutoTextSource {
    type Error = String;

    fn extract_text(&self, path: &Path) -> Result<String, Self::Error> {
        match extension(path).as_deref() {
            Some("pdf") => self.pdf.extract_text(path),
            Some("txt") => self.plain.extract_text(path),
            _ => Err(format!("Unsupported document type: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "hello world").unwrap();

        assert_eq!(PlainTextSource.extract_text(&path).unwrap(), "hello world");
        assert_eq!(AutoTextSource::default().extract_text(&path).unwrap(), "hello world");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(PlainTextSource
            .extract_text(&dir.path().join("absent.txt"))
            .is_err());
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, "this is not a pdf").unwrap();

        assert!(AutoTextSource::default().extract_text(&path).is_err());
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a.pdf")));
        assert!(is_supported(Path::new("a.PDF")));
        assert!(is_supported(Path::new("b.txt")));
        assert!(!is_supported(Path::new("c.docx")));
        assert!(!is_supported(Path::new("noext")));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "# title").unwrap();
        assert!(AutoTextSource::default().extract_text(&path).is_err());
    }
}
