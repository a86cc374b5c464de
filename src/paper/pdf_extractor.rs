//! PDF text extraction wrapper
//!
//! Wraps the pdf-extract crate with error handling for:
//! - Encrypted PDFs
//! - Scanned/image-only PDFs
//! - Corrupted PDFs

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to extract text from PDF: {0}")]
    Extraction(String),
    #[error("PDF contains no extractable text (scanned or image-only?)")]
    NoText,
}

/// Extract the full text of a PDF file.
///
/// Page texts are concatenated in page order, separated by newlines.
/// Returns `PdfError::NoText` when the document parses but yields only
/// whitespace (typical for scanned papers).
pub fn extract_text_from_pdf(path: &Path) -> Result<String, PdfError> {
    let text = pdf_extract::extract_text(path).map_err(|e| PdfError::Extraction(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(PdfError::NoText);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_extraction_error() {
        let err = extract_text_from_pdf(Path::new("/nonexistent/paper.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Extraction(_)));
    }

    #[test]
    fn test_non_pdf_bytes_are_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-pdf.pdf");
        std::fs::write(&path, b"plain text, no PDF header").unwrap();
        let err = extract_text_from_pdf(&path).unwrap_err();
        assert!(matches!(err, PdfError::Extraction(_)));
    }
}
