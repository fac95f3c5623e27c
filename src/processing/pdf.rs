//! PDF text extraction.
//!
//! `pdf-extract` is synchronous and may panic on malformed input, so extraction runs on the
//! blocking pool where a panic surfaces as a join error instead of taking the worker down.

use std::path::Path;

use super::types::{Document, Page, PdfError};

/// Extract the pages of an in-memory PDF.
pub async fn extract_document(id: impl Into<String>, bytes: Vec<u8>) -> Result<Document, PdfError> {
    let id = id.into();
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|err| PdfError::Extraction(err.to_string()))
    })
    .await
    .map_err(|err| PdfError::Extraction(format!("extractor aborted: {err}")))??;

    tracing::debug!(document = %id, pages = pages.len(), "Extracted PDF text");
    Ok(Document {
        id,
        pages: into_pages(pages),
    })
}

/// Read and extract a PDF from disk under the given document id.
pub async fn load_document(path: &Path, id: impl Into<String>) -> Result<Document, PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| PdfError::Io {
        path: path.display().to_string(),
        source,
    })?;
    extract_document(id, bytes).await
}

/// Document identifier for a file found under `root`.
///
/// The id is the path relative to `root` without its extension, joined with `/`, so
/// `root/week-1/notes.pdf` becomes `week-1/notes`. Paths outside `root` fall back to the file stem.
pub fn document_id(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if relative.file_name().is_some() => relative
            .with_extension("")
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// Whether an uploaded filename looks like a PDF.
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

fn into_pages(texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(number, text)| Page {
            number: u32::try_from(number).unwrap_or(u32::MAX),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn pages_are_numbered_from_zero() {
        let pages = into_pages(vec!["a".into(), "b".into()]);
        assert_eq!(pages[0].number, 0);
        assert_eq!(pages[1].number, 1);
        assert_eq!(pages[1].text, "b");
    }

    #[test]
    fn document_id_is_relative_to_root() {
        let root = PathBuf::from("data");
        assert_eq!(document_id(&root, &root.join("lecture-3.pdf")), "lecture-3");
        assert_eq!(
            document_id(&root, &root.join("week-1").join("notes.pdf")),
            "week-1/notes"
        );
        assert_ne!(
            document_id(&root, &root.join("week-1").join("notes.pdf")),
            document_id(&root, &root.join("week-2").join("notes.pdf"))
        );
    }

    #[test]
    fn document_id_outside_root_uses_file_stem() {
        let id = document_id(Path::new("data"), Path::new("/tmp/other/lecture-3.pdf"));
        assert_eq!(id, "lecture-3");
    }

    #[test]
    fn pdf_extension_check_is_case_insensitive() {
        assert!(has_pdf_extension("notes.PDF"));
        assert!(has_pdf_extension("notes.pdf"));
        assert!(!has_pdf_extension("notes.pdf.txt"));
        assert!(!has_pdf_extension(""));
    }

    #[tokio::test]
    async fn garbage_bytes_are_rejected() {
        let error = extract_document("bad", b"definitely not a pdf".to_vec())
            .await
            .expect_err("extraction should fail");
        assert!(matches!(error, PdfError::Extraction(_)));
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let error = load_document(Path::new("/nonexistent/echo/missing.pdf"), "missing")
            .await
            .expect_err("missing file");
        assert!(error.to_string().contains("missing.pdf"));
    }
}
