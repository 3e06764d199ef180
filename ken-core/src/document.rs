//! Downloaded document content.
//!
//! The download endpoint answers with parsed markdown plus chunks (JSON), a raw
//! PDF, or plain text. The kind is resolved exactly once from the declared
//! content type into [`DocumentContent`]; the viewer only ever matches on it.

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::error::ApiError;
use crate::markup::{self, RenderedMarkup};
use crate::text_window::is_markup;

/// A backend-defined sub-unit of a document, addressable by anchor id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chunk {
    pub id: String,
    #[serde(default)]
    pub markdown: String,
}

/// Parsed representation of a document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParsedDocument {
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl ParsedDocument {
    pub fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }
}

/// Which of the supported kinds a download holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    StructuredText,
    PlainText,
}

impl ContentKind {
    /// Resolves the kind from a `Content-Type` header, falling back to the file
    /// extension when the header is absent or generic.
    pub fn resolve(content_type: Option<&str>, file_name: &str) -> Result<Self, ApiError> {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime.as_str() {
            "application/pdf" => return Ok(ContentKind::Pdf),
            "application/json" => return Ok(ContentKind::StructuredText),
            m if m.starts_with("text/") => return Ok(ContentKind::PlainText),
            "" | "application/octet-stream" => {}
            other => return Err(ApiError::UnsupportedContentType(other.to_owned())),
        }

        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Ok(ContentKind::Pdf),
            Some("txt" | "text") | None => Ok(ContentKind::PlainText),
            Some(other) => Err(ApiError::UnsupportedContentType(format!(".{other}"))),
        }
    }
}

/// Body of a downloaded document.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    Pdf(Bytes),
    StructuredText(ParsedDocument),
    PlainText(String),
}

impl DocumentContent {
    /// Decodes `body` according to `kind`.
    pub fn decode(kind: ContentKind, body: Bytes) -> Result<Self, ApiError> {
        Ok(match kind {
            ContentKind::Pdf => DocumentContent::Pdf(body),
            ContentKind::StructuredText => {
                let envelope: serde_json::Value = serde_json::from_slice(&body)?;
                // Accept both the bare object and the `{status, response}` envelope.
                let inner = match envelope.get("response") {
                    Some(resp) if resp.is_object() => resp.clone(),
                    _ => envelope,
                };
                DocumentContent::StructuredText(serde_json::from_value(inner)?)
            }
            ContentKind::PlainText => {
                DocumentContent::PlainText(String::from_utf8_lossy(&body).into_owned())
            }
        })
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            DocumentContent::Pdf(_) => ContentKind::Pdf,
            DocumentContent::StructuredText(_) => ContentKind::StructuredText,
            DocumentContent::PlainText(_) => ContentKind::PlainText,
        }
    }
}

/// How text content should be displayed.
#[derive(Debug, Clone)]
pub enum TextPresentation {
    /// Plain text, rendered through the windowed renderer.
    Windowed(String),
    /// Markup, rendered whole with its anchor index.
    Markup(RenderedMarkup),
}

impl TextPresentation {
    /// Picks windowed or markup rendering for `text`.
    pub fn for_text(text: String) -> Self {
        if is_markup(&text) {
            TextPresentation::Markup(markup::render(&text))
        } else {
            TextPresentation::Windowed(text)
        }
    }
}

/// PDF bytes stored in a temporary file for an external viewer.
///
/// The file is deleted when the preview is dropped, so replacing or closing a
/// preview releases its storage.
#[derive(Debug)]
pub struct PdfPreview {
    file: NamedTempFile,
    size: usize,
}

impl PdfPreview {
    pub fn create(bytes: &[u8]) -> Result<Self, ApiError> {
        let mut file = tempfile::Builder::new()
            .prefix("ken-preview-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            file,
            size: bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_wins_over_extension() {
        assert_eq!(
            ContentKind::resolve(Some("application/pdf"), "notes.txt").unwrap(),
            ContentKind::Pdf
        );
        assert_eq!(
            ContentKind::resolve(Some("application/json; charset=utf-8"), "a.pdf").unwrap(),
            ContentKind::StructuredText
        );
        assert_eq!(
            ContentKind::resolve(Some("text/plain; charset=utf-8"), "x.bin").unwrap(),
            ContentKind::PlainText
        );
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(ContentKind::resolve(None, "f.PDF").unwrap(), ContentKind::Pdf);
        assert_eq!(
            ContentKind::resolve(Some("application/octet-stream"), "README").unwrap(),
            ContentKind::PlainText
        );
        assert!(matches!(
            ContentKind::resolve(None, "model.xlsx"),
            Err(ApiError::UnsupportedContentType(ext)) if ext == ".xlsx"
        ));
        assert!(matches!(
            ContentKind::resolve(Some("image/png"), "a.png"),
            Err(ApiError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn structured_text_accepts_envelope() {
        let body = Bytes::from_static(
            br#"{"status":200,"response":{"markdown":"<a id='c1'></a>Hi","chunks":[{"id":"c1","markdown":"Hi"}]}}"#,
        );
        let DocumentContent::StructuredText(doc) =
            DocumentContent::decode(ContentKind::StructuredText, body).unwrap()
        else {
            panic!("expected structured text");
        };
        assert_eq!(doc.chunk("c1").map(|c| c.markdown.as_str()), Some("Hi"));
    }

    #[test]
    fn presentation_routes_markup_around_windowing() {
        assert!(matches!(
            TextPresentation::for_text("<table><tr><td>1</td></tr></table>".into()),
            TextPresentation::Markup(_)
        ));
        assert!(matches!(
            TextPresentation::for_text("just text".into()),
            TextPresentation::Windowed(_)
        ));
    }

    #[test]
    fn pdf_preview_file_is_removed_on_drop() {
        let preview = PdfPreview::create(b"%PDF-1.7\n").unwrap();
        let path = preview.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(preview.size(), 9);
        drop(preview);
        assert!(!path.exists());
    }
}
