//! Transport gateway trait and the payloads it exchanges.

use crate::error::TransportResult;
use async_trait::async_trait;
use std::path::Path;

/// A document selected for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    name: String,
    bytes: Vec<u8>,
    mime: String,
}

impl std::fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

impl DocumentFile {
    /// Create a document from its name and contents, guessing the MIME type
    /// from the name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let mime = guess_mime(&name);
        Self {
            name,
            bytes: bytes.into(),
            mime,
        }
    }

    /// Read a document from disk.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(Self::new(name, bytes))
    }

    /// Override the MIME type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// File name as the user selected it.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type sent with the upload.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Successful upload outcome.
///
/// The session names the new document after the file the user picked, so
/// the receipt only carries what the server adds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Server-issued document identifier.
    pub file_id: String,
    /// Status text reported by the server, if any.
    pub server_message: Option<String>,
    /// Number of characters the server extracted, if reported.
    pub chars_extracted: Option<u64>,
}

impl UploadReceipt {
    /// Create a receipt with only the required fields.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            server_message: None,
            chars_extracted: None,
        }
    }
}

/// Successful answer outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The answer text.
    pub text: String,
    /// Source excerpts the server cited, if any.
    pub sources: Vec<String>,
}

impl Answer {
    /// Create an answer without sources.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Boundary to the remote question-answering service.
///
/// Implementations perform no retries and never panic on remote failure:
/// every outcome resolves to a success payload or a [`TransportError`].
///
/// [`TransportError`]: crate::error::TransportError
#[async_trait]
pub trait TransportGateway: Send + Sync {
    /// Get the gateway name.
    fn name(&self) -> &str;

    /// Submit a document for processing.
    async fn upload(&self, file: &DocumentFile) -> TransportResult<UploadReceipt>;

    /// Ask a question about a previously uploaded document.
    async fn ask(&self, question: &str, file_id: &str) -> TransportResult<Answer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_detection() {
        assert_eq!(DocumentFile::new("report.pdf", vec![1]).mime(), "application/pdf");
        assert_eq!(DocumentFile::new("notes.txt", vec![]).mime(), "text/plain");
        assert_eq!(
            DocumentFile::new("blob", vec![]).mime(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let file = DocumentFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "doc.pdf");
        assert_eq!(file.bytes(), b"%PDF-1.4");
        assert_eq!(file.mime(), "application/pdf");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        assert!(DocumentFile::from_path("/definitely/not/here.pdf").await.is_err());
    }
}
