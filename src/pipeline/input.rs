//! Input resolution: turn a CLI argument (local path or HTTP/HTTPS URL) into
//! an [`UploadedDocument`].
//!
//! The upload gate runs as early as the source allows: a local file's size is
//! checked from metadata before it is read, a download's `Content-Length`
//! before the body is pulled, and the extension before anything at all.

use crate::document::{check_size, DocumentKind, UploadedDocument};
use crate::error::AuditError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve and gate the input.
pub async fn resolve_input(
    input: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<UploadedDocument, AuditError> {
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        read_local(Path::new(input), max_bytes).await
    }
}

async fn read_local(path: &Path, max_bytes: u64) -> Result<UploadedDocument, AuditError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if DocumentKind::from_file_name(&file_name).is_none() {
        return Err(AuditError::UnsupportedFormat { file_name });
    }

    let not_found = |_| AuditError::FileNotFound {
        path: PathBuf::from(path),
    };
    let meta = tokio::fs::metadata(path).await.map_err(not_found)?;
    check_size(meta.len(), max_bytes)?;

    let bytes = tokio::fs::read(path).await.map_err(not_found)?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    UploadedDocument::new(file_name, bytes, max_bytes)
}

async fn download_url(
    url: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<UploadedDocument, AuditError> {
    let file_name = filename_from_url(url);
    if DocumentKind::from_file_name(&file_name).is_none() {
        return Err(AuditError::UnsupportedFormat { file_name });
    }

    info!("Downloading {}", url);
    let failed = |reason: String| AuditError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    if let Some(len) = response.content_length() {
        check_size(len, max_bytes)?;
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    UploadedDocument::new(file_name, bytes.to_vec(), max_bytes)
}

/// Last path segment of the URL, which must carry the extension.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/deck.pdf"));
        assert!(is_url("http://example.com/deck.pptx"));
        assert!(!is_url("/tmp/deck.pdf"));
        assert!(!is_url("deck.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_filename() {
        assert_eq!(filename_from_url("https://x.org/a/b/roadmap.pptx"), "roadmap.pptx");
        assert_eq!(filename_from_url("https://x.org/deck.pdf?dl=1"), "deck.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "");
        assert_eq!(filename_from_url("not a url"), "");
    }

    #[tokio::test]
    async fn local_file_is_gated_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0u8; 64])
            .unwrap();

        let err = resolve_input(path.to_str().unwrap(), 32, 5).await.unwrap_err();
        assert!(matches!(err, AuditError::FileTooLarge { size: 64, limit: 32 }));
    }

    #[tokio::test]
    async fn extension_checked_before_reading() {
        // The file does not exist: the extension gate must fire first.
        let err = resolve_input("/nonexistent/notes.txt", 1024, 5).await.unwrap_err();
        assert!(matches!(err, AuditError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn missing_file() {
        let err = resolve_input("/nonexistent/deck.pdf", 1024, 5).await.unwrap_err();
        assert!(matches!(err, AuditError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_presentation_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Roadmap.PPTX");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let doc = resolve_input(path.to_str().unwrap(), 1024, 5).await.unwrap();
        assert_eq!(doc.kind(), DocumentKind::SlideContainer);
        assert_eq!(doc.file_name(), "Roadmap.PPTX");
        assert_eq!(doc.bytes(), b"PK\x03\x04");
    }
}
