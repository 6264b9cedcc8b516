//! Document types flowing through the pipeline.
//!
//! An upload starts life as an [`UploadedDocument`] and is normalised once
//! into a [`NormalizedDocument`]: either a list of rendered [`PageImage`]s
//! (PDF) or a single [`EncodedDocument`] (PowerPoint, sent whole). The variant
//! is chosen at ingestion and never re-checked downstream.

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Upload ceiling enforced before any conversion work: 20 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Media type of every rendered page.
pub const PAGE_MEDIA_TYPE: &str = "image/png";

/// Media type of a PowerPoint container sent whole.
pub const PRESENTATION_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// How an upload is handed to the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Paginated: rendered page by page.
    Pdf,
    /// `.pptx` / `.ppt`: encoded whole, the model parses the structure.
    SlideContainer,
}

impl DocumentKind {
    /// Detect the kind from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "pptx" | "ppt" => Some(DocumentKind::SlideContainer),
            _ => None,
        }
    }
}

/// A raw upload. Immutable once received.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    file_name: String,
    kind: DocumentKind,
}

impl UploadedDocument {
    /// Run the upload gate and wrap the bytes.
    ///
    /// Rejects unknown extensions and files above `max_bytes` before any
    /// rendering or encoding happens.
    pub fn new(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> Result<Self, AuditError> {
        let file_name = file_name.into();
        let kind = DocumentKind::from_file_name(&file_name).ok_or_else(|| {
            AuditError::UnsupportedFormat {
                file_name: file_name.clone(),
            }
        })?;
        check_size(bytes.len() as u64, max_bytes)?;
        Ok(Self {
            bytes,
            file_name,
            kind,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Size half of the upload gate, usable before the bytes are in memory.
pub fn check_size(size: u64, max_bytes: u64) -> Result<(), AuditError> {
    if size > max_bytes {
        return Err(AuditError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// One rendered page, base64 PNG without the data-URI prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImage {
    pub data: String,
    pub media_type: String,
}

/// A whole container file, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedDocument {
    pub data: String,
    pub media_type: String,
}

/// Output of the normaliser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedDocument {
    /// PDF pages in page order.
    Paged(Vec<PageImage>),
    /// PowerPoint sent as one blob.
    Container(EncodedDocument),
}

impl NormalizedDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            NormalizedDocument::Paged(_) => DocumentKind::Pdf,
            NormalizedDocument::Container(_) => DocumentKind::SlideContainer,
        }
    }

    /// Number of attachments that will be sent upstream.
    pub fn attachment_count(&self) -> usize {
        match self {
            NormalizedDocument::Paged(pages) => pages.len(),
            NormalizedDocument::Container(_) => 1,
        }
    }

    /// Total base64 payload size in bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            NormalizedDocument::Paged(pages) => pages.iter().map(|p| p.data.len()).sum(),
            NormalizedDocument::Container(doc) => doc.data.len(),
        }
    }

    /// Flatten into the wire form used by [`crate::request::AnalyzeRequest`].
    pub fn into_attachments(self) -> Vec<Attachment> {
        match self {
            NormalizedDocument::Paged(pages) => pages.into_iter().map(Attachment::from).collect(),
            NormalizedDocument::Container(doc) => vec![Attachment::from(doc)],
        }
    }
}

/// Wire form of either a page image or an encoded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub data: String,
    #[serde(default)]
    pub media_type: String,
}

impl From<PageImage> for Attachment {
    fn from(p: PageImage) -> Self {
        Self {
            data: p.data,
            media_type: p.media_type,
        }
    }
}

impl From<EncodedDocument> for Attachment {
    fn from(d: EncodedDocument) -> Self {
        Self {
            data: d.data,
            media_type: d.media_type,
        }
    }
}

impl From<Attachment> for PageImage {
    fn from(a: Attachment) -> Self {
        let media_type = if a.media_type.is_empty() {
            PAGE_MEDIA_TYPE.to_string()
        } else {
            a.media_type
        };
        Self {
            data: a.data,
            media_type,
        }
    }
}

impl From<Attachment> for EncodedDocument {
    fn from(a: Attachment) -> Self {
        // The container MIME is fixed regardless of what the client declared.
        Self {
            data: a.data,
            media_type: PRESENTATION_MEDIA_TYPE.to_string(),
        }
    }
}

/// Per-request context threaded through every stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub file_name: String,
    pub kind: DocumentKind,
    started: Instant,
}

impl RequestContext {
    pub fn new(file_name: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            started: Instant::now(),
        }
    }

    pub fn for_upload(doc: &UploadedDocument) -> Self {
        Self::new(doc.file_name(), doc.kind())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
