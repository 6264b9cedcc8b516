//! Error types for the roadmap-audit library.
//!
//! Every failure the pipeline can produce is an [`AuditError`]. Variants are
//! grouped by the stage that raises them, and each one maps onto an
//! [`ErrorKind`] — the coarse taxonomy the request boundary uses to pick a
//! status code and to tell the user whether re-submitting may help.
//!
//! The core never retries on its own. [`AuditError::is_retryable`] only
//! describes whether a *user-initiated* re-submission is worth trying: the
//! external model is non-deterministic, so an unparsable reply today may be a
//! perfectly valid one on the next attempt.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the roadmap-audit library.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// No LLM provider could be constructed (usually a missing API key).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Authorization ─────────────────────────────────────────────────────
    /// The supplied access code does not match the configured one.
    #[error("Invalid access code.")]
    AccessDenied,

    // ── Input ─────────────────────────────────────────────────────────────
    /// The request carried no slide data at all.
    #[error("No slide data supplied")]
    MissingDocumentData,

    /// The request body is not the shape the boundary expects.
    #[error("Malformed request: {detail}")]
    MalformedRequest { detail: String },

    /// The file extension is not one of pdf, ppt, pptx.
    #[error("Unsupported format for '{file_name}'. Upload a PPT, PPTX or PDF file.")]
    UnsupportedFormat { file_name: String },

    /// The file exceeds the upload ceiling.
    #[error("File too large: {size} bytes (max {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// Input file was not found or could not be read.
    #[error("File not found or unreadable: '{path}'")]
    FileNotFound { path: PathBuf },

    /// HTTP download of a URL input failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// pdfium could not open the document (corrupt header, xref, password…).
    #[error("Document '{file_name}' could not be opened: {detail}")]
    CorruptDocument { file_name: String, detail: String },

    // ── Normalisation ─────────────────────────────────────────────────────
    /// PDF conversion produced zero pages.
    #[error("No pages detected in '{file_name}'")]
    NoPagesDetected { file_name: String },

    /// The rasterisation engine could not be located, downloaded or bound.
    #[error(
        "PDF rendering engine unavailable: {0}\n\n\
PDFium is normally downloaded automatically on first use.\n\
  • Check your internet connection and try again.\n\
  • Or set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    RenderingUnavailable(String),

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Model reply ───────────────────────────────────────────────────────
    /// The reply contains no recoverable JSON object.
    #[error("Could not parse the analysis reply. Please try again.")]
    UnparsableResponse { detail: String },

    /// The reply parsed but does not satisfy the evaluation contract.
    #[error("Incomplete analysis reply ({detail}). Please try again.")]
    IncompleteResponse { detail: String },

    /// The provider answered with no text at all.
    #[error("The analysis service returned an empty reply. Please try again.")]
    EmptyResponse,

    // ── Upstream ──────────────────────────────────────────────────────────
    /// The provider rejected the credential (401/403).
    #[error("Invalid API key for provider '{provider}'. Check the provider credentials in your environment.")]
    UpstreamAuthFailed { provider: String, detail: String },

    /// Rate limit or overload signalled by the provider.
    #[error("The analysis service is overloaded. Retry in a few seconds.")]
    UpstreamOverloaded { detail: String },

    /// The round trip exceeded the configured ceiling.
    #[error("The analysis service did not answer within {secs}s. Please try again.")]
    UpstreamTimeout { secs: u64 },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Anything else; the message is passed through verbatim.
    #[error("{0}")]
    Unknown(String),
}

/// Coarse failure taxonomy exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationMissing,
    AuthorizationFailed,
    InvalidInput,
    NoPagesDetected,
    RenderingUnavailable,
    UnparsableResponse,
    IncompleteResponse,
    UpstreamAuthFailed,
    UpstreamOverloaded,
    UnknownFailure,
}

impl AuditError {
    /// Classify this error into the boundary taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use AuditError::*;
        match self {
            ProviderNotConfigured { .. } | InvalidConfig(_) => ErrorKind::ConfigurationMissing,
            AccessDenied => ErrorKind::AuthorizationFailed,
            MissingDocumentData
            | MalformedRequest { .. }
            | UnsupportedFormat { .. }
            | FileTooLarge { .. }
            | FileNotFound { .. }
            | DownloadFailed { .. } => ErrorKind::InvalidInput,
            // A PDF pdfium cannot open yields no pages either.
            NoPagesDetected { .. } | CorruptDocument { .. } => ErrorKind::NoPagesDetected,
            RenderingUnavailable(_) => ErrorKind::RenderingUnavailable,
            UnparsableResponse { .. } => ErrorKind::UnparsableResponse,
            IncompleteResponse { .. } | EmptyResponse => ErrorKind::IncompleteResponse,
            UpstreamAuthFailed { .. } => ErrorKind::UpstreamAuthFailed,
            UpstreamOverloaded { .. } | UpstreamTimeout { .. } => ErrorKind::UpstreamOverloaded,
            RasterisationFailed { .. } | Unknown(_) => ErrorKind::UnknownFailure,
        }
    }

    /// HTTP status code the request boundary answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            AuditError::UpstreamTimeout { .. } => 504,
            _ => match self.kind() {
                ErrorKind::ConfigurationMissing => 500,
                ErrorKind::AuthorizationFailed => 403,
                ErrorKind::InvalidInput => 400,
                ErrorKind::NoPagesDetected => 422,
                ErrorKind::RenderingUnavailable => 503,
                ErrorKind::UnparsableResponse | ErrorKind::IncompleteResponse => 502,
                ErrorKind::UpstreamAuthFailed => 401,
                ErrorKind::UpstreamOverloaded => 429,
                ErrorKind::UnknownFailure => 500,
            },
        }
    }

    /// Whether re-submitting the same document may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RenderingUnavailable
                | ErrorKind::UnparsableResponse
                | ErrorKind::IncompleteResponse
                | ErrorKind::UpstreamOverloaded
        )
    }

    /// The `{ "error": … }` body sent to the presentation layer.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// Failure payload of the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
