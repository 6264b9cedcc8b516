//! # roadmap-audit
//!
//! Score a project roadmap slide deck against a PMO template rubric with a
//! vision language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PPTX
//!  │
//!  ├─ 1. Input      local file or URL, extension + 20 MiB gate
//!  ├─ 2. Normalize  PDF → pages at 2× (pdfium, spawn_blocking) → base64 PNG
//!  │                PPTX → whole file base64
//!  ├─ 3. Analyze    one round trip to claude / gpt / gemini / … (60 s ceiling)
//!  └─ 4. Extract    fence strip, JSON recovery, validation → EvaluationRecord
//! ```
//!
//! Every failure is an [`AuditError`] classified into an [`ErrorKind`] with a
//! status code; nothing is retried automatically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roadmap_audit::{analyze_file, AuditConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / EDGEQUAKE_LLM_PROVIDER / …
//!     let config = AuditConfig::default();
//!     let record = analyze_file("roadmap.pdf", &config).await?;
//!     println!("{}/{} ({})", record.global_score, record.max_score, record.effective_grade());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `roadmap-audit` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | off     | HTTP boundary on axum (`POST /api/analyze`) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod document;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod prompts;
pub mod request;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyst_from_config, analyze_document, analyze_file, analyze_file_sync, inspect,
    resolve_provider, run_analysis, DocumentSummary,
};
pub use config::{AuditConfig, AuditConfigBuilder};
pub use document::{
    Attachment, DocumentKind, EncodedDocument, NormalizedDocument, PageImage, RequestContext,
    UploadedDocument,
};
pub use error::{AuditError, ErrorBody, ErrorKind};
pub use evaluation::{CriterionResult, CriterionStatus, EvaluationRecord, Grade};
pub use pipeline::extract::{extract, extract_evaluation, Extraction};
pub use pipeline::llm::{Analyst, LlmAnalyst};
pub use request::{respond, AnalyzeRequest, AuditService};
