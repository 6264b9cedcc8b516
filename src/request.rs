//! Request boundary: the inbound analysis request, its checks, and the
//! conversion of every outcome into a status code and a JSON body.
//!
//! Checks run in a fixed order and short-circuit:
//!
//! 1. an analysis service is configured,
//! 2. the access code matches (before any upstream call),
//! 3. slide data is present and shaped as a list of attachments.
//!
//! `images` is kept as raw JSON until step 3 so a malformed list can never
//! pre-empt the configuration or access checks.
//!
//! Nothing escapes [`AuditService::respond`] as a panic or an unconverted
//! error.

use crate::analyze::{analyst_from_config, run_analysis};
use crate::config::AuditConfig;
use crate::document::{
    Attachment, DocumentKind, EncodedDocument, NormalizedDocument, PageImage, RequestContext,
};
use crate::error::AuditError;
use crate::evaluation::EvaluationRecord;
use crate::pipeline::llm::Analyst;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Inbound payload from the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Page images, or a single encoded presentation when `is_pptx`.
    /// Read by [`AuditService::handle`] after the access check.
    #[serde(default)]
    pub images: Option<Value>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub is_pptx: bool,
    #[serde(default)]
    pub access_code: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(file_name: impl Into<String>, attachments: Vec<Attachment>, is_pptx: bool) -> Self {
        Self {
            images: serde_json::to_value(attachments).ok(),
            file_name: file_name.into(),
            is_pptx,
            access_code: None,
        }
    }

    /// Build a request from an already-normalised document.
    pub fn from_document(file_name: impl Into<String>, document: NormalizedDocument) -> Self {
        let is_pptx = document.kind() == DocumentKind::SlideContainer;
        Self::new(file_name, document.into_attachments(), is_pptx)
    }

    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    fn into_document(self) -> Result<(RequestContext, NormalizedDocument), AuditError> {
        let mut images = attachments(self.images)?;

        if self.is_pptx {
            // Only the first attachment is meaningful for a presentation.
            let doc = images.remove(0);
            let ctx = RequestContext::new(self.file_name, DocumentKind::SlideContainer);
            Ok((ctx, NormalizedDocument::Container(EncodedDocument::from(doc))))
        } else {
            let pages = images.into_iter().map(PageImage::from).collect();
            let ctx = RequestContext::new(self.file_name, DocumentKind::Pdf);
            Ok((ctx, NormalizedDocument::Paged(pages)))
        }
    }
}

/// Read the raw `images` value as a non-empty list of attachments. A bare
/// string entry is taken as the base64 data itself.
fn attachments(images: Option<Value>) -> Result<Vec<Attachment>, AuditError> {
    let items = match images {
        Some(Value::Array(items)) if !items.is_empty() => items,
        None | Some(Value::Null) | Some(Value::Array(_)) => {
            return Err(AuditError::MissingDocumentData)
        }
        Some(other) => {
            return Err(AuditError::MalformedRequest {
                detail: format!("images must be a list, got {}", json_type(&other)),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(data) => Ok(Attachment {
                data,
                media_type: String::new(),
            }),
            other => serde_json::from_value(other).map_err(|e| AuditError::MalformedRequest {
                detail: format!("images[{i}]: {e}"),
            }),
        })
        .collect()
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Long-lived handler for analysis requests.
#[derive(Clone)]
pub struct AuditService {
    config: Arc<AuditConfig>,
    analyst: Option<Arc<dyn Analyst>>,
    setup_hint: String,
}

impl AuditService {
    /// Resolve the production analyst from `config`.
    ///
    /// A missing provider does not fail construction: every request then
    /// answers with a configuration error.
    pub fn from_config(config: AuditConfig) -> Self {
        match analyst_from_config(&config) {
            Ok(analyst) => Self::with_analyst(config, analyst),
            Err(e) => {
                warn!("No analysis service configured: {}", e);
                Self {
                    config: Arc::new(config),
                    analyst: None,
                    setup_hint: e.to_string(),
                }
            }
        }
    }

    pub fn with_analyst(config: AuditConfig, analyst: Arc<dyn Analyst>) -> Self {
        Self {
            config: Arc::new(config),
            analyst: Some(analyst),
            setup_hint: String::new(),
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.analyst.is_some()
    }

    /// Run one request through the checks and the analysis.
    pub async fn handle(&self, request: AnalyzeRequest) -> Result<EvaluationRecord, AuditError> {
        let analyst = self
            .analyst
            .as_deref()
            .ok_or_else(|| AuditError::ProviderNotConfigured {
                provider: "analysis service".to_string(),
                hint: self.setup_hint.clone(),
            })?;

        if !self.config.access_granted(request.access_code.as_deref()) {
            warn!(file = %request.file_name, "Rejected request: invalid access code");
            return Err(AuditError::AccessDenied);
        }

        let (ctx, document) = request.into_document()?;
        info!(
            file = %ctx.file_name,
            "Analysing {} attachment(s) as {:?}",
            document.attachment_count(),
            ctx.kind
        );
        run_analysis(&ctx, &document, analyst, &self.config).await
    }

    /// [`handle`](Self::handle) plus conversion to `(status, body)`.
    pub async fn respond(&self, request: AnalyzeRequest) -> (u16, serde_json::Value) {
        respond(self.handle(request).await)
    }
}

/// Convert an outcome into the status code and JSON body of the boundary.
pub fn respond(result: Result<EvaluationRecord, AuditError>) -> (u16, serde_json::Value) {
    match result {
        Ok(record) => match serde_json::to_value(&record) {
            Ok(body) => (200, body),
            Err(e) => failure(&AuditError::Unknown(e.to_string())),
        },
        Err(e) => failure(&e),
    }
}

fn failure(e: &AuditError) -> (u16, serde_json::Value) {
    warn!(kind = ?e.kind(), "Request failed: {}", e);
    let body = serde_json::to_value(e.to_body())
        .unwrap_or_else(|_| serde_json::json!({ "error": e.to_string() }));
    (e.status_code(), body)
}
