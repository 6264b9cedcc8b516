//! End-to-end audit entry points.
//!
//! [`analyze_file`] is the primary API: resolve the input, normalise it, send
//! it to the model once, and extract a validated [`EvaluationRecord`].
//! [`inspect`] stops after normalisation and needs no API key.

use crate::config::{AuditConfig, DEFAULT_ANTHROPIC_MODEL};
use crate::document::{DocumentKind, NormalizedDocument, RequestContext, UploadedDocument};
use crate::error::AuditError;
use crate::evaluation::EvaluationRecord;
use crate::pipeline::llm::{Analyst, LlmAnalyst};
use crate::pipeline::{extract, input, normalize};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Audit a PDF or PowerPoint file (local path or URL).
///
/// # Errors
/// Any [`AuditError`]; the request is never retried internally.
pub async fn analyze_file(
    input_str: impl AsRef<str>,
    config: &AuditConfig,
) -> Result<EvaluationRecord, AuditError> {
    let input_str = input_str.as_ref();
    info!("Starting audit: {}", input_str);

    // Fail on configuration before downloading or rendering anything.
    let analyst = analyst_from_config(config)?;
    let doc = input::resolve_input(
        input_str,
        config.max_upload_bytes,
        config.download_timeout_secs,
    )
    .await?;

    analyze_document(&doc, analyst.as_ref(), config).await
}

/// Audit an already-gated upload with the given analyst.
pub async fn analyze_document(
    doc: &UploadedDocument,
    analyst: &dyn Analyst,
    config: &AuditConfig,
) -> Result<EvaluationRecord, AuditError> {
    let ctx = RequestContext::for_upload(doc);
    let normalized = normalize::normalize(doc, &ctx, config).await?;
    run_analysis(&ctx, &normalized, analyst, config).await
}

/// Send a normalised document to the analyst under the configured timeout and
/// extract the evaluation from its reply.
pub async fn run_analysis(
    ctx: &RequestContext,
    document: &NormalizedDocument,
    analyst: &dyn Analyst,
    config: &AuditConfig,
) -> Result<EvaluationRecord, AuditError> {
    let secs = config.api_timeout_secs;
    let raw = tokio::time::timeout(Duration::from_secs(secs), analyst.analyze(ctx, document))
        .await
        .map_err(|_| {
            warn!(file = %ctx.file_name, "Analysis timed out after {}s", secs);
            AuditError::UpstreamTimeout { secs }
        })??;

    let record = extract::extract_evaluation(&raw)?;
    info!(
        file = %ctx.file_name,
        elapsed_ms = ctx.elapsed_ms(),
        "Audit complete: {}/{} ({})",
        record.global_score,
        record.max_score,
        record.effective_grade()
    );
    Ok(record)
}

/// Synchronous wrapper around [`analyze_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_file_sync(
    input_str: impl AsRef<str>,
    config: &AuditConfig,
) -> Result<EvaluationRecord, AuditError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AuditError::Unknown(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze_file(input_str, config))
}

/// What normalisation would send to the model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub file_name: String,
    pub kind: DocumentKind,
    pub size_bytes: usize,
    /// Rendered pages for a PDF, 1 for a presentation.
    pub attachments: usize,
    /// Total base64 characters across attachments.
    pub payload_bytes: usize,
}

/// Normalise an input without calling the model.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &AuditConfig,
) -> Result<DocumentSummary, AuditError> {
    let doc = input::resolve_input(
        input_str.as_ref(),
        config.max_upload_bytes,
        config.download_timeout_secs,
    )
    .await?;
    let ctx = RequestContext::for_upload(&doc);
    let normalized = normalize::normalize(&doc, &ctx, config).await?;

    Ok(DocumentSummary {
        file_name: doc.file_name().to_string(),
        kind: doc.kind(),
        size_bytes: doc.len(),
        attachments: normalized.attachment_count(),
        payload_bytes: normalized.payload_len(),
    })
}

/// Build the production analyst for `config`.
pub fn analyst_from_config(config: &AuditConfig) -> Result<Arc<dyn Analyst>, AuditError> {
    let (provider, label) = resolve_provider(config)?;
    info!("Using provider '{}'", label);
    Ok(Arc::new(LlmAnalyst::new(provider, label, config)))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AuditError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AuditError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`ANTHROPIC_API_KEY`**, with [`DEFAULT_ANTHROPIC_MODEL`] unless a
///    model is configured.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
///
/// Returns the provider and a label for error messages.
pub fn resolve_provider(
    config: &AuditConfig,
) -> Result<(Arc<dyn LLMProvider>, String), AuditError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL);
        return Ok((create_vision_provider(name, model)?, name.clone()));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return Ok((create_vision_provider(&prov, &model)?, prov));
        }
    }

    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL);
            return Ok((create_vision_provider("anthropic", model)?, "anthropic".into()));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AuditError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set ANTHROPIC_API_KEY, or EDGEQUAKE_LLM_PROVIDER and EDGEQUAKE_MODEL.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
