//! Analysis service seam: send the normalised deck to a vision model and get
//! its raw reply text back.
//!
//! [`Analyst`] is the only place the pipeline talks to the network. The
//! production implementation, [`LlmAnalyst`], drives any `edgequake-llm`
//! provider; tests swap in a scripted implementation.
//!
//! ## Message layout
//!
//! One user turn carrying, in order, the attachments (page PNGs, or the whole
//! presentation) and a text part made of the kind-specific framing sentence
//! followed by the rubric. There is no retry here: a failed round trip is
//! classified and surfaced, and the user decides whether to resubmit.

use crate::config::AuditConfig;
use crate::document::{NormalizedDocument, RequestContext};
use crate::error::AuditError;
use crate::prompts::{analysis_text, DEFAULT_RUBRIC};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Something that can look at a deck and answer with evaluation text.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Return the model's raw reply for `document`.
    async fn analyze(
        &self,
        ctx: &RequestContext,
        document: &NormalizedDocument,
    ) -> Result<String, AuditError>;
}

/// [`Analyst`] backed by an `edgequake-llm` provider.
pub struct LlmAnalyst {
    provider: Arc<dyn LLMProvider>,
    provider_label: String,
    options: CompletionOptions,
    rubric: String,
}

impl LlmAnalyst {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_label: impl Into<String>,
        config: &AuditConfig,
    ) -> Self {
        Self {
            provider,
            provider_label: provider_label.into(),
            options: build_options(config),
            rubric: config
                .rubric
                .clone()
                .unwrap_or_else(|| DEFAULT_RUBRIC.to_string()),
        }
    }
}

#[async_trait]
impl Analyst for LlmAnalyst {
    async fn analyze(
        &self,
        ctx: &RequestContext,
        document: &NormalizedDocument,
    ) -> Result<String, AuditError> {
        let start = Instant::now();
        let messages = build_messages(ctx, document, &self.rubric);

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| classify_upstream_error(&self.provider_label, &e.to_string()))?;

        debug!(
            file = %ctx.file_name,
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            warn!(file = %ctx.file_name, "Provider returned an empty reply");
            return Err(AuditError::EmptyResponse);
        }
        Ok(response.content)
    }
}

/// Build the single user turn for `document`.
pub fn build_messages(
    ctx: &RequestContext,
    document: &NormalizedDocument,
    rubric: &str,
) -> Vec<ChatMessage> {
    let text = analysis_text(
        document.kind(),
        &ctx.file_name,
        document.attachment_count(),
        rubric,
    );
    vec![ChatMessage::user_with_images(&text, attachments(document))]
}

fn attachments(document: &NormalizedDocument) -> Vec<ImageData> {
    match document {
        // `detail: high` keeps fine pictograms and legend swatches visible.
        NormalizedDocument::Paged(pages) => pages
            .iter()
            .map(|p| ImageData::new(p.data.clone(), p.media_type.as_str()).with_detail("high"))
            .collect(),
        NormalizedDocument::Container(doc) => {
            vec![ImageData::new(doc.data.clone(), doc.media_type.as_str())]
        }
    }
}

fn build_options(config: &AuditConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Map a provider error message onto the upstream part of the taxonomy.
pub fn classify_upstream_error(provider: &str, message: &str) -> AuditError {
    let lower = message.to_ascii_lowercase();

    if contains_any(&lower, &["api_key", "api key", "authentication", "unauthorized", "401"]) {
        AuditError::UpstreamAuthFailed {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    } else if contains_any(&lower, &["rate_limit", "rate limit", "overloaded", "429", "529"]) {
        AuditError::UpstreamOverloaded {
            detail: message.to_string(),
        }
    } else {
        AuditError::Unknown(message.to_string())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentKind, EncodedDocument, PageImage};

    fn pages(n: usize) -> NormalizedDocument {
        NormalizedDocument::Paged(
            (0..n)
                .map(|i| PageImage {
                    data: format!("cGFnZ{i}"),
                    media_type: "image/png".into(),
                })
                .collect(),
        )
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&AuditConfig::default());
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4000));
    }

    #[test]
    fn one_attachment_per_page() {
        let doc = pages(3);
        let images = attachments(&doc);
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|i| i.mime_type == "image/png"));
        assert_eq!(images[1].data, "cGFnZ1");
    }

    #[test]
    fn container_is_single_attachment() {
        let doc = NormalizedDocument::Container(EncodedDocument {
            data: "UEsDBA==".into(),
            media_type: crate::document::PRESENTATION_MEDIA_TYPE.into(),
        });
        let images = attachments(&doc);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type, crate::document::PRESENTATION_MEDIA_TYPE);
    }

    #[test]
    fn messages_are_a_single_user_turn() {
        let ctx = RequestContext::new("deck.pdf", DocumentKind::Pdf);
        let messages = build_messages(&ctx, &pages(2), "RUBRIC");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn classify_auth() {
        let e = classify_upstream_error("anthropic", "authentication_error: invalid x-api-key");
        assert!(matches!(e, AuditError::UpstreamAuthFailed { .. }));
        let e = classify_upstream_error("openai", "HTTP 401 Unauthorized");
        assert!(matches!(e, AuditError::UpstreamAuthFailed { .. }));
    }

    #[test]
    fn classify_overload() {
        for msg in ["rate_limit_error", "Overloaded", "status 529", "HTTP 429 Too Many Requests"] {
            let e = classify_upstream_error("anthropic", msg);
            assert!(
                matches!(e, AuditError::UpstreamOverloaded { .. }),
                "{msg} → {e:?}"
            );
        }
    }

    #[test]
    fn classify_other_passes_through() {
        let e = classify_upstream_error("anthropic", "connection reset by peer");
        match e {
            AuditError::Unknown(msg) => assert_eq!(msg, "connection reset by peer"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
