//! Configuration for a roadmap audit.
//!
//! All pipeline behaviour is controlled through [`AuditConfig`], built via
//! [`AuditConfigBuilder`]. One struct per run keeps the request boundary, the
//! CLI and tests on the same knobs, and the builder validates ranges once
//! instead of at every use site.

use crate::document::MAX_UPLOAD_BYTES;
use crate::error::AuditError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when a provider is auto-detected from `ANTHROPIC_API_KEY`.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for one or many audits.
///
/// # Example
/// ```rust
/// use roadmap_audit::AuditConfig;
///
/// let config = AuditConfig::builder()
///     .model("claude-sonnet-4-20250514")
///     .api_timeout_secs(90)
///     .access_code("pmo-2024")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AuditConfig {
    /// Page upscaling factor when rasterising PDF pages. Range: 1.0–4.0. Default: 2.0.
    ///
    /// 2× keeps pictograms, coloured status bars and the dashed reference line
    /// legible to the vision model without producing oversized payloads.
    pub render_scale: f32,

    /// Upload ceiling in bytes. Default: 20 MiB.
    pub max_upload_bytes: u64,

    /// LLM model identifier. If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "gemini").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens in the evaluation reply. Default: 4000.
    ///
    /// Ten criteria with details and recommendations fit comfortably; a lower
    /// ceiling truncates the JSON and the reply becomes unparsable.
    pub max_tokens: usize,

    /// Ceiling for the single round trip to the model, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// When set, requests must carry this access code.
    pub access_code: Option<String>,

    /// Rubric override. If None, [`crate::prompts::DEFAULT_RUBRIC`] is used.
    pub rubric: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4000,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            access_code: None,
            rubric: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("render_scale", &self.render_scale)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("access_code", &self.access_code.as_ref().map(|_| "<redacted>"))
            .field("rubric", &self.rubric.as_ref().map(|r| r.len()))
            .finish()
    }
}

impl AuditConfig {
    /// Create a new builder for `AuditConfig`.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether a supplied access code passes the configured gate.
    ///
    /// An unset or empty configured code disables the check.
    pub fn access_granted(&self, supplied: Option<&str>) -> bool {
        match self.access_code.as_deref() {
            None | Some("") => true,
            Some(expected) => supplied == Some(expected),
        }
    }
}

/// Builder for [`AuditConfig`].
#[derive(Debug)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn access_code(mut self, code: impl Into<String>) -> Self {
        self.config.access_code = Some(code.into());
        self
    }

    pub fn rubric(mut self, rubric: impl Into<String>) -> Self {
        self.config.rubric = Some(rubric.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditConfig, AuditError> {
        let c = &self.config;
        if !(1.0..=4.0).contains(&c.render_scale) {
            return Err(AuditError::InvalidConfig(format!(
                "render scale must be 1.0–4.0, got {}",
                c.render_scale
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(AuditError::InvalidConfig(
                "upload ceiling must be > 0".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(AuditError::InvalidConfig(
                "API timeout must be ≥ 1s".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AuditError::InvalidConfig("max tokens must be > 0".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AuditConfig::default();
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.max_tokens, 4000);
        assert!(c.access_code.is_none());
    }

    #[test]
    fn builder_rejects_bad_scale() {
        let err = AuditConfig::builder().render_scale(8.0).build().unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(AuditConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = AuditConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn access_gate() {
        let open = AuditConfig::default();
        assert!(open.access_granted(None));
        assert!(open.access_granted(Some("anything")));

        let closed = AuditConfig::builder().access_code("s3cret").build().unwrap();
        assert!(closed.access_granted(Some("s3cret")));
        assert!(!closed.access_granted(Some("S3CRET")));
        assert!(!closed.access_granted(None));
    }

    #[test]
    fn debug_redacts_access_code() {
        let c = AuditConfig::builder().access_code("s3cret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("<redacted>"));
    }
}
