//! Configuration types for threat-model analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping every knob in one struct means the
//! components that need the API key or model name receive them explicitly —
//! nothing in the pipeline reads ambient environment state. The CLI binary is
//! the only place environment variables are consulted, and it maps them into
//! this struct at startup.

use crate::error::ThreatModelError;
use std::fmt;

/// Default Gemini model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default base URL of the Gemini `generateContent` API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a threat-model analysis.
///
/// Built via [`AnalysisConfig::builder()`].
///
/// # Example
/// ```rust
/// use threatforge::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .api_key("AIza...")
///     .model("gemini-2.0-flash")
///     .max_pages(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// API key for the LLM service. Required. Never logged; the custom
    /// `Debug` impl redacts it.
    pub api_key: String,

    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the LLM API. Default: [`DEFAULT_API_BASE_URL`].
    ///
    /// Overridable so tests can point the client at a local mock server.
    pub api_base_url: String,

    /// Number of leading PDF pages to extract text from. Default: 2.
    ///
    /// The extracted text is a sanity gate (is there anything readable in
    /// this document?) and a preview for the caller — the full PDF is
    /// attached to the LLM request regardless, so two pages is enough.
    pub max_pages: usize,

    /// Sampling temperature for the LLM completion. Default: 0.2.
    ///
    /// A threat model should be grounded in the provided document and code,
    /// not invented. Low temperature keeps the model on the evidence.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 8192.
    ///
    /// A full STRIDE + PASTA write-up for a multi-component system easily
    /// exceeds 4k tokens; truncating one mid-table is worse than paying for
    /// the headroom.
    pub max_output_tokens: usize,

    /// Custom instruction prompt. If `None`, uses
    /// [`crate::prompts::THREAT_MODEL_PROMPT`]. The `{repo_context}` slot is
    /// substituted either way.
    pub instruction_prompt: Option<String>,

    /// Timeout for the repository clone in seconds. Default: 120.
    ///
    /// The upstream design blocks indefinitely on the clone; a hung remote
    /// would hang the whole analysis, so a bound is imposed here.
    pub clone_timeout_secs: u64,

    /// Timeout for the LLM call in seconds. Default: 300.
    pub api_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_pages: 2,
            temperature: 0.2,
            max_output_tokens: 8192,
            instruction_prompt: None,
            clone_timeout_secs: 120,
            api_timeout_secs: 300,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("max_pages", &self.max_pages)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field(
                "instruction_prompt",
                &self.instruction_prompt.as_ref().map(|_| "<custom>"),
            )
            .field("clone_timeout_secs", &self.clone_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn instruction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.instruction_prompt = Some(prompt.into());
        self
    }

    pub fn clone_timeout_secs(mut self, secs: u64) -> Self {
        self.config.clone_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ThreatModelError> {
        let c = &self.config;
        if c.api_key.is_empty() {
            return Err(ThreatModelError::InvalidConfig(
                "API key must not be empty (set GEMINI_API_KEY or call .api_key())".into(),
            ));
        }
        if c.api_base_url.is_empty() {
            return Err(ThreatModelError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        if c.clone_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(ThreatModelError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
