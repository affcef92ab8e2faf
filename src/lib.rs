//! # threatforge
//!
//! Generate STRIDE/PASTA security threat-model reports from a product/system
//! description (PDF) and, optionally, a source repository.
//!
//! ## Why this crate?
//!
//! Threat modelling starts from two artifacts that rarely live together: the
//! system document that says what was *intended*, and the repository that
//! says what was *built*. This crate stitches the two into a single LLM
//! request — the document travels as a binary attachment, a small
//! allow-listed slice of the repository (README, entry points, Dockerfile)
//! is interpolated into the instruction — and hands back the model's report
//! verbatim. The threat reasoning itself is entirely the model's job; the
//! crate's job is making the inputs trustworthy: deterministic prompt
//! assembly, ephemeral clone storage that can't leak, and credentials that
//! never appear in any output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract  plain text from the leading pages (gate + preview)
//!  ├─ 2. Fetch    optional: shallow-clone repo, collect key files
//!  ├─ 3. Compose  instruction template + repository context
//!  ├─ 4. Generate one Gemini generateContent call, no retries
//!  └─ 5. Report   raw response text, stride_threat_model.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use threatforge::{analyze_file, AnalysisConfig, RepositoryReference};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!
//!     let repo = RepositoryReference::new("https://github.com/org/service", None);
//!     let result = analyze_file("design_doc.pdf", Some(&repo), &config).await?;
//!     println!("{}", result.report);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `threatforge` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! threatforge = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync, analyze_to_file, compose, SOFT_SIZE_LIMIT_BYTES};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
pub use error::ThreatModelError;
pub use pipeline::document::{extract, ExtractedDocument};
pub use pipeline::llm::{GeminiClient, PromptPayload};
pub use pipeline::repo::{
    authenticated_clone_url, fetch, fetch_in, FileBlock, RepositoryContext, RepositoryReference,
    KEY_FILES,
};
pub use report::{AnalysisStats, ThreatModelReport, REPORT_FILE_NAME, REPORT_MIME_TYPE};
