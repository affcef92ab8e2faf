//! Error types for the threatforge library.
//!
//! Every failure the pipeline can hit is a variant of [`ThreatModelError`] —
//! a closed taxonomy rather than free-form strings, so callers can match on
//! the kind and decide how to surface it. The diagnostic detail rides along
//! as a field.
//!
//! Two invariants hold across every variant:
//!
//! * A repository credential never appears in any `Display` output. The
//!   fetcher scrubs clone failure messages before they reach
//!   [`ThreatModelError::CloneFailed`].
//! * "No matching files in the repository" is **not** an error. It is the
//!   [`crate::pipeline::repo::RepositoryContext::NoMatchingFiles`] sentinel
//!   and analysis proceeds without repository context.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the threatforge library.
#[derive(Debug, Error)]
pub enum ThreatModelError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// The PDF could not be opened or yielded no extractable text
    /// (e.g. an image-only scan). No LLM request is made in this case.
    #[error(
        "Could not extract text from the PDF.\n\
         Make sure the document is not a scanned image and contains selectable text."
    )]
    DocumentExtractionFailed,

    // ── Repository errors ─────────────────────────────────────────────────
    /// Credential injection was requested but the URL does not contain
    /// exactly one scheme separator (`://`).
    #[error(
        "Invalid repository URL format: '{url}'\n\
         A credentialled URL must contain exactly one scheme separator, e.g. https://host/org/repo"
    )]
    InvalidUrlFormat { url: String },

    /// Repository retrieval failed (network, authentication, not-found).
    /// The detail string has any credential redacted.
    #[error("Failed to clone repository: {detail}")]
    CloneFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The LLM call failed for any reason: transport error, non-2xx status,
    /// or a response with no text content. Not retried.
    #[error("Threat model generation failed: {detail}")]
    GenerationFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
