//! Top-level analysis entry points.
//!
//! One user action maps to one [`analyze`] call: extract the document text,
//! optionally fetch repository context, compose the prompt, make a single
//! LLM request, and hand back the report. Every stage is synchronous with
//! respect to the caller — there is no background work and nothing persists
//! across calls.
//!
//! Failure policy (each failure is mapped at its originating boundary, no
//! raw errors cross into a caller unformatted):
//!
//! * Empty extraction aborts with
//!   [`ThreatModelError::DocumentExtractionFailed`] **before** any network
//!   call, so no LLM request is spent on unusable input.
//! * A requested repository that fails to clone aborts the analysis; a
//!   repository with no matching key files does not — analysis proceeds with
//!   the fixed placeholder context.

use crate::config::AnalysisConfig;
use crate::error::ThreatModelError;
use crate::pipeline::llm::{GeminiClient, PromptPayload};
use crate::pipeline::repo::{self, RepositoryContext, RepositoryReference};
use crate::pipeline::document;
use crate::prompts;
use crate::report::{AnalysisStats, ThreatModelReport};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Documents above this size get a warning (never a rejection).
pub const SOFT_SIZE_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Compose the request payload from the document and the repository context.
///
/// Deterministic: the instruction template is rendered exactly once with the
/// repository context substituted verbatim (or the fixed placeholder when
/// absent or when no files matched). The document is paired as a binary
/// attachment, not inlined as text. No size limiting or sanitisation is
/// applied to the repository content.
pub fn compose(
    document_bytes: &[u8],
    repo_context: Option<&RepositoryContext>,
    config: &AnalysisConfig,
) -> PromptPayload {
    let template = config
        .instruction_prompt
        .as_deref()
        .unwrap_or(prompts::THREAT_MODEL_PROMPT);

    let rendered_context = repo_context.and_then(RepositoryContext::render);
    let instruction = prompts::render_instruction(template, rendered_context.as_deref());

    PromptPayload {
        instruction,
        document: document_bytes.to_vec(),
    }
}

/// Produce a threat-model report for a PDF, optionally with repository
/// context.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// * [`ThreatModelError::DocumentExtractionFailed`] — no text in the leading
///   pages; no LLM call is made.
/// * [`ThreatModelError::InvalidUrlFormat`] / [`ThreatModelError::CloneFailed`]
///   — repository was requested but could not be fetched; the analysis is
///   aborted rather than silently degrading to a document-only report.
/// * [`ThreatModelError::GenerationFailed`] — the LLM call failed; not
///   retried.
pub async fn analyze(
    pdf_bytes: &[u8],
    repository: Option<&RepositoryReference>,
    config: &AnalysisConfig,
) -> Result<ThreatModelReport, ThreatModelError> {
    let total_start = Instant::now();

    if pdf_bytes.len() > SOFT_SIZE_LIMIT_BYTES {
        warn!(
            "PDF is {} bytes (> {} MB soft limit); consider a smaller document",
            pdf_bytes.len(),
            SOFT_SIZE_LIMIT_BYTES / (1024 * 1024)
        );
    }

    // ── Step 1: Extract document text ────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = document::extract(pdf_bytes, config.max_pages);
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    if extracted.is_empty() {
        return Err(ThreatModelError::DocumentExtractionFailed);
    }
    info!(
        "Extracted text from {}/{} pages",
        extracted.pages_processed(),
        extracted.total_pages
    );

    // ── Step 2: Fetch repository context (optional) ──────────────────────
    let fetch_start = Instant::now();
    let repo_context = match repository {
        Some(reference) => Some(repo::fetch(reference, config).await?),
        None => None,
    };
    let fetch_duration_ms = match repository {
        Some(_) => fetch_start.elapsed().as_millis() as u64,
        None => 0,
    };

    if let Some(RepositoryContext::NoMatchingFiles) = repo_context {
        info!("No key files matched in the repository; proceeding without context");
    }

    // ── Step 3: Compose the prompt ───────────────────────────────────────
    let payload = compose(pdf_bytes, repo_context.as_ref(), config);

    // ── Step 4: Generate the report ──────────────────────────────────────
    let llm_start = Instant::now();
    let client = GeminiClient::new(config)?;
    let report_text = client.generate(&payload).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    info!(
        "Threat model generated: {} chars in {}ms",
        report_text.len(),
        llm_duration_ms
    );

    // ── Step 5: Assemble the result ──────────────────────────────────────
    let pages_processed = extracted.pages_processed();
    Ok(ThreatModelReport {
        report: report_text,
        extracted_text: extracted.text,
        pages_processed,
        total_pages: extracted.total_pages,
        repo_file_count: repo_context.as_ref().map_or(0, RepositoryContext::file_count),
        stats: AnalysisStats {
            document_bytes: pdf_bytes.len(),
            extract_duration_ms,
            fetch_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        },
    })
}

/// Analyze a PDF on disk, validating the path and magic bytes first.
pub async fn analyze_file(
    input: impl AsRef<Path>,
    repository: Option<&RepositoryReference>,
    config: &AnalysisConfig,
) -> Result<ThreatModelReport, ThreatModelError> {
    let bytes = read_pdf(input.as_ref())?;
    analyze(&bytes, repository, config).await
}

/// Analyze a PDF and write the report to `output`.
///
/// Uses an atomic write (temp file + rename) so a failed run never leaves a
/// partial report behind.
pub async fn analyze_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    repository: Option<&RepositoryReference>,
    config: &AnalysisConfig,
) -> Result<ThreatModelReport, ThreatModelError> {
    let report = analyze_file(input, repository, config).await?;
    let path = output.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ThreatModelError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, &report.report)
        .await
        .map_err(|e| ThreatModelError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ThreatModelError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(report)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    pdf_bytes: &[u8],
    repository: Option<&RepositoryReference>,
    config: &AnalysisConfig,
) -> Result<ThreatModelReport, ThreatModelError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ThreatModelError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(analyze(pdf_bytes, repository, config))
}

/// Read a PDF from disk, mapping I/O failures and validating magic bytes.
fn read_pdf(path: &Path) -> Result<Vec<u8>, ThreatModelError> {
    if !path.exists() {
        return Err(ThreatModelError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ThreatModelError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ThreatModelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ThreatModelError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    Ok(bytes)
}
