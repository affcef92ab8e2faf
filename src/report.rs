//! Analysis result types.
//!
//! [`ThreatModelReport`] carries the raw LLM response — consumed as-is, with
//! no parsing or validation of its structure — alongside enough bookkeeping
//! for a caller to show what went into it: the extracted document preview,
//! how much repository context was attached, and where the time went.

use serde::Serialize;

/// Filename of the downloadable report artifact.
pub const REPORT_FILE_NAME: &str = "stride_threat_model.txt";

/// MIME type of the downloadable report artifact.
pub const REPORT_MIME_TYPE: &str = "text/plain";

/// Result of a completed analysis.
#[derive(Debug, Clone, Serialize)]
pub struct ThreatModelReport {
    /// Raw LLM response text. This is the report; no post-processing is
    /// applied.
    pub report: String,

    /// Text extracted from the leading PDF pages, for preview display.
    pub extracted_text: String,

    /// Pages the extractor processed (`min(total, max_pages)`).
    pub pages_processed: usize,

    /// Total pages in the uploaded document.
    pub total_pages: usize,

    /// Number of repository file blocks interpolated into the prompt.
    /// Zero when no URL was supplied or no key files matched.
    pub repo_file_count: usize,

    /// Timing and size accounting for the run.
    pub stats: AnalysisStats,
}

/// Stage timings and payload sizes for one analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    /// Size of the uploaded PDF in bytes.
    pub document_bytes: usize,
    /// Milliseconds spent extracting document text.
    pub extract_duration_ms: u64,
    /// Milliseconds spent cloning and filtering the repository (0 when no
    /// repository was requested).
    pub fetch_duration_ms: u64,
    /// Milliseconds spent in the LLM call.
    pub llm_duration_ms: u64,
    /// Wall-clock total for the analysis.
    pub total_duration_ms: u64,
}
