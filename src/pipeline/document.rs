//! Document text extraction: plain text from the leading pages of a PDF.
//!
//! ## Why extract text at all when the PDF is attached to the request?
//!
//! The full document travels to the LLM as a binary attachment, so this text
//! is not what the model reads. It exists as a gate and a preview: if the
//! leading pages yield no text (image-only scan, corrupt file), the analysis
//! aborts *before* spending an LLM request on unusable input, and the caller
//! gets the extracted text back for display.
//!
//! Extraction never returns an error. A document that cannot be opened or
//! carries no text yields an empty [`ExtractedDocument`]; the orchestrator in
//! [`crate::analyze`] maps that to
//! [`crate::error::ThreatModelError::DocumentExtractionFailed`].

use tracing::{debug, warn};

/// Text extracted from the leading pages of a PDF.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    /// Per-page text of the pages that were processed, in page order.
    pub pages: Vec<String>,
    /// The page texts joined with `\n` and trimmed of surrounding whitespace.
    pub text: String,
    /// Total pages in the document (0 when the PDF could not be opened).
    pub total_pages: usize,
}

impl ExtractedDocument {
    /// Number of pages actually processed: `min(total_pages, max_pages)`.
    pub fn pages_processed(&self) -> usize {
        self.pages.len()
    }

    /// True when extraction produced no usable text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Extract plain text from at most `max_pages` leading pages of `pdf_bytes`.
///
/// Pages are processed in page order; their texts are joined with newline
/// separators and the result is trimmed. An unreadable document or one that
/// yields no text returns an empty `ExtractedDocument` — callers treat that
/// as a reportable failure, not something to retry.
pub fn extract(pdf_bytes: &[u8], max_pages: usize) -> ExtractedDocument {
    let total_pages = match lopdf::Document::load_mem(pdf_bytes) {
        Ok(doc) => doc.get_pages().len(),
        Err(e) => {
            warn!("Could not open PDF: {e}");
            return ExtractedDocument::default();
        }
    };

    let all_pages = match pdf_extract::extract_text_from_mem_by_pages(pdf_bytes) {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Text extraction failed: {e}");
            return ExtractedDocument {
                pages: Vec::new(),
                text: String::new(),
                total_pages,
            };
        }
    };

    let pages: Vec<String> = all_pages.into_iter().take(max_pages).collect();
    let text = pages.join("\n").trim().to_string();

    debug!(
        "Extracted {} chars from {}/{} pages",
        text.len(),
        pages.len(),
        total_pages
    );

    ExtractedDocument {
        pages,
        text,
        total_pages,
    }
}
