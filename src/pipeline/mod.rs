//! Pipeline stages for threat-model analysis.
//!
//! Each submodule implements exactly one stage. Keeping stages separate
//! makes each independently testable and lets the repository fetch be
//! skipped entirely when no URL is supplied.
//!
//! ## Data Flow
//!
//! ```text
//! PDF bytes ──▶ document ─┐
//!                         ├──▶ prompts ──▶ llm ──▶ report text
//! repo URL ───▶ repo ─────┘
//! ```
//!
//! 1. [`document`] — plain-text extraction from the leading PDF pages; an
//!    empty result aborts the analysis before any network call
//! 2. [`repo`]     — optional: shallow clone into ephemeral storage, collect
//!    allow-listed key files as labelled blocks
//! 3. [`llm`]      — one `generateContent` request carrying the rendered
//!    instruction and the PDF as a binary attachment
//!
//! The stages run sequentially; there is no fan-out and no shared state
//! between analyses.

pub mod document;
pub mod llm;
pub mod repo;
