//! Instruction prompts for threat-model generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening the methodology instructions or
//!    adjusting the context placeholder requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can render and inspect the final
//!    instruction text without spinning up a real LLM.
//!
//! Callers can override the template via
//! [`crate::config::AnalysisConfig::instruction_prompt`]; the constants here
//! are used only when no override is provided.

/// Slot in the instruction template that receives the repository context.
pub const REPO_CONTEXT_SLOT: &str = "{repo_context}";

/// Fixed placeholder interpolated when no repository context is available
/// (no URL given, or the clone tree contained no key files).
pub const NO_CONTEXT_PLACEHOLDER: &str = "[No repository context provided]";

/// Default instruction template for the threat-model request.
///
/// The uploaded PDF travels as a separate document attachment on the same
/// request; only the repository context is inlined, via
/// [`REPO_CONTEXT_SLOT`].
pub const THREAT_MODEL_PROMPT: &str = r#"You are a senior security architect. You are tasked with performing a comprehensive security threat modeling assessment.

1. You will be provided with a PDF product/system document.
2. Optionally, you may also have source repository content with code or infrastructure.
3. Goal: Perform a threat model based on the content of the provided PDF document and repository.

Your steps:
- Analyze the document to understand the features and architecture.
- Analyze the repository content to build context around the system.
- Identify key components in the system and data flow.
- Identify potential attacker entry points and vulnerabilities for each component.
- Create a STRIDE threat model (Spoofing, Tampering, Repudiation, Info Disclosure, DoS, Elevation of Privileges).
- Create a PASTA threat model (Process for Attack Simulation and Threat Analysis).
- Be very specific and contextual, no generic risks like injection attacks. You have the code so you should be able to validate all risks.

Repository context (if provided):
{repo_context}

Now, analyze the attached PDF and generate a threat model report:
"#;

/// Render the instruction text by substituting the repository context into
/// the template exactly once.
///
/// `context` is inserted verbatim: no truncation or sanitisation is applied,
/// so the instruction is a deterministic function of its inputs. Callers
/// feeding untrusted repositories through here must bound the content
/// themselves. Pass `None` for the fixed [`NO_CONTEXT_PLACEHOLDER`].
pub fn render_instruction(template: &str, context: Option<&str>) -> String {
    let context = match context {
        Some(c) if !c.trim().is_empty() => c,
        _ => NO_CONTEXT_PLACEHOLDER,
    };
    template.replacen(REPO_CONTEXT_SLOT, context, 1)
}
