//! Repository fetching: clone into ephemeral storage, collect key files.
//!
//! ## Lifecycle
//!
//! The clone target is a [`TempDir`] owned by the `fetch` call. Ownership is
//! the cleanup guarantee: whether the clone fails, no files match, or the
//! walk succeeds, the directory is removed when the guard drops — including
//! on panic. Nothing from the clone outlives the returned
//! [`RepositoryContext`], which holds only the file contents.
//!
//! ## Credentials
//!
//! A credential is embedded into the transient authenticated clone URL and
//! nowhere else. It is never logged, never included in the returned context,
//! and every failure message is scrubbed before it leaves this module.

use crate::config::AnalysisConfig;
use crate::error::ThreatModelError;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Filenames (case-insensitive) considered relevant for repository context.
///
/// These are the files that describe what a service is and how it is
/// deployed; everything else in the tree is ignored.
pub const KEY_FILES: [&str; 5] = ["readme.md", "app.py", "main.py", "server.py", "dockerfile"];

/// Placeholder substituted for a credential in scrubbed failure messages.
const CREDENTIAL_REDACTION: &str = "<credential>";

/// A repository to fetch: URL plus optional access credential.
///
/// The credential is used only to build the transient authenticated clone
/// URL; `Debug` redacts it.
#[derive(Clone)]
pub struct RepositoryReference {
    pub url: String,
    pub credential: Option<String>,
}

impl RepositoryReference {
    pub fn new(url: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            url: url.into(),
            credential,
        }
    }
}

impl fmt::Debug for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryReference")
            .field("url", &self.url)
            .field(
                "credential",
                &self.credential.as_ref().map(|_| CREDENTIAL_REDACTION),
            )
            .finish()
    }
}

/// One matched file: its name and content, renderable as a labelled block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub name: String,
    pub content: String,
}

impl FileBlock {
    /// Render the block with its filename header, ready for prompt
    /// interpolation.
    pub fn render(&self) -> String {
        format!("\n\n---\n### {}\n```\n{}\n```", self.name, self.content)
    }
}

/// Outcome of a successful repository fetch.
///
/// `NoMatchingFiles` is a sentinel, not an error: the analysis proceeds
/// without repository context.
#[derive(Debug, Clone)]
pub enum RepositoryContext {
    /// One block per matched key file, in traversal order.
    Files(Vec<FileBlock>),
    /// The tree contained none of the [`KEY_FILES`].
    NoMatchingFiles,
}

impl RepositoryContext {
    /// Concatenated block text, or `None` for the no-match sentinel.
    pub fn render(&self) -> Option<String> {
        match self {
            RepositoryContext::Files(blocks) => {
                Some(blocks.iter().map(FileBlock::render).collect::<Vec<_>>().join("\n"))
            }
            RepositoryContext::NoMatchingFiles => None,
        }
    }

    /// Number of matched file blocks (0 for the sentinel).
    pub fn file_count(&self) -> usize {
        match self {
            RepositoryContext::Files(blocks) => blocks.len(),
            RepositoryContext::NoMatchingFiles => 0,
        }
    }
}

/// Build the URL passed to `git clone`.
///
/// Without a credential the input URL is returned unchanged. With one, the
/// credential is inserted immediately after the scheme separator
/// (`scheme://` → `scheme://<credential>@`), preserving the remainder. A URL
/// with zero or multiple scheme separators is rejected with
/// [`ThreatModelError::InvalidUrlFormat`] before any network access.
pub fn authenticated_clone_url(
    url: &str,
    credential: Option<&str>,
) -> Result<String, ThreatModelError> {
    let Some(credential) = credential else {
        return Ok(url.to_string());
    };

    if url.matches("://").count() != 1 {
        return Err(ThreatModelError::InvalidUrlFormat {
            url: url.to_string(),
        });
    }

    // Exactly one separator, so split_once cannot fail here.
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| ThreatModelError::InvalidUrlFormat {
            url: url.to_string(),
        })?;

    Ok(format!("{scheme}://{credential}@{rest}"))
}

/// Remove any trace of the credential from a failure message.
///
/// git echoes the clone URL (credential included) into its stderr on
/// authentication and not-found failures.
fn scrub_credential(message: &str, credential: Option<&str>) -> String {
    match credential {
        Some(cred) if !cred.is_empty() => message.replace(cred, CREDENTIAL_REDACTION),
        _ => message.to_string(),
    }
}

/// Clone `reference` and return the filtered repository context.
///
/// The clone is shallow, bounded by `config.clone_timeout_secs`, and lands in
/// a temporary directory that is removed on every exit path. Transport,
/// authentication, and not-found failures all surface as
/// [`ThreatModelError::CloneFailed`] with the credential scrubbed from the
/// message.
pub async fn fetch(
    reference: &RepositoryReference,
    config: &AnalysisConfig,
) -> Result<RepositoryContext, ThreatModelError> {
    fetch_in(reference, config, None).await
}

/// Like [`fetch`], with the clone workspace created under `parent` instead
/// of the system temp directory. Useful when large clones should land on a
/// specific volume, and for verifying cleanup behaviour.
pub async fn fetch_in(
    reference: &RepositoryReference,
    config: &AnalysisConfig,
    parent: Option<&Path>,
) -> Result<RepositoryContext, ThreatModelError> {
    let clone_url = authenticated_clone_url(&reference.url, reference.credential.as_deref())?;

    let work_dir = match parent {
        Some(p) => TempDir::new_in(p),
        None => TempDir::new(),
    }
    .map_err(|e| ThreatModelError::Internal(format!("tempdir: {e}")))?;

    info!("Cloning repository: {}", reference.url);
    clone_into(&clone_url, work_dir.path(), config, reference.credential.as_deref()).await?;

    let blocks = collect_key_files(work_dir.path());
    debug!("Matched {} key files", blocks.len());

    // `work_dir` drops here, removing the clone on success and no-match
    // paths alike; the error paths above drop it the same way.
    if blocks.is_empty() {
        Ok(RepositoryContext::NoMatchingFiles)
    } else {
        Ok(RepositoryContext::Files(blocks))
    }
}

/// Run `git clone --depth 1` into `target`, mapping every failure mode to
/// `CloneFailed`.
async fn clone_into(
    clone_url: &str,
    target: &Path,
    config: &AnalysisConfig,
    credential: Option<&str>,
) -> Result<(), ThreatModelError> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.arg("clone")
        .args(["--depth", "1"])
        .arg(clone_url)
        .arg(target)
        // A private repo with a bad credential must fail, not sit waiting
        // for a username on a terminal nobody is watching.
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped());

    let output = match timeout(Duration::from_secs(config.clone_timeout_secs), cmd.output()).await
    {
        Err(_) => {
            return Err(ThreatModelError::CloneFailed {
                detail: format!("timed out after {}s", config.clone_timeout_secs),
            })
        }
        Ok(Err(e)) => {
            return Err(ThreatModelError::CloneFailed {
                detail: scrub_credential(&format!("could not run git: {e}"), credential),
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ThreatModelError::CloneFailed {
            detail: scrub_credential(stderr.trim(), credential),
        });
    }

    Ok(())
}

/// Walk `root` and produce one [`FileBlock`] per allow-listed filename.
///
/// Traversal is depth-first with entries sorted by file name, so the block
/// order is deterministic for a given tree. Contents are read lossily
/// (undecodable bytes become U+FFFD) and files that cannot be read at all
/// are skipped with a warning rather than aborting the fetch.
pub fn collect_key_files(root: &Path) -> Vec<FileBlock> {
    let mut blocks = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != std::ffi::OsStr::new(".git"));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !KEY_FILES.contains(&name.to_lowercase().as_str()) {
            continue;
        }

        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                blocks.push(FileBlock { name, content });
            }
            Err(e) => {
                warn!("Skipping unreadable file {}: {e}", entry.path().display());
            }
        }
    }

    blocks
}
