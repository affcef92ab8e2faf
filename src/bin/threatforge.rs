//! CLI binary for threatforge.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use threatforge::{
    analyze_file, analyze_to_file, AnalysisConfig, RepositoryReference, DEFAULT_MODEL,
    REPORT_FILE_NAME,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Threat-model a design document (report to stdout)
  threatforge design_doc.pdf

  # Include repository context
  threatforge design_doc.pdf --repo https://github.com/org/service

  # Private repository (credential from env, never logged)
  GIT_CREDENTIAL=ghp_... threatforge design_doc.pdf --repo https://github.com/org/private

  # Write the downloadable report artifact
  threatforge design_doc.pdf -o stride_threat_model.txt

  # Structured JSON output (report + stats)
  threatforge --json design_doc.pdf > result.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY      Google Gemini API key (required)
  GIT_CREDENTIAL      Access token for private repository clones
  THREATFORGE_MODEL   Override model ID (default: gemini-2.0-flash)

SETUP:
  1. Set API key:   export GEMINI_API_KEY=AIza...
  2. Analyze:       threatforge design_doc.pdf --repo https://github.com/org/service
"#;

/// Generate a STRIDE/PASTA threat-model report from a system PDF.
#[derive(Parser, Debug)]
#[command(
    name = "threatforge",
    version,
    about = "Generate STRIDE/PASTA threat-model reports from a system PDF and an optional source repository",
    long_about = "Upload a product/system description (PDF) and optionally point at a source \
repository. The document and an allow-listed slice of the repository (README, app.py, main.py, \
server.py, Dockerfile) are sent to Google Gemini, which produces a STRIDE and PASTA threat model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PRD / system document (PDF).
    input: PathBuf,

    /// Repository URL to clone for additional context.
    #[arg(short, long)]
    repo: Option<String>,

    /// Access credential for private repositories.
    #[arg(long, env = "GIT_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// LLM model ID.
    #[arg(long, env = "THREATFORGE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leading PDF pages to extract for the text gate/preview.
    #[arg(long, default_value_t = 2)]
    max_pages: usize,

    /// Output structured JSON (report + stats) instead of plain text.
    #[arg(long)]
    json: bool,

    /// Show the extracted document text preview on stderr.
    #[arg(long)]
    preview: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Repository clone timeout in seconds.
    #[arg(long, default_value_t = 120)]
    clone_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, default_value_t = 300)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(short, long)]
    quiet: bool,
}

/// Truncation applied to the repository/document *preview* only — the prompt
/// itself is never truncated.
const PREVIEW_CHARS: usize = 3000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = AnalysisConfig::builder()
        .api_key(cli.api_key.clone())
        .model(cli.model.clone())
        .max_pages(cli.max_pages)
        .clone_timeout_secs(cli.clone_timeout)
        .api_timeout_secs(cli.api_timeout)
        .build()
        .context("Invalid configuration")?;

    let repository = cli
        .repo
        .as_ref()
        .map(|url| RepositoryReference::new(url.clone(), cli.credential.clone()));

    // ── Spinner ──────────────────────────────────────────────────────────
    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Analyzing");
        bar.set_message(if cli.repo.is_some() {
            "extracting document, cloning repository, querying model…"
        } else {
            "extracting document, querying model…"
        });
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = if let Some(ref output_path) = cli.output {
        analyze_to_file(&cli.input, output_path, repository.as_ref(), &config).await
    } else {
        analyze_file(&cli.input, repository.as_ref(), &config).await
    };

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {e}", red("✘"));
            std::process::exit(1);
        }
    };

    // ── Present the report ───────────────────────────────────────────────
    if cli.preview && !cli.quiet {
        let preview: String = report.extracted_text.chars().take(PREVIEW_CHARS).collect();
        eprintln!("{}", bold("── Extracted document text ──"));
        eprintln!("{}", dim(&preview));
        if report.extracted_text.chars().count() > PREVIEW_CHARS {
            eprintln!("{}", dim("…"));
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if let Some(ref output_path) = cli.output {
        if !cli.quiet {
            eprintln!(
                "{}  report written to {}  {}",
                green("✔"),
                bold(&output_path.display().to_string()),
                dim(&format!(
                    "({} pages read, {} repo files, {}ms)",
                    report.pages_processed,
                    report.repo_file_count,
                    report.stats.total_duration_ms
                )),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.report.as_bytes())
            .context("Failed to write to stdout")?;
        if !report.report.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        if !cli.quiet {
            eprintln!(
                "{}  {} pages read, {} repo files, {}ms  {}",
                green("✔"),
                report.pages_processed,
                report.repo_file_count,
                report.stats.total_duration_ms,
                dim(&format!("(save as {REPORT_FILE_NAME} with -o)")),
            );
        }
    }

    Ok(())
}
