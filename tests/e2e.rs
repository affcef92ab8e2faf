//! End-to-end integration tests for threatforge.
//!
//! The LLM boundary is mocked with [`mockito`]; PDFs are synthesised with
//! [`lopdf`]; repository fixtures are local `git init` trees. Tests that
//! need the `git` binary skip themselves (with a message) when it is not
//! installed.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use threatforge::{
    analyze, analyze_to_file, extract, fetch, fetch_in, AnalysisConfig, RepositoryContext,
    RepositoryReference, ThreatModelError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Build a valid PDF with one text page per entry in `page_texts`.
fn make_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialise PDF");
    buf
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Skip the current test (with a message) when `git` is not installed.
macro_rules! skip_unless_git {
    () => {
        if !git_available() {
            println!("SKIP — git binary not found on PATH");
            return;
        }
    };
}

fn git(args: &[&str], cwd: &Path) {
    let out = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
}

/// Create a committed local git repository containing `files`.
fn init_git_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(&["init", "-q"], dir.path());
    git(&["config", "user.email", "dev@example.com"], dir.path());
    git(&["config", "user.name", "Dev"], dir.path());
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    git(&["add", "."], dir.path());
    git(&["commit", "-q", "-m", "init"], dir.path());
    dir
}

fn config_for(server: &mockito::Server) -> AnalysisConfig {
    AnalysisConfig::builder()
        .api_key("test-key")
        .api_base_url(server.url())
        .build()
        .unwrap()
}

fn gemini_response(text: &str) -> String {
    serde_json::json!({
        "candidates": [
            {"content": {"parts": [{"text": text}]}}
        ]
    })
    .to_string()
}

// ── Document extraction ──────────────────────────────────────────────────────

#[test]
fn extract_single_page_text() {
    let pdf = make_pdf(&["System X overview. Auth service talks to the DB."]);
    let doc = extract(&pdf, 2);

    assert!(!doc.is_empty());
    assert_eq!(doc.total_pages, 1);
    assert_eq!(doc.pages_processed(), 1);
    assert!(doc.text.contains("System X overview"), "got: {}", doc.text);
    assert_eq!(doc.text, doc.text.trim());
}

#[test]
fn extract_respects_max_pages() {
    let pdf = make_pdf(&["PageOneAlpha", "PageTwoBeta", "PageThreeGamma"]);
    let doc = extract(&pdf, 2);

    assert_eq!(doc.total_pages, 3);
    assert_eq!(doc.pages_processed(), 2);
    assert!(doc.text.contains("PageOneAlpha"));
    assert!(doc.text.contains("PageTwoBeta"));
    assert!(!doc.text.contains("PageThreeGamma"));
}

#[test]
fn extract_zero_page_pdf_is_empty() {
    let pdf = make_pdf(&[]);
    let doc = extract(&pdf, 2);
    assert!(doc.is_empty());
    assert_eq!(doc.pages_processed(), 0);
}

// ── Repository fetching ──────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_collects_key_files_in_traversal_order() {
    skip_unless_git!();

    let repo = init_git_repo(&[
        ("README.md", "# Service\nAn auth service."),
        ("app.py", "import flask\napp = flask.Flask(__name__)"),
        ("docs/notes.txt", "not a key file"),
    ]);
    let reference = RepositoryReference::new(repo.path().to_string_lossy(), None);
    let config = AnalysisConfig::builder().api_key("k").build().unwrap();

    let context = fetch(&reference, &config).await.unwrap();
    match context {
        RepositoryContext::Files(blocks) => {
            assert_eq!(blocks.len(), 2);
            assert_eq!(blocks[0].name, "README.md");
            assert_eq!(blocks[0].content, "# Service\nAn auth service.");
            assert_eq!(blocks[1].name, "app.py");
            assert_eq!(blocks[1].content, "import flask\napp = flask.Flask(__name__)");
        }
        other => panic!("expected Files, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_without_key_files_returns_sentinel() {
    skip_unless_git!();

    let repo = init_git_repo(&[("notes.txt", "nothing relevant")]);
    let reference = RepositoryReference::new(repo.path().to_string_lossy(), None);
    let config = AnalysisConfig::builder().api_key("k").build().unwrap();

    let context = fetch(&reference, &config).await.unwrap();
    assert!(matches!(context, RepositoryContext::NoMatchingFiles));
}

#[tokio::test]
async fn fetch_cleans_up_workspace_on_success_and_failure() {
    skip_unless_git!();

    let parent = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::builder().api_key("k").build().unwrap();

    // Success path
    let repo = init_git_repo(&[("README.md", "# x")]);
    let good = RepositoryReference::new(repo.path().to_string_lossy(), None);
    fetch_in(&good, &config, Some(parent.path())).await.unwrap();
    assert_eq!(
        std::fs::read_dir(parent.path()).unwrap().count(),
        0,
        "clone workspace must not survive a successful fetch"
    );

    // Failure path
    let bad = RepositoryReference::new("/nonexistent/threatforge-test-repo", None);
    let err = fetch_in(&bad, &config, Some(parent.path())).await.unwrap_err();
    assert!(matches!(err, ThreatModelError::CloneFailed { .. }));
    assert_eq!(
        std::fs::read_dir(parent.path()).unwrap().count(),
        0,
        "clone workspace must not survive a failed fetch"
    );
}

#[tokio::test]
async fn fetch_with_malformed_url_fails_before_cloning() {
    // No git needed: the URL is rejected before any process is spawned.
    let reference =
        RepositoryReference::new("github.com/org/repo", Some("token".to_string()));
    let config = AnalysisConfig::builder().api_key("k").build().unwrap();

    let err = fetch(&reference, &config).await.unwrap_err();
    assert!(matches!(err, ThreatModelError::InvalidUrlFormat { .. }));
}

#[tokio::test]
async fn clone_failure_message_never_contains_credential() {
    skip_unless_git!();

    // Unroutable host: the clone fails fast with a transport error that
    // echoes the URL — which carries the credential — into stderr.
    let reference = RepositoryReference::new(
        "https://127.0.0.1:1/org/repo.git",
        Some("ghp_sekrit123".to_string()),
    );
    let config = AnalysisConfig::builder()
        .api_key("k")
        .clone_timeout_secs(60)
        .build()
        .unwrap();

    let err = fetch(&reference, &config).await.unwrap_err();
    match err {
        ThreatModelError::CloneFailed { detail } => {
            assert!(
                !detail.contains("ghp_sekrit123"),
                "credential leaked into error: {detail}"
            );
        }
        other => panic!("expected CloneFailed, got {other:?}"),
    }
}

// ── Scenario C: credential injection ─────────────────────────────────────────

#[test]
fn scenario_c_authenticated_url() {
    let url = threatforge::authenticated_clone_url(
        "https://github.com/org/repo",
        Some("ghp_abc"),
    )
    .unwrap();
    assert_eq!(url, "https://ghp_abc@github.com/org/repo");
}

// ── Scenario A: document only, placeholder context ───────────────────────────

#[tokio::test]
async fn scenario_a_no_repository_uses_placeholder_context() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        .match_body(mockito::Matcher::Regex(
            "No repository context provided".into(),
        ))
        .with_status(200)
        .with_body(gemini_response("## Threat Model\n\nS: ..."))
        .create_async()
        .await;

    let pdf = make_pdf(&["System X overview. Users authenticate via SSO."]);
    let config = config_for(&server);

    let result = analyze(&pdf, None, &config).await.unwrap();
    assert_eq!(result.report, "## Threat Model\n\nS: ...");
    assert_eq!(result.repo_file_count, 0);
    assert!(result.extracted_text.contains("System X overview"));
    mock.assert_async().await;
}

// ── Scenario B: repository context blocks, in order ──────────────────────────

#[tokio::test]
async fn scenario_b_repository_blocks_in_order() {
    skip_unless_git!();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        // README block must precede the app.py block in the instruction.
        .match_body(mockito::Matcher::Regex(
            r"(?s)### README.md.*Flask front end.*### app.py.*import flask".into(),
        ))
        .with_status(200)
        .with_body(gemini_response("report text"))
        .create_async()
        .await;

    let repo = init_git_repo(&[
        ("README.md", "Flask front end for System X"),
        ("app.py", "import flask"),
    ]);
    let reference = RepositoryReference::new(repo.path().to_string_lossy(), None);

    let pdf = make_pdf(&["System X design document."]);
    let config = config_for(&server);

    let result = analyze(&pdf, Some(&reference), &config).await.unwrap();
    assert_eq!(result.report, "report text");
    assert_eq!(result.repo_file_count, 2);
    mock.assert_async().await;
}

// ── Failure ordering: no LLM call on unusable input ──────────────────────────

#[tokio::test]
async fn empty_document_never_reaches_the_llm() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        .expect(0)
        .create_async()
        .await;

    let pdf = make_pdf(&[]); // zero pages — nothing extractable
    let config = config_for(&server);

    let err = analyze(&pdf, None, &config).await.unwrap_err();
    assert!(matches!(err, ThreatModelError::DocumentExtractionFailed));
    mock.assert_async().await;
}

#[tokio::test]
async fn clone_failure_aborts_before_the_llm() {
    skip_unless_git!();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        .expect(0)
        .create_async()
        .await;

    let pdf = make_pdf(&["System X design document."]);
    let reference = RepositoryReference::new("/nonexistent/repo-path", None);
    let config = config_for(&server);

    let err = analyze(&pdf, Some(&reference), &config).await.unwrap_err();
    assert!(matches!(err, ThreatModelError::CloneFailed { .. }));
    mock.assert_async().await;
}

// ── Report artifact ──────────────────────────────────────────────────────────

#[tokio::test]
async fn report_is_written_atomically_to_the_artifact_file() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        .with_status(200)
        .with_body(gemini_response("full report body"))
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("design.pdf");
    std::fs::write(&input, make_pdf(&["System X design."])).unwrap();
    let output = dir.path().join(threatforge::REPORT_FILE_NAME);

    let config = config_for(&server);
    let result = analyze_to_file(&input, &output, None, &config).await.unwrap();

    assert_eq!(result.report, "full report body");
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "full report body");
    // No stray temp file from the atomic write.
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        !names.iter().any(|n| n.ends_with(".tmp")),
        "leftover temp file: {names:?}"
    );
}

// ── LLM failure surface ──────────────────────────────────────────────────────

#[tokio::test]
async fn llm_failure_surfaces_as_generation_failed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock(
            "POST",
            mockito::Matcher::Regex(r":generateContent".into()),
        )
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let pdf = make_pdf(&["System X design."]);
    let config = config_for(&server);

    let err = analyze(&pdf, None, &config).await.unwrap_err();
    match err {
        ThreatModelError::GenerationFailed { detail } => {
            assert!(detail.contains("500"), "got: {detail}");
        }
        other => panic!("expected GenerationFailed, got {other:?}"),
    }
}
