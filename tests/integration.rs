use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn skinrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("skinrag");
    path
}

/// Temp workspace with a config pointing at `Data/` and an unreachable
/// Ollama endpoint, so nothing leaves the machine.
fn setup_test_env(with_documents: bool) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("Data");
    fs::create_dir_all(&docs_dir).unwrap();
    if with_documents {
        fs::write(
            docs_dir.join("acne.md"),
            "# Acne\n\nSalicylic acid unclogs pores.\n\nBenzoyl peroxide reduces bacteria.",
        )
        .unwrap();
        fs::write(
            docs_dir.join("dry_skin.txt"),
            "Dry skin benefits from ceramides and gentle cleansers.",
        )
        .unwrap();
        fs::write(docs_dir.join("notes.csv"), "not,indexed").unwrap();
    }

    let config_content = format!(
        r#"[documents]
root = "{root}/Data"

[index]
backend = "file"
path = "{root}/data/index"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 8
url = "http://127.0.0.1:9"
max_retries = 0
timeout_secs = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("skinrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_skinrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = skinrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run skinrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help_lists_commands() {
    let output = Command::new(skinrag_binary())
        .arg("--help")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for command in ["index", "status", "search", "recommend", "serve"] {
        assert!(stdout.contains(command), "missing {} in help:\n{}", command, stdout);
    }
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_skinrag(&tmp.path().join("nope.toml"), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_fails_validation() {
    let (_tmp, config_path) = setup_test_env(false);
    fs::write(&config_path, "[chunking]\nmax_chars = 100\noverlap_chars = 100\n").unwrap();
    let (_, stderr, success) = run_skinrag(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("overlap_chars"), "stderr: {}", stderr);
}

#[test]
fn test_status_without_index() {
    let (_tmp, config_path) = setup_test_env(true);
    let (stdout, _, success) = run_skinrag(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("No index at"), "stdout: {}", stdout);
}

#[test]
fn test_index_dry_run_counts_documents() {
    let (tmp, config_path) = setup_test_env(true);
    let (stdout, stderr, success) = run_skinrag(&config_path, &["index", "--dry-run"]);
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("documents: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("chunks: 2"), "stdout: {}", stdout);
    assert!(!tmp.path().join("data/index").exists());
}

#[test]
fn test_index_empty_corpus_fails() {
    let (_tmp, config_path) = setup_test_env(false);
    let (_, stderr, success) = run_skinrag(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("empty corpus"), "stderr: {}", stderr);
}

#[test]
fn test_index_with_unreachable_embedder_fails_cleanly() {
    let (tmp, config_path) = setup_test_env(true);
    let (_, stderr, success) = run_skinrag(&config_path, &["index", "--force"]);
    assert!(!success);
    assert!(stderr.contains("embedding failed"), "stderr: {}", stderr);
    assert!(!tmp.path().join("data/index").exists());
}

#[test]
fn test_search_requires_index() {
    let (_tmp, config_path) = setup_test_env(true);
    let (_, stderr, success) = run_skinrag(&config_path, &["search", "acne"]);
    assert!(!success);
    assert!(stderr.contains("run `skinrag index` first"), "stderr: {}", stderr);
}

#[test]
fn test_recommend_requires_skin_type() {
    let (_tmp, config_path) = setup_test_env(true);
    let (_, stderr, success) = run_skinrag(&config_path, &["recommend", "--concern", "acne"]);
    assert!(!success);
    assert!(stderr.contains("--skin-type is required"), "stderr: {}", stderr);
}

#[test]
fn test_recommend_rejects_unknown_concern() {
    let (_tmp, config_path) = setup_test_env(true);
    let (_, stderr, success) = run_skinrag(
        &config_path,
        &["recommend", "--skin-type", "oily", "--concern", "freckles"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown skin concern"), "stderr: {}", stderr);
}
