use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docket_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docket");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    // Passes upload validation; extraction rejects it.
    fs::write(files_dir.join("order.pdf"), b"%PDF-1.4\nnot really a pdf\n").unwrap();
    fs::write(files_dir.join("notes.txt"), "plain text").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/docket.sqlite"

[extraction]
ocr = false

[storage]
backend = "local"
root = "{root}/data/objects"

[server]
bind = "127.0.0.1:5055"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("docket.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docket(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docket_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docket binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn upload_order(tmp: &TempDir, config_path: &Path, license: &str) -> String {
    let file = tmp.path().join("files/order.pdf");
    let (stdout, stderr, success) = run_docket(
        config_path,
        &["upload", file.to_str().unwrap(), "--license", license],
    );
    assert!(success, "upload failed: stdout={}, stderr={}", stdout, stderr);
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("record:"))
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| panic!("no record id in output: {}", stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docket(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/docket.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docket(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docket(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_stores_file_and_lists_record() {
    let (tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let id = upload_order(&tmp, &config_path, "acme");

    let objects: Vec<_> = fs::read_dir(tmp.path().join("data/objects"))
        .unwrap()
        .collect();
    assert_eq!(objects.len(), 1);

    let (stdout, _, success) = run_docket(&config_path, &["documents", "acme"]);
    assert!(success);
    assert!(stdout.contains(&id), "record missing from listing: {}", stdout);
    assert!(stdout.contains("no"), "fresh record should not be indexed");

    let (stdout, _, success) = run_docket(&config_path, &["documents", "other"]);
    assert!(success);
    assert!(stdout.contains("No documents"));
}

#[test]
fn test_upload_rejects_non_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let file = tmp.path().join("files/notes.txt");
    let (_, stderr, success) = run_docket(
        &config_path,
        &["upload", file.to_str().unwrap(), "--license", "acme"],
    );
    assert!(!success);
    assert!(stderr.contains("PDF"), "unexpected error: {}", stderr);
}

#[test]
fn test_update_reports_extraction_failure() {
    let (tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);
    let id = upload_order(&tmp, &config_path, "acme");

    let (_, stderr, success) = run_docket(&config_path, &["update", &id]);
    assert!(!success);
    assert!(stderr.contains("extraction failed"), "unexpected error: {}", stderr);
}

#[test]
fn test_update_unknown_record() {
    let (_tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let (_, stderr, success) = run_docket(&config_path, &["update", "missing"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "unexpected error: {}", stderr);
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let (stdout, stderr, success) = run_docket(&config_path, &["search", "bail", "murder"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_stopwords_only_is_bad_query() {
    let (_tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let (_, stderr, success) = run_docket(&config_path, &["search", "the", "of", "--text"]);
    assert!(!success);
    assert!(stderr.contains("bad query"), "unexpected error: {}", stderr);
}

#[test]
fn test_autocomplete_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_docket(&config_path, &["init"]);

    let (stdout, _, success) = run_docket(&config_path, &["autocomplete", "--sort"]);
    assert!(success);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_docket(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
