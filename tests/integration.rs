use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn expertagent_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("expertagent");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/expertagent.sqlite"

[server]
bind = "127.0.0.1:8731"

[completion]
provider = "disabled"

[chat]
resource_limit = 3
"#,
        root.display()
    );

    let config_path = config_dir.join("expertagent.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_expertagent(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = expertagent_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run expertagent binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_expertagent(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_expertagent(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_expertagent(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_seed_then_reseed() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    let (stdout, stderr, success) = run_expertagent(&config_path, &["seed"]);
    assert!(success, "seed failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Seeded 2 learning resources."));

    let (stdout, _, success) = run_expertagent(&config_path, &["seed"]);
    assert!(success);
    assert!(stdout.contains("nothing seeded"));
}

#[test]
fn test_resources_lists_catalog() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    run_expertagent(&config_path, &["seed"]);

    let (stdout, _, success) = run_expertagent(&config_path, &["resources"]);
    assert!(success);
    assert!(stdout.contains("Binary Search Tutorial (beginner | https://example.com/binary-search)"));
    assert!(stdout.contains("Pointer Introduction"));
}

#[test]
fn test_rank_orders_by_score() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    run_expertagent(&config_path, &["seed"]);

    let (stdout, stderr, success) = run_expertagent(&config_path, &["rank", "binary", "search"]);
    assert!(success, "rank failed: stdout={}, stderr={}", stdout, stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("1. [4] Binary Search Tutorial"));
    assert!(lines[1].starts_with("2. [1] Pointer Introduction"));
}

#[test]
fn test_rank_respects_limit() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    run_expertagent(&config_path, &["seed"]);

    // A single "pointers" ties both samples at 2 and catalog order wins.
    let (stdout, _, success) =
        run_expertagent(&config_path, &["rank", "pointers", "--limit", "1"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("1. [2] Binary Search Tutorial"));

    // Repeating the keyword breaks the tie in favour of the pointer resource.
    let (stdout, _, success) =
        run_expertagent(&config_path, &["rank", "pointers", "pointers", "--limit", "1"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("1. [3] Pointer Introduction"));
}

#[test]
fn test_rank_empty_catalog() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    let (stdout, _, success) = run_expertagent(&config_path, &["rank", "anything"]);
    assert!(success);
    assert!(stdout.contains("No resources."));
}

#[test]
fn test_chat_with_disabled_provider_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_expertagent(&config_path, &["init"]);
    let (_, stderr, success) = run_expertagent(&config_path, &["chat", "hello"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_expertagent(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
