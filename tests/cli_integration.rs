//! CLI integration tests
//!
//! Tests the command-line interface end-to-end: each run toggles the target
//! file between plaintext and the encrypted envelope.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Get path to the relock binary
fn relock_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps/
    path.push("relock");
    path
}

/// Run relock with an explicit key argument
fn run_relock_with_key(file: &str, key: &str) -> Result<std::process::Output, std::io::Error> {
    Command::new(relock_bin())
        .args(["-k", key, file])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
}

/// Run relock with the key piped via stdin
fn run_relock_with_stdin_key(
    file: &str,
    key: &str,
) -> Result<std::process::Output, std::io::Error> {
    let mut child = Command::new(relock_bin())
        .args(["--key-stdin", file])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(key.as_bytes());
    }

    child.wait_with_output()
}

#[test]
fn test_toggle_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("hello.txt");
    fs::write(&file, "hello").unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert!(String::from_utf8_lossy(&result.stdout).contains("Encrypted hello.txt"));

    let encrypted = fs::read(&file).unwrap();
    assert!(encrypted.starts_with(b"relock1\n"));

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert!(String::from_utf8_lossy(&result.stdout).contains("Decrypted hello.txt"));

    assert_eq!(fs::read(&file).unwrap(), b"hello");
}

#[test]
fn test_key_via_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("stdin.txt");
    fs::write(&file, "stdin keyed content").unwrap();

    let result = run_relock_with_stdin_key(file.to_str().unwrap(), "piped key\n").unwrap();
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    // Explicit key equal to the piped key (sans newline) decrypts.
    let result = run_relock_with_key(file.to_str().unwrap(), "piped key").unwrap();
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(fs::read(&file).unwrap(), b"stdin keyed content");
}

#[test]
fn test_wrong_key_fails_and_preserves_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("secret.txt");
    fs::write(&file, "secret").unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "correct_key").unwrap();
    assert!(result.status.success());

    let encrypted = fs::read(&file).unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "wrong_key").unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("wrong key") || stderr.contains("tampered"),
        "Expected authentication error message, got: {}",
        stderr
    );

    assert_eq!(fs::read(&file).unwrap(), encrypted);
}

#[test]
fn test_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nonexistent.txt");

    let result = run_relock_with_key(missing.to_str().unwrap(), "k1").unwrap();

    assert!(!result.status.success());
    assert!(!missing.exists());
}

#[test]
fn test_empty_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("data.txt");
    fs::write(&file, "data").unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "").unwrap();

    assert!(!result.status.success());
    assert_eq!(fs::read(&file).unwrap(), b"data");
}

#[test]
fn test_empty_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("empty.txt");
    fs::write(&file, b"").unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(result.status.success());
    assert_ne!(fs::read(&file).unwrap(), b"");

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(result.status.success());
    assert_eq!(fs::read(&file).unwrap(), b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("large.bin");

    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&file, &large_content).unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(result.status.success());

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();
    assert!(result.status.success());

    assert_eq!(fs::read(&file).unwrap(), large_content);
}

#[test]
fn test_plaintext_containing_magic_fails_cleanly() {
    // Containment-based detection means plaintext mentioning the magic token
    // is taken for an envelope; decryption fails and the file is untouched.
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("notes.txt");
    let contents = "notes about the relock1 format\nmore notes";
    fs::write(&file, contents).unwrap();

    let result = run_relock_with_key(file.to_str().unwrap(), "k1").unwrap();

    assert!(!result.status.success());
    assert_eq!(fs::read(&file).unwrap(), contents.as_bytes());
}
