// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

/// Path of the binary cargo built for this test run
fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_keyval")
}

/// Helper function to run keyval with given arguments and input via stdin
pub fn run_keyval_with_input(args: &[&str], input: &str) -> (String, String, i32) {
    let mut cmd = Command::new(binary_path())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start keyval");

    if let Some(mut stdin) = cmd.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = cmd.wait_with_output().expect("Failed to read output");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Helper function to run keyval with a temporary file
pub fn run_keyval_with_file(args: &[&str], file_content: &str) -> (String, String, i32) {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(file_content.as_bytes())
        .expect("Failed to write to temp file");

    let mut full_args = args.to_vec();
    full_args.push(temp_file.path().to_str().unwrap());

    let cmd = Command::new(binary_path())
        .args(&full_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute keyval");

    (
        String::from_utf8_lossy(&cmd.stdout).to_string(),
        String::from_utf8_lossy(&cmd.stderr).to_string(),
        cmd.status.code().unwrap_or(-1),
    )
}

/// Helper function to run keyval with multiple files
pub fn run_keyval_with_files(args: &[&str], files: &[&str]) -> (String, String, i32) {
    let mut full_args = args.to_vec();
    full_args.extend(files);

    let output = Command::new(binary_path())
        .args(&full_args)
        .output()
        .expect("Failed to execute keyval");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Parse every stdout line as a JSON event
pub fn parse_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Output line should be valid JSON"))
        .collect()
}

/// Helper to extract the output count from the `--stats` line on stderr
pub fn extract_output_from_stats(stderr: &str) -> i32 {
    for line in stderr.lines() {
        if let Some(rest) = line.split("Lines processed:").nth(1) {
            // "Lines processed: X total, Y output, Z filtered"
            if let Some(output_part) = rest.split(", ").nth(1) {
                if let Some(num) = output_part.split(" output").next() {
                    return num.trim().parse().unwrap_or(0);
                }
            }
        }
    }
    0
}
