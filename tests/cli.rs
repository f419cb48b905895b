//! End-to-end checks of the `sleuth` binary that need no network access.

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn sleuth() -> Command {
    let mut cmd = Command::cargo_bin("sleuth").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("SLEUTH_API_KEY")
        .env_remove("BOCHA_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("GOOGLE_CX")
        .env_remove("SLEUTH_SEARCH_PROVIDER")
        .env_remove("SLEUTH_PROXY");
    cmd
}

#[test]
fn help_lists_commands() {
    sleuth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn search_with_unknown_provider_reports_as_text() {
    sleuth()
        .args(["--provider", "altavista", "search", "capital of France"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown search provider `altavista`"));
}

#[test]
fn keyed_search_without_key_reports_missing_credential() {
    sleuth()
        .args(["--provider", "bocha", "search", "rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing credential: BOCHA_API_KEY"));
}

#[test]
fn custom_search_json_output() {
    sleuth()
        .args(["--format", "json", "--provider", "google", "search", "rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provider\": \"Google\""))
        .stdout(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn ask_without_api_key_fails() {
    sleuth()
        .args(["ask", "What is the capital of France?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Agent configuration error"));
}

#[test]
fn ask_requires_a_question() {
    sleuth().arg("ask").assert().failure();
}

#[test]
fn init_prompts_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    sleuth()
        .arg("init-prompts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 prompt template(s)"));
    assert!(dir.path().join("system.md").exists());

    sleuth()
        .arg("init-prompts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn unknown_format_fails() {
    let dir = tempfile::tempdir().unwrap();
    sleuth()
        .args(["--format", "yaml", "init-prompts"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("yaml"));
}
