//! Integration tests for sandctl
//!
//! Each test drives the real binary with a scripted JSON-lines event feed
//! on stdin and an isolated tool directory, then asserts on exit codes,
//! printed responses, and the on-disk cache lifecycle.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a sandctl Command with an isolated tool directory
fn sandctl(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("sandctl");
    cmd.env("SANDCTL_CONFIG_DIR", dir.path());
    cmd
}

fn status_line(name: &str, status: &str, pct: u8) -> String {
    format!(
        r#"{{"kind":"status","snapshot":{{"jobId":"0GR000001","sandboxName":"{name}","status":"{status}","progressPercent":{pct}}},"remainingSecs":600}}"#
    )
}

fn result_line(name: &str) -> String {
    format!(
        r#"{{"kind":"result","snapshot":{{"jobId":"0GR000001","sandboxName":"{name}","status":"Completed","progressPercent":100}},"auth":{{"username":"admin@example.com.{name}"}}}}"#
    )
}

fn resolved_line(name: &str, job_id: &str) -> String {
    format!(
        r#"{{"kind":"resolved","snapshot":{{"jobId":"{job_id}","sandboxName":"{name}","status":"Activating","progressPercent":80}}}}"#
    )
}

fn cache_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("sandbox-process.json")
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_sandctl_help() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir).arg("--help").assert().success();
    }

    #[test]
    fn test_sandctl_version() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_list_empty_store() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "No resumable sandbox operations found",
            ));
    }

    #[test]
    fn test_refresh_requires_a_name() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir)
            .arg("refresh")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Refresh requires a sandbox name"));
    }

    #[test]
    fn test_create_requires_a_target_org() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No production org specified"));
    }
}

// =============================================================================
// Provisioning Lifecycle Tests
// =============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_create_completes_and_clears_cache() {
        let dir = TempDir::new().unwrap();
        let feed = [
            status_line("dev1", "Pending", 5),
            status_line("dev1", "Processing", 40),
            result_line("dev1"),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .success()
            .stdout(predicate::str::contains("Status:    Completed (100%)"))
            .stdout(predicate::str::contains("Resumable: no"));

        // Confirmed terminal success leaves nothing to resume.
        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(!cache.contains("dev1"));
    }

    #[test]
    fn test_timeout_exits_deferred_and_retains_cache() {
        let dir = TempDir::new().unwrap();
        let feed = [
            status_line("dev1", "Processing", 40),
            r#"{"kind":"timeout"}"#.to_string(),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .code(68)
            .stdout(predicate::str::contains("Resumable: yes"))
            .stdout(predicate::str::contains("sandctl resume dev1"));

        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(cache.contains("dev1"));
        assert!(cache.contains("Processing"));
    }

    #[test]
    fn test_async_result_without_snapshot_exits_deferred() {
        let dir = TempDir::new().unwrap();
        let feed = [
            status_line("dev1", "Pending", 5),
            r#"{"kind":"asyncResult"}"#.to_string(),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .code(68)
            .stdout(predicate::str::contains("The operation is still running"));
    }

    #[test]
    fn test_failed_status_exits_one_and_keeps_last_good_snapshot() {
        let dir = TempDir::new().unwrap();
        let feed = [
            status_line("dev1", "Processing", 40),
            status_line("dev1", "Failed", 40),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Status:    Failed"));

        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(cache.contains("Processing"), "cache keeps the last good snapshot");
    }

    #[test]
    fn test_json_output_is_machine_readable() {
        let dir = TempDir::new().unwrap();
        let feed = [status_line("dev1", "Pending", 5), result_line("dev1")].join("\n");

        let assert = sandctl(&dir)
            .arg("--json")
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .success();

        let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(response["jobId"], "0GR000001");
        assert_eq!(response["sandboxName"], "dev1");
        assert_eq!(response["resumable"], false);
    }

    #[test]
    fn test_completion_side_effects_land_in_config() {
        let dir = TempDir::new().unwrap();
        let feed = [status_line("dev1", "Processing", 40), result_line("dev1")].join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .arg("--alias")
            .arg("dev")
            .arg("--set-default")
            .write_stdin(feed)
            .assert()
            .success();

        let config = fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(config.contains("\"dev\""));
        assert!(config.contains("admin@example.com.dev1"));
    }
}

// =============================================================================
// Resume Tests
// =============================================================================

mod resume {
    use super::*;

    /// Drive a create to the deferred state so the cache holds an entry.
    fn seed_deferred(dir: &TempDir, name: &str) {
        let feed = [
            status_line(name, "Processing", 40),
            r#"{"kind":"timeout"}"#.to_string(),
        ]
        .join("\n");
        sandctl(dir)
            .arg("create")
            .arg("--name")
            .arg(name)
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .code(68);
    }

    #[test]
    fn test_resume_unknown_key_fails_distinctly() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir)
            .arg("resume")
            .arg("unknown-key")
            .write_stdin("")
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "No resumable sandbox operation found for 'unknown-key'",
            ));
    }

    #[test]
    fn test_resume_most_recent_with_empty_store_fails() {
        let dir = TempDir::new().unwrap();
        sandctl(&dir)
            .arg("resume")
            .write_stdin("")
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "No resumable sandbox operations are cached",
            ));
    }

    #[test]
    fn test_resume_mismatch_leaves_cache_intact() {
        let dir = TempDir::new().unwrap();
        seed_deferred(&dir, "dev1");

        // The remote record now has a different job id.
        sandctl(&dir)
            .arg("resume")
            .arg("dev1")
            .write_stdin(resolved_line("dev1", "0GR-other"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no longer matches"));

        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(cache.contains("dev1"), "mismatch must not clear the entry");
    }

    #[test]
    fn test_timeout_then_resume_completes_across_invocations() {
        let dir = TempDir::new().unwrap();
        seed_deferred(&dir, "dev1");

        sandctl(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("dev1"))
            .stdout(predicate::str::contains("Processing"));

        let feed = [
            resolved_line("dev1", "0GR000001"),
            status_line("dev1", "Activating", 90),
            result_line("dev1"),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("resume")
            .arg("dev1")
            .write_stdin(feed)
            .assert()
            .success()
            .stdout(predicate::str::contains("Status:    Completed (100%)"));

        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(!cache.contains("dev1"));
    }

    #[test]
    fn test_resume_most_recent_picks_latest_write() {
        let dir = TempDir::new().unwrap();
        seed_deferred(&dir, "older");
        seed_deferred(&dir, "newer");

        let feed = [
            resolved_line("newer", "0GR000001"),
            result_line("newer"),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("resume")
            .write_stdin(feed)
            .assert()
            .success()
            .stdout(predicate::str::contains("Sandbox:   newer"));

        // Only the resumed entry is cleared.
        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(cache.contains("older"));
        assert!(!cache.contains("newer"));
    }
}

// =============================================================================
// Cache Failure Tests
// =============================================================================

mod cache_failures {
    use super::*;

    #[test]
    fn test_corrupt_cache_is_fatal_not_defaulted() {
        let dir = TempDir::new().unwrap();
        fs::write(cache_path(&dir), "{ not json").unwrap();

        sandctl(&dir)
            .arg("list")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("corrupt"));
    }

    #[test]
    fn test_corrupt_cache_blocks_new_operations() {
        let dir = TempDir::new().unwrap();
        fs::write(cache_path(&dir), "{ not json").unwrap();

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("dev1")
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(status_line("dev1", "Pending", 5))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("corrupt"));
    }
}

// =============================================================================
// Definition File Tests
// =============================================================================

mod definition_files {
    use super::*;

    #[test]
    fn test_definition_file_supplies_name_and_license() {
        let dir = TempDir::new().unwrap();
        let def = dir.path().join("sandbox-def.toml");
        fs::write(
            &def,
            "SandboxName = \"qa2\"\nlicense_type = \"Full\"\n",
        )
        .unwrap();

        let feed = [status_line("qa2", "Pending", 5), result_line("qa2")].join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--definition-file")
            .arg(&def)
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .success()
            .stdout(predicate::str::contains("Sandbox:   qa2"));
    }

    #[test]
    fn test_cli_name_overrides_definition_file() {
        let dir = TempDir::new().unwrap();
        let def = dir.path().join("sandbox-def.toml");
        fs::write(&def, "SandboxName = \"from-file\"\n").unwrap();

        let feed = [
            status_line("from-cli", "Processing", 40),
            r#"{"kind":"timeout"}"#.to_string(),
        ]
        .join("\n");

        sandctl(&dir)
            .arg("create")
            .arg("--name")
            .arg("from-cli")
            .arg("--definition-file")
            .arg(&def)
            .arg("--target-org")
            .arg("admin@example.com")
            .write_stdin(feed)
            .assert()
            .code(68);

        // The cache key is the CLI-supplied name, not the file's.
        let cache = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(cache.contains("from-cli"));
        assert!(!cache.contains("from-file"));
    }
}
