//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled    |
//! |-------------|---------------------|
//! | `provision` | `Create`, `Refresh` |
//! | `resume`    | `Resume`            |
//! | `list`      | `List`              |

use anyhow::{Context, Result};
use std::path::PathBuf;

use sandctl::orchestrator::{Disposition, OperationOutcome};

use super::Cli;

pub mod list;
pub mod provision;
pub mod resume;

pub use list::cmd_list;
pub use provision::cmd_provision;
pub use resume::cmd_resume;

/// Tool directory: CLI override first, then env/platform resolution.
pub(crate) fn resolve_config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => sandctl::config::tool_dir(),
    }
}

/// Print the final response: JSON on stdout for machine consumers, a short
/// summary block otherwise.
pub(crate) fn emit_response(cli: &Cli, outcome: &OperationOutcome) -> Result<()> {
    let response = &outcome.response;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(response).context("Failed to serialize response")?
        );
        return Ok(());
    }
    if !response.job_id.is_empty() {
        println!("Job:       {}", response.job_id);
    }
    println!("Sandbox:   {}", response.sandbox_name);
    println!(
        "Status:    {} ({}%)",
        response.status, response.progress_percent
    );
    println!(
        "Resumable: {}",
        if response.resumable { "yes" } else { "no" }
    );
    if let Disposition::Deferred { resume_hint } = &outcome.disposition {
        println!();
        println!("The operation is still running. {resume_hint}");
    }
    Ok(())
}
