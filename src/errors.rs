//! Typed error hierarchy for the sandctl core.
//!
//! Two enums cover the failure taxonomy with real semantics:
//! - `CacheError` — resume-cache store failures; always fatal, never
//!   silently defaulted
//! - `ResumeError` — resume-request failures; abort the resume command only
//!
//! Side-effect and disambiguation conditions are warnings, not errors, and
//! are reported inline by the orchestrator rather than modelled here.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for an attempt that is terminal for this process but not for
/// the operation: the remote job is still in progress and can be re-attached
/// with `sandctl resume`.
pub const EXIT_DEFERRED: i32 = 68;

/// Errors from the resume-cache store.
///
/// A missing cache file is the legitimate empty store and is not an error;
/// anything else — unreadable, unparseable, unwritable — aborts the command,
/// because an unflushed or untrusted cache breaks the resumability guarantee.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read resume cache at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resume cache at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write resume cache at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from resolving or re-attaching a resume request.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("No resumable sandbox operation found for '{identifier}'")]
    NotFound { identifier: String },

    #[error("No resumable sandbox operations are cached")]
    NothingCached,

    #[error(
        "Cached job {job_id} for sandbox '{sandbox_name}' no longer matches any remote record"
    )]
    Mismatch {
        job_id: String,
        sandbox_name: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
