//! Remote job snapshots and the open status vocabulary.
//!
//! A [`JobSnapshot`] is the latest remote-side view of one provisioning job.
//! Snapshots are superseded wholesale by each notification — fields are never
//! merged individually. Status strings are deliberately kept as strings, not
//! an enum: create and refresh workflows report different vocabularies and
//! the remote side is free to introduce stage names this client has never
//! seen. The helpers below classify only the statuses with special handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a remote provisioning job's reported state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Remote job id (e.g. "0GR4x0000004CyhGAE")
    pub job_id: String,
    /// Logical sandbox name the job is provisioning
    pub sandbox_name: String,
    /// Raw remote status string; doubles as the stage name for display
    pub status: String,
    #[serde(default)]
    pub progress_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
}

/// Authentication outcome delivered by the sign-in collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Username the sandbox user was authenticated as
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

/// One of several remote jobs matching the same logical request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCandidate {
    pub job_id: String,
    pub sandbox_name: String,
    pub status: String,
}

/// True when the remote side considers the sandbox fully provisioned.
///
/// This is *not* the end of the client-side attempt: a sign-in step still
/// follows, so the projector maps this status onto the authenticating stage
/// rather than showing the operation as complete.
pub fn is_provisioned(status: &str) -> bool {
    status.eq_ignore_ascii_case("Completed")
}

/// True when the remote status is terminal and unsuccessful.
pub fn is_failure(status: &str) -> bool {
    ["Failed", "Error", "Deleted"]
        .iter()
        .any(|s| status.eq_ignore_ascii_case(s))
}
