//! Projection of raw remote snapshots onto tracker transitions.
//!
//! One snapshot in, exactly one transition out, plus the human-readable
//! message for the renderer. The projector also decides whether the
//! snapshot belongs in the resume cache: advancing statuses do, failures
//! do not (the entry keeps its last good snapshot).

use crate::job::{self, JobSnapshot};
use crate::request::SandboxAction;
use crate::stage::tracker::StageState;

/// Synthetic stage for the sign-in step that follows remote provisioning.
/// Remote vocabularies never report it; the projector and orchestrator
/// introduce it themselves.
pub const AUTHENTICATING_STAGE: &str = "Authenticating";

/// Stage vocabulary the create workflow is expected to report, in order.
const CREATE_STAGES: &[&str] = &["Pending", "Processing", "Activating", AUTHENTICATING_STAGE];

/// Refresh jobs tear down the previous sandbox before provisioning anew,
/// so their expected vocabulary differs from create's.
const REFRESH_STAGES: &[&str] = &[
    "Pending",
    "Deleting Previous",
    "Processing",
    "Activating",
    AUTHENTICATING_STAGE,
];

/// Result of projecting one remote snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Normal forward progress: transition to `stage` with `state`, show
    /// `message`, and record the snapshot in the resume cache.
    Advance {
        stage: String,
        state: StageState,
        message: String,
    },
    /// Terminal remote failure: the current stage fails, the attempt
    /// aborts, and the cache keeps its last good snapshot.
    Failure { message: String },
}

/// Maps remote-status snapshots onto stage transitions for one action kind.
#[derive(Debug, Clone, Copy)]
pub struct StatusProjector {
    action: SandboxAction,
}

impl StatusProjector {
    pub fn new(action: SandboxAction) -> Self {
        Self { action }
    }

    /// Stage names expected for this action, used to seed the tracker.
    pub fn seed_stages(&self) -> &'static [&'static str] {
        match self.action {
            SandboxAction::Create => CREATE_STAGES,
            SandboxAction::Refresh => REFRESH_STAGES,
        }
    }

    /// Project one snapshot. `remaining_secs` is the local wait budget left,
    /// passed through for display only; zero suppresses the timeout
    /// fragment entirely.
    pub fn project(&self, snapshot: &JobSnapshot, remaining_secs: u64) -> Projection {
        if job::is_failure(&snapshot.status) {
            return Projection::Failure {
                message: format!(
                    "Sandbox '{}' provisioning failed with remote status {}",
                    snapshot.sandbox_name, snapshot.status
                ),
            };
        }

        // A fully provisioned sandbox is not done from the client's point of
        // view: sign-in still follows, so show the authenticating stage.
        let stage = if job::is_provisioned(&snapshot.status) {
            AUTHENTICATING_STAGE.to_string()
        } else {
            snapshot.status.clone()
        };

        Projection::Advance {
            message: self.format_message(snapshot, &stage, remaining_secs),
            stage,
            state: StageState::InProgress,
        }
    }

    fn format_message(&self, snapshot: &JobSnapshot, stage: &str, remaining_secs: u64) -> String {
        let base = format!(
            "Sandbox '{}' ({}% complete) is {}",
            snapshot.sandbox_name, snapshot.progress_percent, stage
        );
        if remaining_secs == 0 {
            return base;
        }
        format!(
            "{}. Waiting {} more before timing out",
            base,
            format_secs(remaining_secs)
        )
    }
}

/// Format a second count as `Xs` or `Xm Ys` when >= 60 seconds.
fn format_secs(secs: u64) -> String {
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
