//! Lifecycle notifications and the injected collaborator traits.
//!
//! The orchestrator never polls and never talks to the network itself: it
//! subscribes to a [`NotificationSource`] owned by the surrounding
//! provisioning driver and, during resume, asks a [`JobResolver`] for the
//! current snapshot of one job. Both are traits so tests can substitute a
//! deterministic [`ScriptedSource`].

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::VecDeque;

use crate::job::{AuthResult, JobCandidate, JobSnapshot};

/// One notification from the provisioning driver.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A fresh remote snapshot. `remaining_secs` is the local wait budget
    /// left, for display only; the orchestrator does not own timing.
    Status {
        snapshot: JobSnapshot,
        remaining_secs: u64,
    },
    /// The sandbox user authenticated; the final result has not arrived yet.
    Auth(AuthResult),
    /// Confirmed terminal success.
    Result {
        snapshot: JobSnapshot,
        auth: AuthResult,
    },
    /// The driver is handing the still-running job back to the user. The
    /// snapshot is optional: an async submission may detach before the
    /// first status ever arrives, and that no-payload case is a first-class
    /// branch, not an incidental null.
    AsyncResult { snapshot: Option<JobSnapshot> },
    /// The driver's local wait budget expired. Not evidence of remote
    /// failure — the job may well still be running.
    Timeout,
    /// More than one remote job matched the logical request.
    MultipleMatches { candidates: Vec<JobCandidate> },
}

/// Externally-owned stream of lifecycle notifications.
#[async_trait]
pub trait NotificationSource: Send {
    /// Next notification, or `None` when the driver has closed the stream.
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>>;
}

/// Synchronous snapshot lookup used during resume re-attachment.
#[async_trait]
pub trait JobResolver: Send {
    async fn resolve(&mut self, job_id: &str) -> Result<Option<JobSnapshot>>;
}

/// A pre-scripted source for deterministic runs: events and resolver
/// replies are drained in order.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    events: VecDeque<LifecycleEvent>,
    resolved: VecDeque<Option<JobSnapshot>>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = LifecycleEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            resolved: VecDeque::new(),
        }
    }

    /// Queue a reply for the next [`JobResolver::resolve`] call.
    pub fn with_resolved(mut self, snapshot: Option<JobSnapshot>) -> Self {
        self.resolved.push_back(snapshot);
        self
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>> {
        Ok(self.events.pop_front())
    }
}

#[async_trait]
impl JobResolver for ScriptedSource {
    async fn resolve(&mut self, job_id: &str) -> Result<Option<JobSnapshot>> {
        match self.resolved.pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("No scripted resolver reply for job {job_id}"),
        }
    }
}
