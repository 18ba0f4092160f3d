//! The operation orchestrator.
//!
//! Wires an injected notification source to the stage tracker and the
//! resume cache: every status snapshot becomes one tracker transition and
//! one synchronous cache write; terminal results apply the completion side
//! effects and clear the cache; deferred and timed-out attempts leave the
//! cache intact so a later invocation can resume. All mutations happen
//! synchronously inside the event handler — there is no internal locking
//! and no polling here.

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::warn;

use crate::cache::{ResumeCache, ResumeCacheEntry, UserPreferences};
use crate::config::CompletionEffects;
use crate::errors::{EXIT_DEFERRED, ResumeError};
use crate::job::{AuthResult, JobCandidate, JobSnapshot};
use crate::orchestrator::events::{JobResolver, LifecycleEvent, NotificationSource};
use crate::request::{SandboxAction, SandboxRequest};
use crate::stage::{
    AUTHENTICATING_STAGE, Projection, StageState, StageTracker, StatusProjector,
};
use crate::ui::StageRenderer;

/// Final response surfaced to the command layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub job_id: String,
    pub sandbox_name: String,
    pub status: String,
    pub progress_percent: u8,
    pub resumable: bool,
}

/// How the attempt ended, for this process.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Confirmed terminal success; the cache entry is gone.
    Completed,
    /// Terminal for this process only; the remote job may still be running
    /// and the cache entry was kept.
    Deferred { resume_hint: String },
    /// Terminal remote failure; the cache keeps its last good snapshot.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub response: OperationResponse,
    pub disposition: Disposition,
}

impl OperationOutcome {
    /// Exit-code contract: success 0, deferred/timeout a fixed non-zero
    /// code meaning "still in progress, use resume", failure 1.
    pub fn exit_code(&self) -> i32 {
        match &self.disposition {
            Disposition::Completed => 0,
            Disposition::Deferred { .. } => EXIT_DEFERRED,
            Disposition::Failed { .. } => 1,
        }
    }
}

/// Which cache entry a resume request addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeTarget {
    Name(String),
    MostRecent,
}

/// In-memory state of one attempt. Never persisted — only cache entries
/// survive the process.
struct Attempt {
    projector: StatusProjector,
    tracker: StageTracker,
    key: String,
    action: SandboxAction,
    prod_org_username: String,
    request: SandboxRequest,
    prefs: UserPreferences,
    last_snapshot: Option<JobSnapshot>,
    authenticated: Option<AuthResult>,
}

impl Attempt {
    fn new(
        action: SandboxAction,
        request: SandboxRequest,
        prod_org_username: String,
        prefs: UserPreferences,
    ) -> Self {
        let projector = StatusProjector::new(action);
        let tracker = StageTracker::new(projector.seed_stages());
        Self {
            projector,
            tracker,
            key: request.sandbox_name.clone(),
            action,
            prod_org_username,
            request,
            prefs,
            last_snapshot: None,
            authenticated: None,
        }
    }

    fn entry_with(&self, job: JobSnapshot) -> ResumeCacheEntry {
        ResumeCacheEntry {
            sandbox_name: self.key.clone(),
            prod_org_username: self.prod_org_username.clone(),
            action: self.action,
            job,
            request: self.request.clone(),
            prefs: self.prefs.clone(),
        }
    }

    fn response(&self, resumable: bool) -> OperationResponse {
        match &self.last_snapshot {
            Some(s) => OperationResponse {
                job_id: s.job_id.clone(),
                sandbox_name: s.sandbox_name.clone(),
                status: s.status.clone(),
                progress_percent: s.progress_percent,
                resumable,
            },
            None => OperationResponse {
                job_id: String::new(),
                sandbox_name: self.key.clone(),
                status: "Pending".to_string(),
                progress_percent: 0,
                resumable,
            },
        }
    }

    fn resume_hint(&self) -> String {
        format!("Run \"sandctl resume {}\" to re-attach to the running job.", self.key)
    }
}

/// Drives one attempt from notifications to a terminal outcome.
pub struct Orchestrator<'a> {
    cache: &'a mut ResumeCache,
    effects: &'a mut dyn CompletionEffects,
    ui: &'a StageRenderer,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        cache: &'a mut ResumeCache,
        effects: &'a mut dyn CompletionEffects,
        ui: &'a StageRenderer,
    ) -> Self {
        Self { cache, effects, ui }
    }

    /// Start a new attempt and consume the notification stream until a
    /// terminal outcome.
    pub async fn start<S: NotificationSource>(
        &mut self,
        request: SandboxRequest,
        action: SandboxAction,
        prod_org_username: &str,
        prefs: UserPreferences,
        source: &mut S,
    ) -> Result<OperationOutcome> {
        let mut attempt = Attempt::new(action, request, prod_org_username.to_string(), prefs);
        self.ui.render(
            &attempt.tracker.snapshot(),
            &format!(
                "Waiting for the {} job for sandbox '{}' to report progress",
                attempt.action, attempt.key
            ),
        );
        self.drive(&mut attempt, source).await
    }

    /// Re-attach to a cached attempt.
    ///
    /// The cached job must still exist remotely with the exact same id and
    /// name; anything else is a mismatch and the cache entry is left
    /// untouched so the operator can retry or intervene manually. A missing
    /// entry is an error — a resume never fabricates a request.
    pub async fn resume<S>(
        &mut self,
        target: ResumeTarget,
        source: &mut S,
    ) -> Result<OperationOutcome, ResumeError>
    where
        S: NotificationSource + JobResolver,
    {
        let entry = match &target {
            ResumeTarget::Name(name) => {
                self.cache
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ResumeError::NotFound {
                        identifier: name.clone(),
                    })?
            }
            ResumeTarget::MostRecent => self
                .cache
                .most_recent()
                .map(|(_, entry)| entry.clone())
                .ok_or(ResumeError::NothingCached)?,
        };

        let resolved = source
            .resolve(&entry.job.job_id)
            .await
            .map_err(ResumeError::Other)?;
        let resolved = match resolved {
            Some(s) if s.job_id == entry.job.job_id && s.sandbox_name == entry.job.sandbox_name => {
                s
            }
            _ => {
                return Err(ResumeError::Mismatch {
                    job_id: entry.job.job_id.clone(),
                    sandbox_name: entry.job.sandbox_name.clone(),
                });
            }
        };

        let mut attempt = Attempt::new(
            entry.action,
            entry.request.clone(),
            entry.prod_org_username.clone(),
            entry.prefs.clone(),
        );
        if let Some(outcome) = self
            .apply_snapshot(&mut attempt, resolved, 0, true)
            .map_err(ResumeError::Other)?
        {
            self.ui.finish();
            return Ok(outcome);
        }
        self.drive(&mut attempt, source)
            .await
            .map_err(ResumeError::Other)
    }

    async fn drive<S: NotificationSource>(
        &mut self,
        attempt: &mut Attempt,
        source: &mut S,
    ) -> Result<OperationOutcome> {
        while let Some(event) = source.next_event().await? {
            match event {
                LifecycleEvent::Status {
                    snapshot,
                    remaining_secs,
                } => {
                    if let Some(outcome) =
                        self.apply_snapshot(attempt, snapshot, remaining_secs, false)?
                    {
                        self.ui.finish();
                        return Ok(outcome);
                    }
                }
                LifecycleEvent::Auth(auth) => {
                    // No cache write: nothing durable to persist for sign-in.
                    attempt
                        .tracker
                        .transition(AUTHENTICATING_STAGE, StageState::InProgress);
                    self.ui.render(
                        &attempt.tracker.snapshot(),
                        &format!(
                            "Authenticating to sandbox '{}' as {}",
                            attempt.key, auth.username
                        ),
                    );
                    attempt.authenticated = Some(auth);
                }
                LifecycleEvent::Result { snapshot, auth } => {
                    let outcome = self.complete(attempt, snapshot, auth)?;
                    self.ui.finish();
                    return Ok(outcome);
                }
                LifecycleEvent::AsyncResult { snapshot } => {
                    if let Some(snapshot) = snapshot
                        && let Some(outcome) = self.apply_snapshot(attempt, snapshot, 0, false)?
                    {
                        self.ui.finish();
                        return Ok(outcome);
                    }
                    let outcome = self.defer(
                        attempt,
                        "The provisioning job is still running and has been handed back to you.",
                    );
                    self.ui.finish();
                    return Ok(outcome);
                }
                LifecycleEvent::Timeout => {
                    let outcome = self.defer(
                        attempt,
                        "The local wait budget expired; the remote job may still be running.",
                    );
                    self.ui.finish();
                    return Ok(outcome);
                }
                LifecycleEvent::MultipleMatches { candidates } => {
                    self.report_duplicates(attempt, &candidates);
                }
            }
        }
        bail!(
            "The event feed ended before the {} job for sandbox '{}' reached a terminal state",
            attempt.action,
            attempt.key
        )
    }

    /// Apply one remote snapshot: project, transition, render, and — for
    /// advancing statuses — write the cache entry through to disk. Returns
    /// a terminal outcome when the snapshot reports a remote failure.
    fn apply_snapshot(
        &mut self,
        attempt: &mut Attempt,
        snapshot: JobSnapshot,
        remaining_secs: u64,
        fast_forward: bool,
    ) -> Result<Option<OperationOutcome>> {
        match attempt.projector.project(&snapshot, remaining_secs) {
            Projection::Advance {
                stage,
                state,
                message,
            } => {
                if fast_forward {
                    attempt.tracker.complete_through(Some(&stage));
                }
                attempt.tracker.transition(&stage, state);
                self.ui.render(&attempt.tracker.snapshot(), &message);
                self.cache.set(attempt.entry_with(snapshot.clone()))?;
                attempt.last_snapshot = Some(snapshot);
                Ok(None)
            }
            Projection::Failure { message } => {
                attempt.tracker.fail_current();
                self.ui.render(&attempt.tracker.snapshot(), &message);
                self.ui.error(&message);
                attempt.last_snapshot = Some(snapshot);
                let resumable = self.cache.get(&attempt.key).is_some();
                Ok(Some(OperationOutcome {
                    response: attempt.response(resumable),
                    disposition: Disposition::Failed { reason: message },
                }))
            }
        }
    }

    /// Confirmed terminal success: apply completion side effects in fixed
    /// order — alias, then default target, then the success line — and
    /// clear the cache entry. Side effects are best-effort: a failed step
    /// warns and never blocks the remaining steps or overall success.
    fn complete(
        &mut self,
        attempt: &mut Attempt,
        snapshot: JobSnapshot,
        auth: AuthResult,
    ) -> Result<OperationOutcome> {
        attempt
            .tracker
            .transition(AUTHENTICATING_STAGE, StageState::Completed);
        self.ui.render(
            &attempt.tracker.snapshot(),
            &format!("Sandbox '{}' is ready", attempt.key),
        );

        // Prefer the username recorded from the earlier auth notification;
        // fall back to the one delivered with the result.
        let username = attempt
            .authenticated
            .as_ref()
            .map(|a| a.username.clone())
            .unwrap_or_else(|| auth.username.clone());
        if let Some(alias) = attempt.prefs.alias.clone()
            && let Err(err) = self.effects.set_alias(&alias, &username)
        {
            warn!(alias = %alias, error = %err, "failed to set alias");
            self.ui
                .warn(&format!("Could not set alias '{alias}': {err:#}"));
        }
        if attempt.prefs.set_default
            && let Err(err) = self.effects.set_default_target(&username)
        {
            warn!(username = %username, error = %err, "failed to set default target");
            self.ui
                .warn(&format!("Could not set the default target org: {err:#}"));
        }
        self.ui.success(&format!(
            "Sandbox '{}' is provisioned and authenticated as {}",
            attempt.key, username
        ));

        attempt.last_snapshot = Some(snapshot);
        attempt.authenticated = Some(auth);
        // Confirmed terminal means nothing is left to resume.
        self.cache.unset(&attempt.key)?;
        Ok(OperationOutcome {
            response: attempt.response(false),
            disposition: Disposition::Completed,
        })
    }

    /// Terminal for this process, not for the operation: warn with the
    /// resume hint and keep whatever the cache already holds.
    fn defer(&mut self, attempt: &Attempt, reason: &str) -> OperationOutcome {
        let hint = attempt.resume_hint();
        warn!(sandbox = %attempt.key, "attempt deferred");
        self.ui.warn(&format!("{reason} {hint}"));
        let resumable = self.cache.get(&attempt.key).is_some();
        OperationOutcome {
            response: attempt.response(resumable),
            disposition: Disposition::Deferred { resume_hint: hint },
        }
    }

    /// Disambiguation is manual: one warning lists every candidate that is
    /// not the tracked job. The tracker itself is not touched.
    fn report_duplicates(&self, attempt: &Attempt, candidates: &[JobCandidate]) {
        let tracked = attempt.last_snapshot.as_ref().map(|s| s.job_id.as_str());
        let others: Vec<String> = candidates
            .iter()
            .filter(|c| Some(c.job_id.as_str()) != tracked)
            .map(|c| format!("{} ({})", c.job_id, c.status))
            .collect();
        if others.is_empty() {
            return;
        }
        warn!(
            sandbox = %attempt.key,
            count = others.len(),
            "multiple provisioning jobs matched"
        );
        self.ui.warn(&format!(
            "Multiple provisioning jobs match sandbox '{}'. Continuing with the tracked job; inspect the others manually: {}",
            attempt.key,
            others.join(", ")
        ));
    }
}
