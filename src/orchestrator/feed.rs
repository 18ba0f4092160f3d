//! JSON-lines event transport.
//!
//! The provisioning driver delivers lifecycle notifications to the binary
//! as one JSON object per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"status","snapshot":{"jobId":"0GR1","sandboxName":"dev1","status":"Pending","progressPercent":5},"remainingSecs":600}
//! {"kind":"auth","auth":{"username":"admin@example.com.dev1"}}
//! {"kind":"result","snapshot":{...},"auth":{...}}
//! {"kind":"asyncResult"}
//! {"kind":"timeout"}
//! {"kind":"multipleMatches","candidates":[{...},{...}]}
//! ```
//!
//! During resume the driver answers the re-attachment lookup with a
//! `resolved` reply before any stream events:
//!
//! ```text
//! {"kind":"resolved","snapshot":{...}}
//! ```
//!
//! `resolved` is only valid as a reply; encountering it in the event
//! stream is a protocol error.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::job::{AuthResult, JobCandidate, JobSnapshot};
use crate::orchestrator::events::{JobResolver, LifecycleEvent, NotificationSource};

/// Wire form of one feed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FeedMessage {
    Status {
        snapshot: JobSnapshot,
        #[serde(default)]
        remaining_secs: u64,
    },
    Auth {
        auth: AuthResult,
    },
    Result {
        snapshot: JobSnapshot,
        auth: AuthResult,
    },
    AsyncResult {
        #[serde(default)]
        snapshot: Option<JobSnapshot>,
    },
    Timeout,
    MultipleMatches {
        candidates: Vec<JobCandidate>,
    },
    Resolved {
        #[serde(default)]
        snapshot: Option<JobSnapshot>,
    },
}

impl FeedMessage {
    /// Convert a stream message into its event. `Resolved` has no event
    /// form — it is a resolver reply, not a notification.
    fn into_event(self) -> Option<LifecycleEvent> {
        match self {
            FeedMessage::Status {
                snapshot,
                remaining_secs,
            } => Some(LifecycleEvent::Status {
                snapshot,
                remaining_secs,
            }),
            FeedMessage::Auth { auth } => Some(LifecycleEvent::Auth(auth)),
            FeedMessage::Result { snapshot, auth } => {
                Some(LifecycleEvent::Result { snapshot, auth })
            }
            FeedMessage::AsyncResult { snapshot } => {
                Some(LifecycleEvent::AsyncResult { snapshot })
            }
            FeedMessage::Timeout => Some(LifecycleEvent::Timeout),
            FeedMessage::MultipleMatches { candidates } => {
                Some(LifecycleEvent::MultipleMatches { candidates })
            }
            FeedMessage::Resolved { .. } => None,
        }
    }
}

/// A feed reader over any async byte stream (stdin in the binary).
pub struct JsonFeed<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin + Send> JsonFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    async fn next_message(&mut self) -> Result<Option<FeedMessage>> {
        loop {
            match self
                .lines
                .next_line()
                .await
                .context("Failed to read from the event feed")?
            {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    let message = serde_json::from_str(&line)
                        .with_context(|| format!("Malformed event feed line: {line}"))?;
                    return Ok(Some(message));
                }
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> NotificationSource for JsonFeed<R> {
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>> {
        match self.next_message().await? {
            None => Ok(None),
            Some(message) => match message.into_event() {
                Some(event) => Ok(Some(event)),
                None => bail!("Unexpected 'resolved' reply in the event stream"),
            },
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> JobResolver for JsonFeed<R> {
    async fn resolve(&mut self, job_id: &str) -> Result<Option<JobSnapshot>> {
        match self.next_message().await? {
            Some(FeedMessage::Resolved { snapshot }) => Ok(snapshot),
            Some(other) => bail!(
                "Expected a 'resolved' reply for job {job_id}, got {other:?}"
            ),
            None => bail!("Event feed closed before the 'resolved' reply for job {job_id}"),
        }
    }
}
