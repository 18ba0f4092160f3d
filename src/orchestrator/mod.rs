//! Operation orchestration.
//!
//! `events` defines the lifecycle notification union and the injected
//! source/resolver traits; `feed` is the JSON-lines transport the binary
//! wires to stdin; `core` drives the stage tracker and resume cache from
//! the event stream.

pub mod core;
pub mod events;
pub mod feed;

pub use self::core::{Disposition, OperationOutcome, OperationResponse, Orchestrator, ResumeTarget};
pub use events::{JobResolver, LifecycleEvent, NotificationSource, ScriptedSource};
pub use feed::{FeedMessage, JsonFeed};
