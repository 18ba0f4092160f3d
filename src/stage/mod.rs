//! Staged-progress state machine.
//!
//! `tracker` owns the ordered stage list and its monotonic-forward
//! transition rules; `projector` turns raw remote snapshots into tracker
//! transitions plus display messages.

pub mod projector;
pub mod tracker;

pub use projector::{Projection, StatusProjector, AUTHENTICATING_STAGE};
pub use tracker::{Stage, StageState, StageTracker, StageView};
