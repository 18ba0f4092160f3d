//! Ordered stage list with monotonic-forward transitions.
//!
//! The tracker is pure state-machine logic: no I/O, no rendering. It is
//! created once per operation attempt, mutated only by the orchestrator, and
//! discarded when the process exits — only the cache entry survives.

use serde::{Deserialize, Serialize};

/// Spacing between seeded stage ordinals. Leaves room for stage names the
/// remote side reports that the client did not anticipate.
const ORDINAL_GAP: i32 = 100;

/// State of a single tracked stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    /// Tracked but never reported by the remote side
    Unknown,
    InProgress,
    Completed,
    Failed,
}

/// One named stage of a provisioning attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    /// Orders display and processing; not necessarily contiguous
    pub ordinal: i32,
    pub state: StageState,
    /// Whether the remote side has ever reported this stage
    pub visited: bool,
}

/// Read-only view of one stage, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct StageView {
    pub name: String,
    pub state: StageState,
    pub is_current: bool,
}

/// Insertion-ordered collection of stages plus current/previous pointers.
///
/// Invariants, upheld after every mutation:
/// - the stage list is sorted by ordinal
/// - the current stage's ordinal is >= every completed stage's ordinal
#[derive(Debug, Clone)]
pub struct StageTracker {
    stages: Vec<Stage>,
    current: Option<String>,
    previous: Option<String>,
}

impl StageTracker {
    /// Create a tracker seeded with the stage names expected for one action,
    /// in display order. Ordinals are spaced so later dynamic insertions
    /// rarely force a renumber.
    pub fn new(seed: &[&str]) -> Self {
        let stages = seed
            .iter()
            .enumerate()
            .map(|(i, name)| Stage {
                name: (*name).to_string(),
                ordinal: (i as i32) * ORDINAL_GAP,
                state: StageState::Unknown,
                visited: false,
            })
            .collect();
        Self {
            stages,
            current: None,
            previous: None,
        }
    }

    /// Move the tracker to `name` with the given state.
    ///
    /// Untracked names are inserted first (see [`Self::ensure_tracked`]).
    /// The previous current stage is marked `Completed` unless it failed,
    /// and every non-failed stage below the target is marked `Completed` —
    /// the monotonic-forward guarantee holds even when the remote side
    /// reports stages out of the client's expected order or skips some.
    pub fn transition(&mut self, name: &str, state: StageState) {
        let idx = self.ensure_tracked(name);
        let target_ordinal = self.stages[idx].ordinal;

        let prev = self.current.take();
        if let Some(prev_name) = prev.as_deref()
            && prev_name != name
            && let Some(p) = self.stages.iter_mut().find(|s| s.name == prev_name)
            && p.state != StageState::Failed
        {
            p.state = StageState::Completed;
        }

        for stage in &mut self.stages {
            if stage.ordinal < target_ordinal && stage.state != StageState::Failed {
                stage.state = StageState::Completed;
            }
        }

        let target = &mut self.stages[idx];
        target.state = state;
        target.visited = true;
        self.previous = prev;
        self.current = Some(name.to_string());
    }

    /// Mark the current stage as failed, if there is one.
    pub fn fail_current(&mut self) {
        if let Some(name) = self.current.clone()
            && let Some(stage) = self.stages.iter_mut().find(|s| s.name == name)
        {
            stage.state = StageState::Failed;
        }
    }

    /// Fast-forward for resume: mark every stage strictly below `upto` (or
    /// every stage, when `upto` is absent) as completed and visited, without
    /// replaying the intermediate events that produced them.
    pub fn complete_through(&mut self, upto: Option<&str>) {
        let bound = upto
            .and_then(|name| self.stages.iter().find(|s| s.name == name))
            .map(|s| s.ordinal);
        for stage in &mut self.stages {
            if bound.is_none_or(|b| stage.ordinal < b) {
                stage.state = StageState::Completed;
                stage.visited = true;
            }
        }
    }

    /// Read-only snapshot for rendering. No side effects.
    pub fn snapshot(&self) -> Vec<StageView> {
        self.stages
            .iter()
            .map(|s| StageView {
                name: s.name.clone(),
                state: s.state,
                is_current: self.current.as_deref() == Some(s.name.as_str()),
            })
            .collect()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.current
            .as_deref()
            .and_then(|name| self.stages.iter().find(|s| s.name == name))
    }

    pub fn previous_stage(&self) -> Option<&Stage> {
        self.previous
            .as_deref()
            .and_then(|name| self.stages.iter().find(|s| s.name == name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Track `name` if it is not already tracked, returning its index.
    ///
    /// Insertion position for a new name depends on what has been visited:
    /// before the first stage when nothing has; immediately after the
    /// highest-ordinal visited stage when some have; after the last stage
    /// when all have. This keeps the displayed sequence append-consistent
    /// across dissimilar remote vocabularies.
    fn ensure_tracked(&mut self, name: &str) -> usize {
        if let Some(idx) = self.stages.iter().position(|s| s.name == name) {
            return idx;
        }

        let visited_count = self.stages.iter().filter(|s| s.visited).count();
        let pos = if visited_count == 0 {
            0
        } else if visited_count == self.stages.len() {
            self.stages.len()
        } else {
            // Stages are ordinal-sorted, so the highest visited stage is the
            // last index with the flag set.
            self.stages
                .iter()
                .rposition(|s| s.visited)
                .map(|i| i + 1)
                .unwrap_or(self.stages.len())
        };

        let ordinal = self.ordinal_for_position(pos);
        self.stages.insert(
            pos,
            Stage {
                name: name.to_string(),
                ordinal,
                state: StageState::Unknown,
                visited: false,
            },
        );
        pos
    }

    /// Pick an ordinal that keeps the list sorted when inserting at `pos`,
    /// renumbering the whole list first if the surrounding gap is exhausted.
    fn ordinal_for_position(&mut self, pos: usize) -> i32 {
        if self.stages.is_empty() {
            return 0;
        }
        if pos == 0 {
            return self.stages[0].ordinal - ORDINAL_GAP;
        }
        if pos == self.stages.len() {
            return self.stages[self.stages.len() - 1].ordinal + ORDINAL_GAP;
        }
        let lo = self.stages[pos - 1].ordinal;
        let hi = self.stages[pos].ordinal;
        let mid = lo + (hi - lo) / 2;
        if mid == lo {
            self.renumber();
            return self.ordinal_for_position(pos);
        }
        mid
    }

    fn renumber(&mut self) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            stage.ordinal = (i as i32) * ORDINAL_GAP;
        }
    }
}
