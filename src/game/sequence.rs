//! Discrete animation steps. The core never sleeps: a scheduler reads the
//! delay of the next step, waits, then calls `GameSession::advance`.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::resolution::GameResult;

/// Per-step delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationTimings {
    pub check_row_ms: u64,
    pub slide_ms: u64,
    pub reveal_ms: u64,
    pub win_pause_ms: u64,
    pub meta_reveal_ms: u64,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            check_row_ms: 600,
            slide_ms: 500,
            reveal_ms: 400,
            win_pause_ms: 1000,
            meta_reveal_ms: 800,
        }
    }
}

impl AnimationTimings {
    /// All delays zero, for headless play.
    pub fn instant() -> Self {
        Self {
            check_row_ms: 0,
            slide_ms: 0,
            reveal_ms: 0,
            win_pause_ms: 0,
            meta_reveal_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Judge the pending selection of one row during a check.
    CheckRow(usize),
    /// End of the per-row check pass.
    FinishCheck,
    /// Sliding rows finished their reveal; play resumes.
    ResumeSelecting,
    RevealRow(usize),
    Pause,
    /// Move the given row to the end of the display order.
    MoveRowLast(usize),
    RevealMeta,
    Finish(GameResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub kind: StepKind,
    pub delay_ms: u64,
}

impl SequenceStep {
    pub fn new(kind: StepKind, delay_ms: u64) -> Self {
        Self { kind, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// FIFO of steps still to run. Non-empty means a sequence is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepQueue {
    steps: VecDeque<SequenceStep>,
}

impl StepQueue {
    pub fn is_running(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn peek(&self) -> Option<&SequenceStep> {
        self.steps.front()
    }

    pub fn pop(&mut self) -> Option<SequenceStep> {
        self.steps.pop_front()
    }

    pub fn push(&mut self, step: SequenceStep) {
        self.steps.push_back(step);
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = SequenceStep>) {
        self.steps.extend(steps);
    }

    /// Drops whatever is left, e.g. when a loss interrupts a check.
    pub fn replace(&mut self, steps: impl IntoIterator<Item = SequenceStep>) {
        self.steps.clear();
        self.steps.extend(steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
