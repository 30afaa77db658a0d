//! Guess judgment shared by the Check and Stand Out paths, strike
//! accounting, and the ordered reveal plans for the end of a game.

use serde::{Deserialize, Serialize};

use crate::game::puzzle::{Puzzle, ROW_COUNT};
use crate::game::sequence::{AnimationTimings, SequenceStep, StepKind};

/// Non-purple entries allowed before the game is lost.
pub const STRIKE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreColor {
    /// Wrong word entirely.
    Red,
    /// Right row outlier, but not the oddest one out.
    Yellow,
    /// The oddest one out.
    Purple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    Checked,
    StoodOut,
}

impl ScoreMode {
    /// Once Check has been used in a session, nothing earned afterwards
    /// qualifies as a pure Stand Out entry.
    pub fn for_session(check_used: bool) -> Self {
        if check_used {
            ScoreMode::Checked
        } else {
            ScoreMode::StoodOut
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub color: ScoreColor,
    pub mode: ScoreMode,
}

impl ScoreEntry {
    pub fn new(color: ScoreColor, mode: ScoreMode) -> Self {
        Self { color, mode }
    }

    pub fn is_strike(&self) -> bool {
        self.color != ScoreColor::Purple
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Win,
    Partial,
    Wrong,
}

impl GuessOutcome {
    pub fn color(self) -> ScoreColor {
        match self {
            GuessOutcome::Win => ScoreColor::Purple,
            GuessOutcome::Partial => ScoreColor::Yellow,
            GuessOutcome::Wrong => ScoreColor::Red,
        }
    }
}

/// Shared scoring rule: the outlier of the ultimate row wins, the outlier of
/// any other row is a partial, anything else is wrong.
pub fn judge_guess(puzzle: &Puzzle, row_index: usize, word_index: usize) -> GuessOutcome {
    match puzzle.row(row_index) {
        Some(row) if row.is_outlier(word_index) => {
            if puzzle.is_ultimate(row_index) {
                GuessOutcome::Win
            } else {
                GuessOutcome::Partial
            }
        }
        _ => GuessOutcome::Wrong,
    }
}

pub fn strike_count(score: &[ScoreEntry]) -> usize {
    score.iter().filter(|entry| entry.is_strike()).count()
}

pub fn strike_limit_reached(score: &[ScoreEntry]) -> bool {
    strike_count(score) >= STRIKE_LIMIT
}

// ============================================================================
// END-OF-GAME SEQUENCES
// ============================================================================

/// Win: winning row first, a pause, every other unrevealed row in index
/// order, then the winning row moves last and the meta panel opens.
pub fn plan_win_sequence(
    win_row: usize,
    revealed: &[bool],
    timings: &AnimationTimings,
) -> Vec<SequenceStep> {
    let mut steps = Vec::with_capacity(ROW_COUNT + 4);
    if !is_revealed(revealed, win_row) {
        steps.push(SequenceStep::new(StepKind::RevealRow(win_row), timings.reveal_ms));
    }
    steps.push(SequenceStep::new(StepKind::Pause, timings.win_pause_ms));
    steps.extend(
        (0..revealed.len())
            .filter(|&row| row != win_row && !is_revealed(revealed, row))
            .map(|row| SequenceStep::new(StepKind::RevealRow(row), timings.reveal_ms)),
    );
    steps.extend(closing_steps(win_row, GameResult::Won, timings));
    steps
}

/// Loss: every unrevealed row in index order with the ultimate row held
/// back to be revealed last, then it moves last and the meta panel opens.
pub fn plan_loss_sequence(
    ultimate_row: usize,
    revealed: &[bool],
    timings: &AnimationTimings,
) -> Vec<SequenceStep> {
    let mut steps: Vec<SequenceStep> = (0..revealed.len())
        .filter(|&row| row != ultimate_row && !is_revealed(revealed, row))
        .map(|row| SequenceStep::new(StepKind::RevealRow(row), timings.reveal_ms))
        .collect();
    if !is_revealed(revealed, ultimate_row) {
        steps.push(SequenceStep::new(StepKind::RevealRow(ultimate_row), timings.reveal_ms));
    }
    steps.extend(closing_steps(ultimate_row, GameResult::Lost, timings));
    steps
}

fn closing_steps(
    last_row: usize,
    result: GameResult,
    timings: &AnimationTimings,
) -> [SequenceStep; 3] {
    [
        SequenceStep::new(StepKind::MoveRowLast(last_row), timings.reveal_ms),
        SequenceStep::new(StepKind::RevealMeta, timings.meta_reveal_ms),
        SequenceStep::new(StepKind::Finish(result), 0),
    ]
}

fn is_revealed(revealed: &[bool], row: usize) -> bool {
    revealed.get(row).copied().unwrap_or(false)
}
