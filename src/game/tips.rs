//! Hint shown under the grid, derived from the current session state.

use serde::{Deserialize, Serialize};

/// Transient reaction to the most recent guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    Wrong { row: usize },
    Partial { row: usize },
    TwoStrikes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tip", rename_all = "snake_case")]
pub enum Tip {
    Feedback { feedback: Feedback },
    PickUltimate,
    NearWin,
    ReadyToCheck,
    ContinueSelecting,
    SelectingInProgress,
    Instructions,
}

impl Tip {
    pub fn message(&self) -> &'static str {
        match self {
            Tip::Feedback { feedback: Feedback::Wrong { .. } } => {
                "Not quite. That word fits its category, try another one in that row."
            }
            Tip::Feedback { feedback: Feedback::Partial { .. } } => {
                "Right outlier, but it shares the hidden link with the others."
            }
            Tip::Feedback { feedback: Feedback::TwoStrikes } => {
                "Careful: one more miss and the game is over."
            }
            Tip::PickUltimate => "Every outlier is revealed. Which one is the Oddest One Out?",
            Tip::NearWin => "One row left. Stand it out if you think it is the Oddest One Out.",
            Tip::ReadyToCheck => "Every row has a pick. Check them, or stand one out.",
            Tip::ContinueSelecting => "Keep going: pick the outlier in the remaining rows.",
            Tip::SelectingInProgress => "Good start. Pick one outlier in every row.",
            Tip::Instructions => {
                "Find the word that does not belong in each row, then the one outlier that does not belong among them."
            }
        }
    }
}

/// Everything the selector looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TipInputs {
    pub feedback: Option<Feedback>,
    /// Open (not yet revealed) rows holding a pending selection.
    pub pending_selections: usize,
    pub open_rows: usize,
    pub all_open_rows_selected: bool,
    pub any_row_revealed: bool,
}

/// First matching rule wins.
pub fn select_tip(inputs: &TipInputs) -> Tip {
    if let Some(feedback) = inputs.feedback {
        return Tip::Feedback { feedback };
    }
    if inputs.open_rows == 0 {
        return Tip::PickUltimate;
    }
    if inputs.open_rows == 1 && inputs.pending_selections == 1 {
        return Tip::NearWin;
    }
    if inputs.all_open_rows_selected {
        return Tip::ReadyToCheck;
    }
    if inputs.any_row_revealed && inputs.pending_selections < inputs.open_rows {
        return Tip::ContinueSelecting;
    }
    if inputs.pending_selections > 0 && inputs.pending_selections < inputs.open_rows {
        return Tip::SelectingInProgress;
    }
    Tip::Instructions
}
