//! # Game session state machine
//!
//! One [`GameSession`] per play-through. The UI only talks to it through
//! four commands ([`GameSession::select_word`], [`GameSession::run_check`],
//! [`GameSession::submit_standout_guess`], [`GameSession::restart`]) plus
//! [`GameSession::advance`], which the scheduler calls once the delay of the
//! pending animation step has elapsed. Every command returns a fresh
//! [`GameSnapshot`]. Commands that are not allowed in the current state are
//! silently ignored: they race with animations and are not errors.
//!
//! Phases: `Selecting -> Checking -> (Animating ->) Selecting` for a check,
//! `Selecting | Checking -> Animating -> Ended` for a win or a loss.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::game::puzzle::Puzzle;
use crate::game::resolution::{
    judge_guess, plan_loss_sequence, plan_win_sequence, strike_count, strike_limit_reached,
    GameResult, GuessOutcome, ScoreColor, ScoreEntry, ScoreMode,
};
use crate::game::sequence::{AnimationTimings, SequenceStep, StepKind, StepQueue};
use crate::game::tips::{select_tip, Feedback, Tip, TipInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Selecting,
    Checking,
    Animating,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Open for picks.
    Interactive,
    /// Solved as a partial (yellow): outlier known, ruled out as the ultimate.
    Locked,
    /// Passed a check, reveal animation in progress.
    Sliding,
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Revealed,
}

/// Runtime state of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowState {
    pub status: RowStatus,
    pub check_status: CheckStatus,
    /// Pending pick, present only while the guess is unconfirmed.
    pub selection: Option<usize>,
    pub failed_guesses: BTreeSet<usize>,
    pub solved: bool,
}

impl RowState {
    fn fresh() -> Self {
        Self {
            status: RowStatus::Interactive,
            check_status: CheckStatus::Pending,
            selection: None,
            failed_guesses: BTreeSet::new(),
            solved: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RowStatus::Interactive
    }

    /// Outlier shown to the player (a sliding row is not there yet).
    pub fn is_revealed(&self) -> bool {
        matches!(self.status, RowStatus::Revealed | RowStatus::Locked)
    }
}

/// Immutable view handed to the display layer after every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub puzzle: Puzzle,
    pub phase: Phase,
    pub rows: Vec<RowState>,
    pub score: Vec<ScoreEntry>,
    pub strikes: usize,
    pub result: Option<GameResult>,
    pub tip: Tip,
    pub tip_message: String,
    /// Row indices in display order; the decisive row ends up last.
    pub display_order: Vec<usize>,
    pub meta_revealed: bool,
    pub check_used: bool,
    pub pending_step: Option<SequenceStep>,
}

impl GameSnapshot {
    pub fn selections(&self) -> BTreeMap<usize, usize> {
        collect_selections(&self.rows)
    }
}

/// Why a command was ignored. Only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongPhase(Phase),
    SequenceRunning,
    UnknownRow(usize),
    UnknownWord(usize),
    RowNotInteractive(RowStatus),
    AlreadyFailed(usize),
    NothingToCheck,
    SelectionsIncomplete,
    NoGuessForRow(usize),
}

#[derive(Debug, Clone)]
pub struct GameSession {
    puzzle: Puzzle,
    timings: AnimationTimings,
    phase: Phase,
    rows: Vec<RowState>,
    score: Vec<ScoreEntry>,
    result: Option<GameResult>,
    check_used: bool,
    feedback: Option<Feedback>,
    tip: Tip,
    display_order: Vec<usize>,
    meta_revealed: bool,
    steps: StepQueue,
}

impl GameSession {
    pub fn new(puzzle: Puzzle) -> Self {
        Self::with_timings(puzzle, AnimationTimings::default())
    }

    pub fn with_timings(puzzle: Puzzle, timings: AnimationTimings) -> Self {
        let row_count = puzzle.rows.len();
        let mut session = Self {
            puzzle,
            timings,
            phase: Phase::Selecting,
            rows: vec![RowState::fresh(); row_count],
            score: Vec::new(),
            result: None,
            check_used: false,
            feedback: None,
            tip: Tip::Instructions,
            display_order: (0..row_count).collect(),
            meta_revealed: false,
            steps: StepQueue::default(),
        };
        session.refresh_tip();
        session
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn score(&self) -> &[ScoreEntry] {
        &self.score
    }

    pub fn strikes(&self) -> usize {
        strike_count(&self.score)
    }

    pub fn row_state(&self, row_index: usize) -> Option<&RowState> {
        self.rows.get(row_index)
    }

    pub fn selections(&self) -> BTreeMap<usize, usize> {
        collect_selections(&self.rows)
    }

    pub fn tip(&self) -> Tip {
        self.tip
    }

    pub fn check_used(&self) -> bool {
        self.check_used
    }

    /// True while a check, win or loss sequence still has steps to run.
    pub fn is_sequence_running(&self) -> bool {
        self.steps.is_running()
    }

    pub fn pending_step(&self) -> Option<SequenceStep> {
        self.steps.peek().copied()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            puzzle: self.puzzle.clone(),
            phase: self.phase,
            rows: self.rows.clone(),
            score: self.score.clone(),
            strikes: self.strikes(),
            result: self.result,
            tip: self.tip,
            tip_message: self.tip.message().to_string(),
            display_order: self.display_order.clone(),
            meta_revealed: self.meta_revealed,
            check_used: self.check_used,
            pending_step: self.pending_step(),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn select_word(&mut self, row_index: usize, word_index: usize) -> GameSnapshot {
        match self.can_select(row_index, word_index) {
            Ok(()) => {
                self.rows[row_index].selection = Some(word_index);
                self.feedback = None;
                self.refresh_tip();
            }
            Err(rejection) => log::debug!(
                "select_word({}, {}) ignored: {:?}",
                row_index,
                word_index,
                rejection
            ),
        }
        self.snapshot()
    }

    pub fn run_check(&mut self) -> GameSnapshot {
        match self.can_check() {
            Ok(()) => {
                self.check_used = true;
                self.feedback = None;
                // The tip stays frozen until the check pass is over.
                self.phase = Phase::Checking;
                let delay = self.timings.check_row_ms;
                let open_rows: Vec<usize> = self.open_rows().collect();
                log::debug!("🔍 Checking rows {:?}", open_rows);
                self.steps.extend(
                    open_rows
                        .into_iter()
                        .map(|row| SequenceStep::new(StepKind::CheckRow(row), delay)),
                );
                self.steps.push(SequenceStep::new(StepKind::FinishCheck, 0));
            }
            Err(rejection) => log::debug!("run_check ignored: {:?}", rejection),
        }
        self.snapshot()
    }

    pub fn submit_standout_guess(&mut self, row_index: usize) -> GameSnapshot {
        match self.standout_guess_for(row_index) {
            Ok(word_index) => self.resolve_standout(row_index, word_index),
            Err(rejection) => log::debug!(
                "submit_standout_guess({}) ignored: {:?}",
                row_index,
                rejection
            ),
        }
        self.snapshot()
    }

    /// Applies the pending animation step. No-op when nothing is pending.
    pub fn advance(&mut self) -> GameSnapshot {
        if let Some(step) = self.steps.pop() {
            log::debug!("▶️ step {:?}", step.kind);
            self.apply_step(step.kind);
            self.refresh_tip();
        }
        self.snapshot()
    }

    /// Runs the in-flight sequence to completion without waiting.
    pub fn run_sequence(&mut self) -> GameSnapshot {
        while self.steps.is_running() {
            self.advance();
        }
        self.snapshot()
    }

    /// Starts over on the same puzzle. Only allowed once the game has ended.
    pub fn restart(&mut self) -> GameSnapshot {
        let puzzle = self.puzzle.clone();
        self.restart_with(puzzle)
    }

    /// Like [`GameSession::restart`], but on another (e.g. reshuffled) puzzle.
    pub fn restart_with(&mut self, puzzle: Puzzle) -> GameSnapshot {
        if self.phase == Phase::Ended {
            *self = Self::with_timings(puzzle, self.timings);
            log::info!("🔄 Session restarted");
        } else {
            log::debug!("restart ignored: {:?}", Rejection::WrongPhase(self.phase));
        }
        self.snapshot()
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.phase != Phase::Selecting {
            return Err(Rejection::WrongPhase(self.phase));
        }
        if self.steps.is_running() {
            return Err(Rejection::SequenceRunning);
        }
        Ok(())
    }

    pub fn can_select(&self, row_index: usize, word_index: usize) -> Result<(), Rejection> {
        self.ensure_idle()?;
        let row = self
            .rows
            .get(row_index)
            .ok_or(Rejection::UnknownRow(row_index))?;
        let word_count = self.puzzle.row(row_index).map_or(0, |row| row.words.len());
        if word_index >= word_count {
            return Err(Rejection::UnknownWord(word_index));
        }
        if !row.is_open() {
            return Err(Rejection::RowNotInteractive(row.status));
        }
        if row.failed_guesses.contains(&word_index) {
            return Err(Rejection::AlreadyFailed(word_index));
        }
        Ok(())
    }

    pub fn can_check(&self) -> Result<(), Rejection> {
        self.ensure_idle()?;
        let mut open = self.rows.iter().filter(|row| row.is_open()).peekable();
        if open.peek().is_none() {
            return Err(Rejection::NothingToCheck);
        }
        if open.any(|row| row.selection.is_none()) {
            return Err(Rejection::SelectionsIncomplete);
        }
        Ok(())
    }

    /// The word a Stand Out submission would judge: the pending pick of an
    /// open row, or the known outlier of a revealed row.
    pub fn standout_guess_for(&self, row_index: usize) -> Result<usize, Rejection> {
        self.ensure_idle()?;
        let row = self
            .rows
            .get(row_index)
            .ok_or(Rejection::UnknownRow(row_index))?;
        match row.status {
            RowStatus::Interactive => row.selection.ok_or(Rejection::NoGuessForRow(row_index)),
            RowStatus::Revealed if !row.solved => self
                .puzzle
                .row(row_index)
                .map(|row| row.outlier_index)
                .ok_or(Rejection::UnknownRow(row_index)),
            status => Err(Rejection::RowNotInteractive(status)),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn resolve_standout(&mut self, row_index: usize, word_index: usize) {
        let outcome = judge_guess(&self.puzzle, row_index, word_index);
        let mode = ScoreMode::for_session(self.check_used);
        self.record(outcome.color(), mode);
        log::info!(
            "🎯 Stand out on row {} word {}: {:?} ({:?})",
            row_index,
            word_index,
            outcome,
            mode
        );

        match outcome {
            GuessOutcome::Win => {
                self.feedback = None;
                self.start_win(row_index);
            }
            GuessOutcome::Partial => {
                let row = &mut self.rows[row_index];
                row.selection = None;
                row.solved = true;
                row.status = RowStatus::Locked;
                self.after_strike(Feedback::Partial { row: row_index });
            }
            GuessOutcome::Wrong => {
                self.reject_word(row_index, word_index);
                self.after_strike(Feedback::Wrong { row: row_index });
            }
        }
        self.refresh_tip();
    }

    fn apply_step(&mut self, kind: StepKind) {
        match kind {
            StepKind::CheckRow(row_index) => self.check_row(row_index),
            StepKind::FinishCheck => self.finish_check(),
            StepKind::ResumeSelecting => self.phase = Phase::Selecting,
            StepKind::RevealRow(row_index) => {
                if let Some(row) = self.rows.get_mut(row_index) {
                    if row.status != RowStatus::Locked {
                        row.status = RowStatus::Revealed;
                    }
                    row.selection = None;
                }
            }
            StepKind::Pause => {}
            StepKind::MoveRowLast(row_index) if row_index < self.rows.len() => {
                self.display_order.retain(|&row| row != row_index);
                self.display_order.push(row_index);
            }
            StepKind::MoveRowLast(_) => {}
            StepKind::RevealMeta => self.meta_revealed = true,
            StepKind::Finish(result) => {
                self.phase = Phase::Ended;
                log::info!("🏁 Game over: {:?}, score {:?}", result, self.score);
            }
        }
    }

    fn check_row(&mut self, row_index: usize) {
        let Some(selection) = self.rows.get(row_index).and_then(|row| row.selection) else {
            return;
        };
        let passed = self
            .puzzle
            .row(row_index)
            .is_some_and(|row| row.is_outlier(selection));
        if passed {
            let row = &mut self.rows[row_index];
            row.status = RowStatus::Sliding;
            row.check_status = CheckStatus::Revealed;
            row.selection = None;
        } else {
            self.record(ScoreColor::Red, ScoreMode::Checked);
            self.reject_word(row_index, selection);
            self.after_strike(Feedback::Wrong { row: row_index });
        }
    }

    fn finish_check(&mut self) {
        let sliding: Vec<usize> = (0..self.rows.len())
            .filter(|&row| self.rows[row].status == RowStatus::Sliding)
            .collect();
        if sliding.is_empty() {
            self.phase = Phase::Selecting;
            return;
        }
        self.phase = Phase::Animating;
        let delay = self.timings.slide_ms;
        self.steps.extend(
            sliding
                .into_iter()
                .map(|row| SequenceStep::new(StepKind::RevealRow(row), delay)),
        );
        self.steps.push(SequenceStep::new(StepKind::ResumeSelecting, 0));
    }

    fn record(&mut self, color: ScoreColor, mode: ScoreMode) {
        self.score.push(ScoreEntry::new(color, mode));
    }

    fn reject_word(&mut self, row_index: usize, word_index: usize) {
        let row = &mut self.rows[row_index];
        row.failed_guesses.insert(word_index);
        row.selection = None;
        row.status = RowStatus::Interactive;
    }

    /// Called after a red or yellow entry: either the game is lost, or the
    /// player gets feedback (a warning on the second strike).
    fn after_strike(&mut self, feedback: Feedback) {
        if strike_limit_reached(&self.score) {
            self.feedback = None;
            self.start_loss();
        } else if self.strikes() == 2 {
            self.feedback = Some(Feedback::TwoStrikes);
        } else {
            self.feedback = Some(feedback);
        }
    }

    fn start_win(&mut self, row_index: usize) {
        self.result = Some(GameResult::Won);
        self.phase = Phase::Animating;
        let plan = plan_win_sequence(row_index, &self.revealed_flags(), &self.timings);
        self.steps.replace(plan);
    }

    fn start_loss(&mut self) {
        self.result = Some(GameResult::Lost);
        self.phase = Phase::Animating;
        let plan = plan_loss_sequence(
            self.puzzle.ultimate_outlier_row_index,
            &self.revealed_flags(),
            &self.timings,
        );
        // Anything left of an interrupted check is dropped.
        self.steps.replace(plan);
        log::info!("💥 Strike limit reached, revealing the grid");
    }

    fn revealed_flags(&self) -> Vec<bool> {
        self.rows.iter().map(RowState::is_revealed).collect()
    }

    fn open_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rows.len()).filter(|&row| self.rows[row].is_open())
    }

    fn tip_inputs(&self) -> TipInputs {
        let open_rows = self.open_rows().count();
        let pending_selections = self
            .rows
            .iter()
            .filter(|row| row.is_open() && row.selection.is_some())
            .count();
        TipInputs {
            feedback: self.feedback,
            pending_selections,
            open_rows,
            all_open_rows_selected: pending_selections == open_rows,
            any_row_revealed: self
                .rows
                .iter()
                .any(|row| row.is_revealed() || row.check_status == CheckStatus::Revealed),
        }
    }

    fn refresh_tip(&mut self) {
        if self.phase != Phase::Checking {
            self.tip = select_tip(&self.tip_inputs());
        }
    }
}

fn collect_selections(rows: &[RowState]) -> BTreeMap<usize, usize> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| row.selection.map(|word| (index, word)))
        .collect()
}
