// src/services/session_manager.rs - Live game sessions and their animation scheduler
//
// Each session is owned by the store; callers only go through the command
// functions below. After a command, if the session has an animation step
// pending, one driver task per session sleeps for the step delay, calls
// `advance`, and publishes the new snapshot on the session's watch channel.
// Sessions idle for longer than `SessionLimits::idle_ttl` are swept when a new
// one is created, and the least recently used ones go once the store is full.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::game::puzzle::RawPuzzle;
use crate::game::sequence::AnimationTimings;
use crate::game::session::{GameSession, GameSnapshot};
use crate::services::puzzle_source::{
    load_raw_puzzle, randomize_or_fallback, ConfiguredSource, PuzzleKind,
};
use crate::{OddestOneOutError, Result};

// ============================================================================
// STORE
// ============================================================================

pub struct SessionEntry {
    /// Kept so "play again" can reshuffle the same content.
    pub raw: RawPuzzle,
    pub session: GameSession,
    updates: watch::Sender<GameSnapshot>,
    driving: bool,
    last_touched: Instant,
}

impl SessionEntry {
    fn publish(&self) -> GameSnapshot {
        let snapshot = self.session.snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }
}

pub type SessionStore = Arc<RwLock<HashMap<String, SessionEntry>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions without a command for this long are dropped.
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            max_sessions: 10_000,
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    source: Arc<ConfiguredSource>,
    timings: AnimationTimings,
    limits: SessionLimits,
}

impl SessionManager {
    pub fn new(source: ConfiguredSource, timings: AnimationTimings) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            source: Arc::new(source),
            timings,
            limits: SessionLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Loads a puzzle (or the fallback) and opens a fresh session on it.
    pub async fn create_session(&self, kind: PuzzleKind, client_date: &str) -> (String, GameSnapshot) {
        let raw = load_raw_puzzle(self.source.as_ref(), kind, client_date).await;
        let session = GameSession::with_timings(randomize_or_fallback(&raw), self.timings);
        let snapshot = session.snapshot();
        let (updates, _) = watch::channel(snapshot.clone());

        let session_id = Uuid::new_v4().to_string();
        let mut store = self.store.write().await;
        evict_sessions(&mut store, &self.limits);
        store.insert(
            session_id.clone(),
            SessionEntry {
                raw,
                session,
                updates,
                driving: false,
                last_touched: Instant::now(),
            },
        );
        log::info!("🆕 Session {} created ({:?}, {})", session_id, kind, client_date);
        (session_id, snapshot)
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<GameSnapshot> {
        let store = self.store.read().await;
        store
            .get(session_id)
            .map(|entry| entry.session.snapshot())
            .ok_or_else(|| not_found(session_id))
    }

    pub async fn subscribe(&self, session_id: &str) -> Result<watch::Receiver<GameSnapshot>> {
        let store = self.store.read().await;
        store
            .get(session_id)
            .map(|entry| entry.updates.subscribe())
            .ok_or_else(|| not_found(session_id))
    }

    pub async fn session_count(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn remove_session(&self, session_id: &str) -> bool {
        self.store.write().await.remove(session_id).is_some()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub async fn select_word(&self, session_id: &str, row: usize, word: usize) -> Result<GameSnapshot> {
        self.command(session_id, |entry| entry.session.select_word(row, word))
            .await
    }

    pub async fn run_check(&self, session_id: &str) -> Result<GameSnapshot> {
        self.command(session_id, |entry| entry.session.run_check()).await
    }

    pub async fn submit_standout_guess(&self, session_id: &str, row: usize) -> Result<GameSnapshot> {
        self.command(session_id, |entry| entry.session.submit_standout_guess(row))
            .await
    }

    /// Play again: same content, reshuffled. Ignored until the game has ended.
    pub async fn restart(&self, session_id: &str) -> Result<GameSnapshot> {
        self.command(session_id, |entry| {
            let puzzle = randomize_or_fallback(&entry.raw);
            entry.session.restart_with(puzzle)
        })
        .await
    }

    async fn command<F>(&self, session_id: &str, apply: F) -> Result<GameSnapshot>
    where
        F: FnOnce(&mut SessionEntry) -> GameSnapshot,
    {
        let mut store = self.store.write().await;
        let entry = store.get_mut(session_id).ok_or_else(|| not_found(session_id))?;
        entry.last_touched = Instant::now();
        apply(entry);
        let snapshot = entry.publish();

        if entry.session.is_sequence_running() && !entry.driving {
            entry.driving = true;
            spawn_sequence_driver(Arc::clone(&self.store), session_id.to_string());
        }
        Ok(snapshot)
    }
}

// ============================================================================
// SEQUENCE DRIVER
// ============================================================================

fn spawn_sequence_driver(store: SessionStore, session_id: String) {
    tokio::spawn(async move {
        loop {
            let delay = {
                let mut sessions = store.write().await;
                let Some(entry) = sessions.get_mut(&session_id) else {
                    return;
                };
                match entry.session.pending_step() {
                    Some(step) => step.delay(),
                    None => {
                        entry.driving = false;
                        return;
                    }
                }
            };

            tokio::time::sleep(delay).await;

            let mut sessions = store.write().await;
            let Some(entry) = sessions.get_mut(&session_id) else {
                return;
            };
            entry.session.advance();
            entry.publish();
        }
    });
}

// ============================================================================
// EVICTION
// ============================================================================

/// Drops idle sessions, then the least recently touched ones until there is
/// room for one more.
fn evict_sessions(store: &mut HashMap<String, SessionEntry>, limits: &SessionLimits) {
    let now = Instant::now();
    let before = store.len();
    store.retain(|_, entry| now.duration_since(entry.last_touched) < limits.idle_ttl);

    while !store.is_empty() && store.len() >= limits.max_sessions {
        let oldest = store
            .iter()
            .min_by_key(|(_, entry)| entry.last_touched)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                store.remove(&id);
            }
            None => break,
        }
    }

    let evicted = before - store.len();
    if evicted > 0 {
        log::info!("🧹 Evicted {} sessions, {} left", evicted, store.len());
    }
}

fn not_found(session_id: &str) -> OddestOneOutError {
    OddestOneOutError::SessionNotFound(session_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fallback::fallback_raw_puzzle;
    use crate::game::resolution::GameResult;
    use crate::game::session::{Phase, RowStatus};
    use crate::services::puzzle_source::StaticPuzzleSource;
    use assert_matches::assert_matches;

    fn manager() -> SessionManager {
        let mut raw = fallback_raw_puzzle();
        raw.date = chrono::NaiveDate::from_ymd_opt(2026, 10, 19);
        SessionManager::new(
            ConfiguredSource::Static(StaticPuzzleSource::new(vec![raw])),
            AnimationTimings::default(),
        )
    }

    #[tokio::test]
    async fn test_create_session_and_select() {
        let manager = manager();
        let (id, snapshot) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        assert_eq!(snapshot.phase, Phase::Selecting);
        assert_eq!(snapshot.puzzle.date, chrono::NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(manager.session_count().await, 1);

        let snapshot = manager.select_word(&id, 0, 1).await.unwrap();
        assert_eq!(snapshot.selections().get(&0), Some(&1));
        assert_eq!(manager.snapshot(&id).await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = manager();
        assert_matches!(
            manager.run_check("nope").await,
            Err(OddestOneOutError::SessionNotFound(id)) if id == "nope"
        );
        assert!(manager.subscribe("nope").await.is_err());
        assert!(!manager.remove_session("nope").await);
    }

    #[tokio::test]
    async fn test_store_stays_bounded_by_max_sessions() {
        let manager = manager().with_limits(SessionLimits {
            max_sessions: 3,
            ..SessionLimits::default()
        });
        let (first, _) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        for _ in 0..50 {
            manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        }
        assert_eq!(manager.session_count().await, 3);
        assert_matches!(
            manager.snapshot(&first).await,
            Err(OddestOneOutError::SessionNotFound(_))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_swept_and_active_ones_kept() {
        let manager = manager().with_limits(SessionLimits {
            idle_ttl: Duration::from_secs(60),
            ..SessionLimits::default()
        });
        let (idle, _) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        let (active, _) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;

        tokio::time::advance(Duration::from_secs(45)).await;
        manager.select_word(&active, 0, 0).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        assert_eq!(manager.session_count().await, 2);
        assert!(manager.snapshot(&idle).await.is_err());
        assert!(manager.snapshot(&active).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_plays_win_sequence_to_the_end() {
        let manager = manager();
        let (id, snapshot) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        let row = snapshot.puzzle.ultimate_outlier_row_index;
        let word = snapshot.puzzle.rows[row].outlier_index;

        let mut updates = manager.subscribe(&id).await.unwrap();
        manager.select_word(&id, row, word).await.unwrap();
        let snapshot = manager.submit_standout_guess(&id, row).await.unwrap();
        assert_eq!(snapshot.phase, Phase::Animating);
        assert_eq!(snapshot.result, Some(GameResult::Won));

        // Ignored while the sequence runs.
        let during = manager.select_word(&id, 0, 0).await.unwrap();
        assert_eq!(during.phase, Phase::Animating);

        let ended = updates
            .wait_for(|s| s.phase == Phase::Ended)
            .await
            .unwrap()
            .clone();
        assert!(ended.meta_revealed);
        assert_eq!(ended.display_order.last(), Some(&row));
        assert!(ended.rows.iter().all(|r| r.status == RowStatus::Revealed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_reshuffles_after_the_end() {
        let manager = manager();
        let (id, snapshot) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;

        // Not ended yet: ignored.
        assert_eq!(manager.restart(&id).await.unwrap(), snapshot);

        let row = snapshot.puzzle.ultimate_outlier_row_index;
        let word = snapshot.puzzle.rows[row].outlier_index;
        let mut updates = manager.subscribe(&id).await.unwrap();
        manager.select_word(&id, row, word).await.unwrap();
        manager.submit_standout_guess(&id, row).await.unwrap();
        updates.wait_for(|s| s.phase == Phase::Ended).await.unwrap();

        let fresh = manager.restart(&id).await.unwrap();
        assert_eq!(fresh.phase, Phase::Selecting);
        assert!(fresh.score.is_empty());
        assert_eq!(fresh.puzzle.meta_category, snapshot.puzzle.meta_category);
        assert_ne!(
            fresh.puzzle.rows[0].words[0].id,
            snapshot.puzzle.rows[0].words[0].id,
            "restart builds new word identities"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_returns_to_selecting_after_check() {
        let manager = manager();
        let (id, snapshot) = manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        for (row_index, row) in snapshot.puzzle.rows.iter().enumerate() {
            manager.select_word(&id, row_index, row.outlier_index).await.unwrap();
        }
        let mut updates = manager.subscribe(&id).await.unwrap();
        let checking = manager.run_check(&id).await.unwrap();
        assert_eq!(checking.phase, Phase::Checking);

        let done = updates
            .wait_for(|s| s.phase == Phase::Selecting && s.pending_step.is_none())
            .await
            .unwrap()
            .clone();
        assert!(done.rows.iter().all(|r| r.status == RowStatus::Revealed));
        assert!(done.check_used);
    }
}
