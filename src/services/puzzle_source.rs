// src/services/puzzle_source.rs - Where puzzles come from
//
// The game core only ever receives a valid `Puzzle`: every failure on this
// side (unreachable sheet, parse error, no puzzle for the date, malformed
// content) ends in the fallback puzzle and a warning.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::game::fallback::{fallback_puzzle, fallback_raw_puzzle};
use crate::game::puzzle::{Puzzle, RawPuzzle};
use crate::game::randomizer::{randomize_puzzle, validate_raw_puzzle};
use crate::services::sheet::parse_sheet;
use crate::{OddestOneOutError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKind {
    Today,
    RandomPast,
}

/// Anything able to hand out raw puzzle content for a client's date.
pub trait PuzzleSource: Send + Sync {
    fn fetch_raw(
        &self,
        kind: PuzzleKind,
        client_date: NaiveDate,
    ) -> impl Future<Output = Result<RawPuzzle>> + Send;
}

pub fn parse_client_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| OddestOneOutError::InvalidDate(format!("{}: {}", value, e)))
}

/// Today: the puzzle dated on the client's day, else the most recent one
/// before it. RandomPast: any puzzle strictly before the client's day.
pub fn select_puzzle<'a, R: Rng + ?Sized>(
    puzzles: &'a [RawPuzzle],
    kind: PuzzleKind,
    client_date: NaiveDate,
    rng: &mut R,
) -> Result<&'a RawPuzzle> {
    match kind {
        PuzzleKind::Today => puzzles
            .iter()
            .filter(|p| p.date.is_some_and(|d| d <= client_date))
            .max_by_key(|p| p.date)
            .ok_or_else(|| {
                OddestOneOutError::PuzzleSource(format!("no puzzle on or before {}", client_date))
            }),
        PuzzleKind::RandomPast => {
            let past: Vec<&RawPuzzle> = puzzles
                .iter()
                .filter(|p| p.date.is_some_and(|d| d < client_date))
                .collect();
            past.choose(rng).copied().ok_or_else(|| {
                OddestOneOutError::PuzzleSource(format!("no puzzle before {}", client_date))
            })
        }
    }
}

// ============================================================================
// STATIC SOURCE
// ============================================================================

/// In-memory puzzle list.
#[derive(Debug, Clone, Default)]
pub struct StaticPuzzleSource {
    puzzles: Vec<RawPuzzle>,
}

impl StaticPuzzleSource {
    pub fn new(puzzles: Vec<RawPuzzle>) -> Self {
        Self { puzzles }
    }
}

impl PuzzleSource for StaticPuzzleSource {
    async fn fetch_raw(&self, kind: PuzzleKind, client_date: NaiveDate) -> Result<RawPuzzle> {
        let chosen = select_puzzle(&self.puzzles, kind, client_date, &mut rand::rng())?;
        Ok(chosen.clone())
    }
}

// ============================================================================
// SHEET-BACKED SOURCE WITH CACHE
// ============================================================================

/// Fetches the raw CSV text of the puzzle sheet.
pub trait SheetLoader: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<String>> + Send;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileSheet {
    path: PathBuf,
}

impl FileSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SheetLoader for FileSheet {
    async fn load(&self) -> Result<String> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// CSV export URL of the authoring spreadsheet.
#[derive(Debug, Clone)]
pub struct HttpSheet {
    url: String,
    client: reqwest::Client,
}

impl HttpSheet {
    /// `timeout` bounds both connecting and the whole request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl SheetLoader for HttpSheet {
    async fn load(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Parsed sheet plus the moment it was fetched.
#[derive(Debug, Clone)]
pub struct PuzzleCache {
    pub puzzles: Arc<Vec<RawPuzzle>>,
    pub last_fetched_at: Instant,
    pub ttl: Duration,
}

impl PuzzleCache {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.last_fetched_at) < self.ttl
    }
}

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SheetPuzzleSource<L> {
    loader: L,
    ttl: Duration,
    load_timeout: Duration,
    cache: Mutex<Option<PuzzleCache>>,
}

impl<L: SheetLoader> SheetPuzzleSource<L> {
    pub fn new(loader: L, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            cache: Mutex::new(None),
        }
    }

    /// Upper bound on one sheet load. Requests queued on the cache lock
    /// never wait longer than this for a stalled source.
    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    /// Cached puzzles, reloading the sheet once the TTL has run out. A failed
    /// reload keeps serving the stale copy when there is one.
    pub async fn puzzles(&self) -> Result<Arc<Vec<RawPuzzle>>> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(Instant::now())) {
            return Ok(Arc::clone(&cached.puzzles));
        }

        let loaded = match tokio::time::timeout(self.load_timeout, self.loader.load()).await {
            Ok(Ok(text)) => parse_sheet(&text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OddestOneOutError::PuzzleSource(format!(
                "loading {} timed out after {:?}",
                self.loader.describe(),
                self.load_timeout
            ))),
        };

        match loaded {
            Ok(puzzles) => {
                log::info!(
                    "📥 Puzzle sheet loaded from {} ({} puzzles)",
                    self.loader.describe(),
                    puzzles.len()
                );
                let puzzles = Arc::new(puzzles);
                *cache = Some(PuzzleCache {
                    puzzles: Arc::clone(&puzzles),
                    last_fetched_at: Instant::now(),
                    ttl: self.ttl,
                });
                Ok(puzzles)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    log::warn!(
                        "⚠️ Reloading {} failed ({}), serving stale puzzles",
                        self.loader.describe(),
                        e
                    );
                    Ok(Arc::clone(&stale.puzzles))
                }
                None => Err(e),
            },
        }
    }

    pub async fn cache_snapshot(&self) -> Option<PuzzleCache> {
        self.cache.lock().await.clone()
    }
}

impl<L: SheetLoader> PuzzleSource for SheetPuzzleSource<L> {
    async fn fetch_raw(&self, kind: PuzzleKind, client_date: NaiveDate) -> Result<RawPuzzle> {
        let puzzles = self.puzzles().await?;
        let chosen = select_puzzle(&puzzles, kind, client_date, &mut rand::rng())?;
        Ok(chosen.clone())
    }
}

// ============================================================================
// CONFIGURED SOURCE
// ============================================================================

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub cache_ttl: Duration,
    pub load_timeout: Duration,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            cache_ttl: Duration::from_secs(300),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

/// The source picked at startup from the command line.
pub enum ConfiguredSource {
    File(SheetPuzzleSource<FileSheet>),
    Http(SheetPuzzleSource<HttpSheet>),
    Static(StaticPuzzleSource),
}

impl ConfiguredSource {
    /// A URL wins over a path; with neither, only the fallback puzzle is served.
    pub fn from_config(config: &SheetConfig) -> Self {
        if let Some(url) = &config.url {
            match HttpSheet::new(url.clone(), config.load_timeout) {
                Ok(sheet) => {
                    return ConfiguredSource::Http(
                        SheetPuzzleSource::new(sheet, config.cache_ttl)
                            .with_load_timeout(config.load_timeout),
                    )
                }
                Err(e) => log::error!("❌ Cannot build HTTP client for {}: {}", url, e),
            }
        } else if let Some(path) = &config.path {
            return ConfiguredSource::File(
                SheetPuzzleSource::new(FileSheet::new(path.clone()), config.cache_ttl)
                    .with_load_timeout(config.load_timeout),
            );
        }
        log::warn!("⚠️ No usable puzzle sheet configured, serving the fallback puzzle");
        ConfiguredSource::Static(StaticPuzzleSource::default())
    }
}

impl PuzzleSource for ConfiguredSource {
    async fn fetch_raw(&self, kind: PuzzleKind, client_date: NaiveDate) -> Result<RawPuzzle> {
        match self {
            ConfiguredSource::File(source) => source.fetch_raw(kind, client_date).await,
            ConfiguredSource::Http(source) => source.fetch_raw(kind, client_date).await,
            ConfiguredSource::Static(source) => source.fetch_raw(kind, client_date).await,
        }
    }
}

// ============================================================================
// FALLBACK BOUNDARY
// ============================================================================

/// Raw content for the request, or the fallback content on any failure.
pub async fn load_raw_puzzle<S: PuzzleSource>(
    source: &S,
    kind: PuzzleKind,
    client_date: &str,
) -> RawPuzzle {
    let fetched = match parse_client_date(client_date) {
        Ok(date) => source.fetch_raw(kind, date).await,
        Err(e) => Err(e),
    };

    match fetched.and_then(|raw| validate_raw_puzzle(&raw).map(|()| raw)) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!(
                "⚠️ Puzzle fetch ({:?}, {}) failed: {}. Using fallback puzzle",
                kind,
                client_date,
                e
            );
            fallback_raw_puzzle()
        }
    }
}

/// Shuffles raw content, substituting the fallback if it does not hold up.
pub fn randomize_or_fallback(raw: &RawPuzzle) -> Puzzle {
    randomize_puzzle(raw).unwrap_or_else(|e| {
        log::warn!("⚠️ {}. Using fallback puzzle", e);
        fallback_puzzle()
    })
}

/// The puzzle-source contract as the core sees it: never fails.
pub async fn load_puzzle<S: PuzzleSource>(
    source: &S,
    kind: PuzzleKind,
    client_date: &str,
) -> Puzzle {
    randomize_or_fallback(&load_raw_puzzle(source, kind, client_date).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fallback::fallback_raw_puzzle;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dated(date: &str, meta: &str) -> RawPuzzle {
        let mut raw = fallback_raw_puzzle();
        raw.date = Some(parse_client_date(date).unwrap());
        raw.meta_category = meta.to_string();
        raw
    }

    fn library() -> Vec<RawPuzzle> {
        vec![
            dated("2026-10-15", "fifteenth"),
            dated("2026-10-17", "seventeenth"),
            dated("2026-10-19", "nineteenth"),
            dated("2026-10-21", "future"),
        ]
    }

    fn date(value: &str) -> NaiveDate {
        parse_client_date(value).unwrap()
    }

    #[test]
    fn test_today_matches_exact_date() {
        let puzzles = library();
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select_puzzle(&puzzles, PuzzleKind::Today, date("2026-10-19"), &mut rng).unwrap();
        assert_eq!(chosen.meta_category, "nineteenth");
    }

    #[test]
    fn test_today_falls_back_to_most_recent_past() {
        let puzzles = library();
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select_puzzle(&puzzles, PuzzleKind::Today, date("2026-10-18"), &mut rng).unwrap();
        assert_eq!(chosen.meta_category, "seventeenth");

        assert_matches!(
            select_puzzle(&puzzles, PuzzleKind::Today, date("2026-01-01"), &mut rng),
            Err(OddestOneOutError::PuzzleSource(_))
        );
    }

    #[test]
    fn test_random_past_excludes_today_and_future() {
        let puzzles = library();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let chosen =
                select_puzzle(&puzzles, PuzzleKind::RandomPast, date("2026-10-19"), &mut rng).unwrap();
            assert!(chosen.date.unwrap() < date("2026-10-19"));
        }
        assert!(select_puzzle(&puzzles, PuzzleKind::RandomPast, date("2026-10-15"), &mut rng).is_err());
    }

    #[test]
    fn test_undated_puzzles_are_never_picked_by_date() {
        let puzzles = vec![fallback_raw_puzzle()];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_puzzle(&puzzles, PuzzleKind::Today, date("2026-10-19"), &mut rng).is_err());
    }

    #[test]
    fn test_invalid_client_date() {
        assert_matches!(parse_client_date("19/10/2026"), Err(OddestOneOutError::InvalidDate(_)));
    }

    struct CountingSheet {
        loads: AtomicUsize,
        fail_after: usize,
        text: String,
    }

    impl SheetLoader for CountingSheet {
        async fn load(&self) -> Result<String> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_after {
                Err(OddestOneOutError::PuzzleSource("sheet offline".to_string()))
            } else {
                Ok(self.text.clone())
            }
        }

        fn describe(&self) -> String {
            "counting sheet".to_string()
        }
    }

    fn counting_sheet(fail_after: usize) -> CountingSheet {
        let line = "2026-10-19,NASA space programs,3,why,\
                    Planets,Mars,Venus,Saturn,Apollo,e1,\
                    Greek Gods,Zeus,Athena,Hermes,Gemini,e2,\
                    Card Games,Poker,Bridge,Rummy,Solitaire,e3,\
                    Zodiac Signs,Leo,Aries,Virgo,Mercury,e4";
        CountingSheet {
            loads: AtomicUsize::new(0),
            fail_after,
            text: format!("{}\n{}\n", crate::services::sheet::sheet_header(), line),
        }
    }

    #[tokio::test]
    async fn test_cache_serves_within_ttl() {
        let source = SheetPuzzleSource::new(counting_sheet(usize::MAX), Duration::from_secs(60));
        source.puzzles().await.unwrap();
        source.puzzles().await.unwrap();
        assert_eq!(source.loader.loads.load(Ordering::SeqCst), 1);

        let cache = source.cache_snapshot().await.unwrap();
        assert_eq!(cache.ttl, Duration::from_secs(60));
        assert!(cache.is_fresh(Instant::now()));
    }

    #[tokio::test]
    async fn test_cache_reloads_when_stale_and_keeps_stale_copy_on_failure() {
        let source = SheetPuzzleSource::new(counting_sheet(1), Duration::ZERO);
        assert_eq!(source.puzzles().await.unwrap().len(), 1);
        // Second load fails; the first copy is still served.
        assert_eq!(source.puzzles().await.unwrap().len(), 1);
        assert_eq!(source.loader.loads.load(Ordering::SeqCst), 2);
    }

    struct StalledSheet;

    impl SheetLoader for StalledSheet {
        async fn load(&self) -> Result<String> {
            std::future::pending().await
        }

        fn describe(&self) -> String {
            "stalled sheet".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_load_times_out_into_fallback() {
        let source = SheetPuzzleSource::new(StalledSheet, Duration::from_secs(60))
            .with_load_timeout(Duration::from_secs(2));
        assert_matches!(
            source.puzzles().await,
            Err(OddestOneOutError::PuzzleSource(reason)) if reason.contains("timed out")
        );

        let raw = load_raw_puzzle(&source, PuzzleKind::Today, "2026-10-19").await;
        assert_eq!(raw, fallback_raw_puzzle());
    }

    #[tokio::test]
    async fn test_first_load_failure_surfaces() {
        let source = SheetPuzzleSource::new(counting_sheet(0), Duration::from_secs(60));
        assert!(source.puzzles().await.is_err());
        assert!(source.cache_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_load_puzzle_falls_back_on_failure() {
        let empty = StaticPuzzleSource::default();
        let puzzle = load_puzzle(&empty, PuzzleKind::Today, "2026-10-19").await;
        assert_eq!(puzzle.ultimate_word().text, "Solitaire");
        assert_eq!(puzzle.date, None);

        let bad_date = load_raw_puzzle(&StaticPuzzleSource::new(library()), PuzzleKind::Today, "yesterday").await;
        assert_eq!(bad_date, fallback_raw_puzzle());
    }

    #[tokio::test]
    async fn test_load_puzzle_replaces_malformed_content() {
        let mut broken = dated("2026-10-19", "broken");
        broken.categories[0].words.truncate(3);
        let source = StaticPuzzleSource::new(vec![broken]);
        let raw = load_raw_puzzle(&source, PuzzleKind::Today, "2026-10-19").await;
        assert_eq!(raw, fallback_raw_puzzle());
    }

    #[tokio::test]
    async fn test_load_puzzle_uses_source_content() {
        let source = StaticPuzzleSource::new(library());
        let puzzle = load_puzzle(&source, PuzzleKind::Today, "2026-10-20").await;
        assert_eq!(puzzle.meta_category, "nineteenth");
        assert_eq!(puzzle.date, Some(date("2026-10-19")));
    }

    #[test]
    fn test_configured_source_without_sheet_is_static() {
        let source = ConfiguredSource::from_config(&SheetConfig::default());
        assert!(matches!(source, ConfiguredSource::Static(_)));

        let source = ConfiguredSource::from_config(&SheetConfig {
            path: Some(PathBuf::from("puzzles.csv")),
            ..SheetConfig::default()
        });
        assert!(matches!(source, ConfiguredSource::File(_)));
    }
}
