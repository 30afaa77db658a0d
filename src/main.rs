// main.rs - Oddest One Out server and puzzle printer
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use oddest_one_out::game::sequence::AnimationTimings;
use oddest_one_out::logging::setup_logging;
use oddest_one_out::services::puzzle_source::{
    load_puzzle, parse_client_date, ConfiguredSource, PuzzleKind, SheetConfig,
};
use oddest_one_out::services::session_manager::SessionLimits;
use oddest_one_out::servers::{WebUiConfig, WebUiServer};
use oddest_one_out::{GameSession, SessionManager};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PuzzleKindCli {
    Today,
    RandomPast,
}

impl From<PuzzleKindCli> for PuzzleKind {
    fn from(cli: PuzzleKindCli) -> Self {
        match cli {
            PuzzleKindCli::Today => PuzzleKind::Today,
            PuzzleKindCli::RandomPast => PuzzleKind::RandomPast,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RunMode {
    /// HTTP API + static web client
    Serve,
    /// Print one freshly shuffled puzzle as JSON and exit
    Print,
}

#[derive(Parser, Debug)]
#[command(name = "oddest_one_out", version, about)]
struct Config {
    #[arg(long, value_enum, default_value = "serve")]
    mode: RunMode,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// Local CSV export of the puzzle sheet
    #[arg(long)]
    sheet_path: Option<PathBuf>,

    /// Published CSV URL of the puzzle sheet (takes precedence over --sheet-path)
    #[arg(long)]
    sheet_url: Option<String>,

    /// How long a loaded sheet is reused before it is fetched again
    #[arg(long, default_value_t = 300)]
    cache_ttl_secs: u64,

    /// Give up on a sheet load after this long and serve the fallback puzzle
    #[arg(long, default_value_t = 10)]
    sheet_timeout_secs: u64,

    /// Drop games that received no command for this long
    #[arg(long, default_value_t = 1800)]
    session_idle_secs: u64,

    /// Upper bound on live games kept in memory
    #[arg(long, default_value_t = 10_000)]
    max_sessions: usize,

    /// Also write rotated log files into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Puzzle date for print mode (YYYY-MM-DD, default: today)
    #[arg(long)]
    date: Option<String>,

    /// Which puzzle print mode loads
    #[arg(long, value_enum, default_value = "today")]
    kind: PuzzleKindCli,
}

impl Config {
    fn sheet_config(&self) -> SheetConfig {
        SheetConfig {
            path: self.sheet_path.clone(),
            url: self.sheet_url.clone(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            load_timeout: Duration::from_secs(self.sheet_timeout_secs),
        }
    }
}

// ============================================================================
// MODES
// ============================================================================

async fn serve(config: &Config, source: ConfiguredSource) -> oddest_one_out::Result<()> {
    let manager = SessionManager::new(source, AnimationTimings::default()).with_limits(SessionLimits {
        idle_ttl: Duration::from_secs(config.session_idle_secs),
        max_sessions: config.max_sessions,
    });
    let web_config = WebUiConfig {
        port: config.port,
        host: config.host.clone(),
    };
    WebUiServer::new(web_config, manager).start().await
}

async fn print(config: &Config, source: ConfiguredSource) -> oddest_one_out::Result<()> {
    let date = match &config.date {
        Some(date) => {
            parse_client_date(date)?;
            date.clone()
        }
        None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };
    let puzzle = load_puzzle(&source, config.kind.into(), &date).await;
    let session = GameSession::new(puzzle);
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

// ============================================================================
// FONCTION PRINCIPALE
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    let _logger = setup_logging(&config.log_level, config.log_dir.as_deref())?;

    log::info!("🧩 {} v{}", oddest_one_out::NAME, oddest_one_out::VERSION);
    let source = ConfiguredSource::from_config(&config.sheet_config());

    match config.mode {
        RunMode::Serve => serve(&config, source).await?,
        RunMode::Print => print(&config, source).await?,
    }
    Ok(())
}
