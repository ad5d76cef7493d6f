//! Blocktris: a minimal falling-block puzzle game in the terminal.

mod app;
mod game;
mod input;
mod render;
mod session;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_ROWS: u16 = 20;
pub const DEFAULT_COLUMNS: u16 = 10;
pub const DEFAULT_TICK_MS: u64 = 500;
pub const DEFAULT_CLEAR_BONUS: u32 = 100;

/// Every catalog shape must fit on an empty board.
const MIN_ROWS: u16 = 2;
const MIN_COLUMNS: u16 = 4;
const MAX_SIDE: u16 = 100;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rows: u16,
    pub columns: u16,
    pub tick: Duration,
    pub clear_bonus: u32,
    pub scoring: ScoringRule,
    pub seed: Option<u64>,
    pub animate: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            clear_bonus: DEFAULT_CLEAR_BONUS,
            scoring: ScoringRule::Pass,
            seed: None,
            animate: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must be at least 2x4 (rows x columns), got {rows}x{columns}")]
    BoardTooSmall { rows: u16, columns: u16 },
    #[error("board must be at most 100x100, got {rows}x{columns}")]
    BoardTooLarge { rows: u16, columns: u16 },
    #[error("tick period must be greater than zero")]
    ZeroTick,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let (rows, columns) = (args.rows, args.columns);
        if rows < MIN_ROWS || columns < MIN_COLUMNS {
            return Err(ConfigError::BoardTooSmall { rows, columns });
        }
        if rows > MAX_SIDE || columns > MAX_SIDE {
            return Err(ConfigError::BoardTooLarge { rows, columns });
        }
        if args.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        Ok(Self {
            rows,
            columns,
            tick: Duration::from_millis(args.tick_ms),
            clear_bonus: args.clear_bonus,
            scoring: args.scoring,
            seed: args.seed,
            animate: !args.no_animation,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        tracing::warn!(%err, "theme could not be loaded, using defaults");
        theme::Theme::for_palette(args.palette)
    });
    install_panic_hook();

    tracing::info!(?config, "starting");
    let mut app = App::new(config, theme, args.no_menu);
    app.run()
}

/// `RUST_LOG`-style directives; anything they leave unset logs at info.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Tracing goes to a file or nowhere; the terminal belongs to the UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

/// Leave raw mode and the alternate screen before the default panic output.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        app::restore_terminal();
        original_hook(panic_info);
    }));
}

/// Minimal falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blocktris",
    version,
    about = "Minimal falling-block puzzle in the terminal. Complete rows to clear them.",
    long_about = "Blocktris is a small terminal take on the classic falling-block puzzle.\n\n\
        Seven pieces fall one row per tick. Fill a row edge-to-edge to clear it.\n\
        The game ends when a new piece has no room to appear.\n\n\
        CONTROLS:\n  Left/Right  Move    Up   Rotate    Down  Drop one row\n  \
        Enter       Start   R    Reset     Q / Esc  Quit"
)]
pub struct Args {
    /// Board height in rows.
    #[arg(long, default_value_t = DEFAULT_ROWS, value_name = "ROWS")]
    pub rows: u16,

    /// Board width in columns.
    #[arg(long, default_value_t = DEFAULT_COLUMNS, value_name = "COLS")]
    pub columns: u16,

    /// Milliseconds between gravity ticks.
    #[arg(long, default_value_t = DEFAULT_TICK_MS, value_name = "MS")]
    pub tick_ms: u64,

    /// Points awarded per scoring event.
    #[arg(long, default_value_t = DEFAULT_CLEAR_BONUS, value_name = "POINTS")]
    pub clear_bonus: u32,

    /// When points are awarded: every settled piece (pass), settles that clear rows (clear), or per cleared row (per-row).
    #[arg(long, default_value = "pass")]
    pub scoring: ScoringRule,

    /// Seed for the piece sequence (random if not set).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses built-in colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the row-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the title screen and start immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Write logs to this file (filtered by RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScoringRule {
    /// Flat bonus every time a piece settles.
    #[default]
    Pass,
    /// Flat bonus when a settle clears at least one row.
    Clear,
    /// Bonus for each cleared row.
    PerRow,
}
