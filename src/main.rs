//! chaindots: drag chains of same-coloured dots in the terminal.

mod app;
mod host;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use chaindots::GameConfig;
use chaindots::pattern::LevelLayout;
use clap::{Parser, ValueEnum};
use host::Bell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        warn!(%err, "theme not loaded, using One Dark");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = game_config(&args)?;
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Logs go to `--log-file` only; the terminal belongs to the UI.
fn init_tracing(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}

fn load_layout(path: Option<&Path>, builtin: fn() -> LevelLayout) -> Result<LevelLayout> {
    match path {
        Some(p) => LevelLayout::load(p).with_context(|| format!("loading level {}", p.display())),
        None => Ok(builtin()),
    }
}

fn game_config(args: &Args) -> Result<GameConfig> {
    Ok(GameConfig {
        level_one: load_layout(args.level1.as_deref(), LevelLayout::level_one)?,
        level_two: load_layout(args.level2.as_deref(), LevelLayout::level_two)?,
        settle_delay: Duration::from_millis(args.settle_ms),
        gravity_animation: if args.no_animation {
            Duration::ZERO
        } else {
            Duration::from_millis(args.fall_ms)
        },
        skip_end_delay: Duration::from_millis(args.skip_delay_ms),
        skip_threshold: args.skip_after,
        round_seconds: args.round_secs,
        tutorial: !args.no_tutorial,
        seed: args.seed,
        ..GameConfig::default()
    })
}

/// Dot-chain puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "chaindots",
    version,
    about = "Two-level dot-linking puzzle in the terminal. Drag a chain of same-coloured dots, release to clear it.",
    long_about = "chaindots is a terminal puzzle played with the mouse.\n\n\
        Press on a dot and drag through orthogonally adjacent dots of the same colour; drag \
        back to undo the last link. Release to clear the chain: a new dot takes its place when \
        a neighbour lends it a colour, and the columns settle.\n\n\
        Level 1 is a short warm-up. Level 2 is played against the clock; after a few merges \
        you may skip the rest.\n\n\
        CONTROLS:\n  Mouse drag  Link dots   S / Tab  Skip (when offered)\n  R          Restart     Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level 1 layout file (rows of R G Y B P, `.` for holes, optional `size COLSxROWS`).
    #[arg(long, value_name = "FILE")]
    pub level1: Option<PathBuf>,

    /// Level 2 layout file.
    #[arg(long, value_name = "FILE")]
    pub level2: Option<PathBuf>,

    /// Level 2 round length in seconds.
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub round_secs: u32,

    /// Level 2 merges before skipping is offered.
    #[arg(long, default_value = "3", value_name = "N")]
    pub skip_after: u32,

    /// Delay between clearing a chain, spawning its replacement and settling the columns.
    #[arg(long, default_value = "125", value_name = "MS")]
    pub settle_ms: u64,

    /// Length of the falling animation.
    #[arg(long, default_value = "250", value_name = "MS")]
    pub fall_ms: u64,

    /// Delay between skipping and the end screen.
    #[arg(long, default_value = "400", value_name = "MS")]
    pub skip_delay_ms: u64,

    /// Seed for the random dots outside a layout's pattern.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not show the level 1 hint.
    #[arg(long)]
    pub no_tutorial: bool,

    /// Disable fades and falling animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Ring the terminal bell on merges (or on every link with `all`).
    #[arg(long, default_value = "off")]
    pub bell: Bell,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs to this file (filter with RUST_LOG).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_config() {
        let args = Args::try_parse_from(["chaindots"]).unwrap();
        let config = game_config(&args).unwrap();
        let base = GameConfig::default();
        assert_eq!(config.round_seconds, base.round_seconds);
        assert_eq!(config.skip_threshold, base.skip_threshold);
        assert_eq!(config.settle_delay, base.settle_delay);
        assert_eq!(config.gravity_animation, base.gravity_animation);
        assert_eq!(config.skip_end_delay, base.skip_end_delay);
        assert!(config.tutorial);
        assert_eq!(config.level_two, LevelLayout::level_two());
    }

    #[test]
    fn flags_fold_into_config() {
        let args = Args::try_parse_from([
            "chaindots",
            "--round-secs",
            "30",
            "--skip-after",
            "5",
            "--no-tutorial",
            "--no-animation",
            "--seed",
            "9",
            "--bell",
            "merge",
            "--palette",
            "contrast",
        ])
        .unwrap();
        let config = game_config(&args).unwrap();
        assert_eq!(config.round_seconds, 30);
        assert_eq!(config.skip_threshold, 5);
        assert!(!config.tutorial);
        assert_eq!(config.gravity_animation, Duration::ZERO);
        assert_eq!(config.seed, Some(9));
        assert_eq!(args.bell, Bell::Merge);
        assert_eq!(args.palette, Palette::HighContrast);
    }

    #[test]
    fn missing_level_file_is_an_error() {
        let args =
            Args::try_parse_from(["chaindots", "--level1", "/nonexistent/level.txt"]).unwrap();
        assert!(game_config(&args).is_err());
    }
}
