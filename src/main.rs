//! MaMatch: match-3 marble puzzle game in the terminal.

mod app;
mod board;
mod engine;
mod game;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (board size, palette
/// size, cascade pacing).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub size: usize,
    pub colors: usize,
    pub step_delay_ms: u64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        size: args.size as usize,
        colors: args.colors as usize,
        step_delay_ms: args.step_delay_ms,
        no_animation: args.no_animation,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Match-3 marble puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "mamatch",
    version,
    about = "Match-3 marble puzzle in the terminal. Swap adjacent marbles to line up 3+ of a colour; long runs make special items.",
    long_about = "MaMatch is a terminal match-3 puzzle game.\n\n\
        Swap adjacent marbles to line up three or more of one colour. Runs of four \
        leave a line-clearing item behind; runs of five leave a bomb. Chain cascades \
        for combo multipliers. The game ends when no legal swap remains.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space  Select / swap\n  N or R      New game      P            Pause       Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space        Select / swap\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme) and --seed for a reproducible board."
)]
pub struct Args {
    /// Board side length (cells per row and column).
    #[arg(short, long, default_value = "7", value_name = "N",
          value_parser = clap::value_parser!(u16).range(4..=16))]
    pub size: u16,

    /// Number of marble colours in play (2-6). Fewer colours = easier boards.
    #[arg(short, long, default_value = "6", value_name = "N",
          value_parser = clap::value_parser!(u16).range(2..=6))]
    pub colors: u16,

    /// Random seed for the deal. Same seed + same swaps = same game.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses the built-in
    /// pastel set if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Delay in ms between cascade steps (pop, fall, refill pacing).
    #[arg(long, default_value = "160", value_name = "MS")]
    pub step_delay_ms: u64,

    /// Disable the clear animation (cascade still paces by --step-delay-ms).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip main menu and start a game immediately.
    #[arg(long)]
    pub no_menu: bool,
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
