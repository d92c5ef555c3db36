//! App: terminal init, main loop, cascade pacing and key handling.

use crate::engine::StepStatus;
use crate::game::GameSession;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Board side lengths selectable from the menu.
pub const BOARD_CHOICES: [u16; 3] = [7, 8, 9];
/// Palette sizes selectable from the menu.
pub const COLOR_CHOICES: [u16; 3] = [4, 5, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Board,
    Colors,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_size: u16,
    pub selected_colors: u16,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::Board,
            selected_size: BOARD_CHOICES[0],
            selected_colors: COLOR_CHOICES[2],
            animation_start: Instant::now(),
        }
    }
}

fn cycle(choices: &[u16], current: u16, forward: bool) -> u16 {
    let i = choices.iter().position(|&c| c == current).unwrap_or(0);
    let n = choices.len();
    let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
    choices[next]
}

/// Seed for a new deal when none was given on the CLI.
fn seed_from_clock() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    session: GameSession,
    screen: Screen,
    paused: bool,
    /// Last time a cascade step was applied; next step waits step_delay_ms.
    last_step: Instant,
    /// TachyonFX fade for the cells cleared by the latest step.
    clear_effect: Option<Effect>,
    clear_effect_process_time: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
    /// Best score as last written to disk; avoids redundant saves.
    saved_best: u32,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let best = crate::highscores::load_best_score();
        let seed = args.seed.unwrap_or_else(seed_from_clock);
        let session = GameSession::new(config.size, config.colors, seed, best);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let menu_state = MenuState {
            selected_size: args.size,
            selected_colors: args.colors,
            ..MenuState::default()
        };
        Ok(Self {
            args,
            config,
            theme,
            session,
            screen,
            paused: false,
            last_step: Instant::now(),
            clear_effect: None,
            clear_effect_process_time: None,
            menu_state,
            quit_selected: QuitOption::Resume,
            saved_best: best,
        })
    }

    /// Discard any in-flight cascade and start a fresh deal. The best score
    /// carries over; everything else is rebuilt from scratch.
    fn reset_game(&mut self) {
        let seed = self.args.seed.unwrap_or_else(seed_from_clock);
        let best = self.session.best_score;
        self.session = GameSession::new(self.config.size, self.config.colors, seed, best);
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_step = Instant::now();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
    }

    fn save_best(&mut self) {
        if self.session.best_score > self.saved_best {
            // Persistence failure never touches game state.
            if crate::highscores::save_best_score(self.session.best_score).is_ok() {
                self.saved_best = self.session.best_score;
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let quit_selected =
                (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    self.paused,
                    &self.theme,
                    &mut self.menu_state,
                    quit_selected,
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                    self.config.no_animation,
                    f.area(),
                );
            })?;

            // Cascade pacing: one engine step per delay interval. The engine
            // itself is pure; all timing lives here.
            if self.screen == Screen::Playing && !self.paused && self.session.is_busy() {
                let interval = Duration::from_millis(self.config.step_delay_ms);
                if self.last_step.elapsed() >= interval {
                    self.last_step = Instant::now();
                    let status = self.session.tick();
                    // New clear set: rebuild the fade effect for it.
                    self.clear_effect = None;
                    self.clear_effect_process_time = None;
                    self.save_best();
                    if status == Some(StepStatus::GameOver) {
                        self.save_best();
                        self.screen = Screen::GameOver;
                    }
                }
            }

            let timeout = Duration::from_millis(16);
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        if self.handle_key(action)? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(true),
                Action::CursorLeft | Action::CursorRight => {
                    let forward = action == Action::CursorRight;
                    match self.menu_state.current_tab {
                        MenuTab::Board => {
                            self.menu_state.selected_size =
                                cycle(&BOARD_CHOICES, self.menu_state.selected_size, forward);
                        }
                        MenuTab::Colors => {
                            self.menu_state.selected_colors =
                                cycle(&COLOR_CHOICES, self.menu_state.selected_colors, forward);
                        }
                        MenuTab::Start => {}
                    }
                }
                Action::CursorDown => {
                    self.menu_state.current_tab = match self.menu_state.current_tab {
                        MenuTab::Board => MenuTab::Colors,
                        MenuTab::Colors => MenuTab::Start,
                        MenuTab::Start => MenuTab::Board,
                    };
                }
                Action::CursorUp => {
                    self.menu_state.current_tab = match self.menu_state.current_tab {
                        MenuTab::Board => MenuTab::Start,
                        MenuTab::Colors => MenuTab::Board,
                        MenuTab::Start => MenuTab::Colors,
                    };
                }
                Action::Select | Action::NewGame => {
                    if self.menu_state.current_tab == MenuTab::Start
                        || action == Action::NewGame
                    {
                        self.config.size = self.menu_state.selected_size as usize;
                        self.config.colors = self.menu_state.selected_colors as usize;
                        self.reset_game();
                    } else {
                        self.menu_state.current_tab = MenuTab::Start;
                    }
                }
                _ => {}
            },
            Screen::Playing => {
                if self.paused {
                    match action {
                        Action::Pause => self.paused = false,
                        Action::Quit => {
                            self.screen = Screen::QuitMenu;
                            self.quit_selected = QuitOption::Resume;
                        }
                        _ => {}
                    }
                } else {
                    match action {
                        Action::Pause => self.paused = true,
                        Action::Quit => {
                            self.screen = Screen::QuitMenu;
                            self.quit_selected = QuitOption::Resume;
                        }
                        Action::NewGame => self.reset_game(),
                        Action::CursorUp => self.session.move_cursor(-1, 0),
                        Action::CursorDown => self.session.move_cursor(1, 0),
                        Action::CursorLeft => self.session.move_cursor(0, -1),
                        Action::CursorRight => self.session.move_cursor(0, 1),
                        Action::Select => self.session.select(),
                        Action::None => {}
                    }
                }
            }
            Screen::QuitMenu => match action {
                Action::CursorDown | Action::CursorRight => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::MainMenu,
                        QuitOption::MainMenu => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::CursorUp | Action::CursorLeft => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::MainMenu => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::MainMenu,
                    };
                }
                Action::Select => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::MainMenu => {
                        self.save_best();
                        self.screen = Screen::Menu;
                    }
                    QuitOption::Exit => {
                        self.save_best();
                        return Ok(true);
                    }
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return Ok(true),
                Action::NewGame => self.reset_game(),
                Action::Select => self.screen = Screen::Menu,
                _ => {}
            },
        }
        Ok(false)
    }
}
