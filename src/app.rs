//! App: terminal init, main loop, key handling.

use crate::GameConfig;
use crate::game::Outcome;
use crate::input::{Action, key_to_action};
use crate::session::Session;
use crate::theme::Theme;
use crate::ui::{self, ClearFlash};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Redraw cadence while waiting for input or the next tick.
const FRAME_MS: u64 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Title,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    screen: Screen,
    flash: ClearFlash,
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    use crossterm::{
        execute,
        terminal::{LeaveAlternateScreen, disable_raw_mode},
    };
    let _ = disable_raw_mode();
    let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, skip_title: bool) -> Self {
        let mut app = Self {
            session: Session::new(&config),
            config,
            theme,
            screen: Screen::Title,
            flash: ClearFlash::default(),
        };
        if skip_title {
            app.start(Instant::now());
        }
        app
    }

    /// Start entry point: leave the title screen and begin ticking.
    fn start(&mut self, now: Instant) {
        self.screen = Screen::Playing;
        self.session.start(now);
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        let action = key_to_action(key);
        match (self.screen, action) {
            (_, Action::Quit) => return Flow::Quit,
            (Screen::Title, Action::Start) => self.start(now),
            (Screen::Title, _) => {}
            (Screen::Playing, action) => {
                if let Some(event) = action.game_event() {
                    self.session.push(event);
                }
            }
        }
        Flow::Continue
    }

    /// React to what the queue produced: flash cleared rows, drop the flash on reset.
    fn absorb(&mut self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            match outcome {
                Outcome::Settled {
                    cleared_rows,
                    game_over,
                } => {
                    if !cleared_rows.is_empty() {
                        info!(
                            rows = cleared_rows.len(),
                            score = self.session.state().score,
                            "rows cleared"
                        );
                        if self.config.animate {
                            self.flash.trigger(cleared_rows);
                        }
                    }
                    if game_over {
                        debug!("tick timer stopped");
                    }
                }
                Outcome::Reset => self.flash.cancel(),
                Outcome::Moved | Outcome::Rejected | Outcome::Ignored => {}
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        info!(
            rows = self.config.rows,
            columns = self.config.columns,
            tick_ms = self.config.tick.as_millis() as u64,
            "terminal ready"
        );

        let result = self.run_loop(&mut terminal);

        restore_terminal();
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame = Duration::from_millis(FRAME_MS);
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                ui::draw(
                    f,
                    self.screen,
                    self.session.state(),
                    &self.theme,
                    &mut self.flash,
                    now,
                );
            })?;
            self.flash.sweep();

            let timeout = self
                .session
                .next_tick_in(now)
                .map_or(frame, |until| until.min(frame));
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key, Instant::now()) == Flow::Quit {
                            info!(score = self.session.state().score, "quit");
                            return Ok(());
                        }
                    }
                }
            }

            let outcomes = self.session.pump(Instant::now());
            self.absorb(outcomes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn app(skip_title: bool) -> App {
        let config = GameConfig {
            seed: Some(21),
            ..GameConfig::default()
        };
        App::new(config, Theme::default(), skip_title)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_title_ignores_game_keys_until_start() {
        let mut app = app(false);
        let now = Instant::now();
        assert_eq!(app.screen, Screen::Title);
        assert!(!app.session.is_ticking());

        let col = app.session.state().piece.origin_col;
        assert_eq!(app.handle_key(key(KeyCode::Left), now), Flow::Continue);
        assert!(app.session.pump(now).is_empty());
        assert_eq!(app.session.state().piece.origin_col, col);

        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.screen, Screen::Playing);
        assert!(app.session.is_ticking());
    }

    #[test]
    fn test_playing_keys_reach_the_session() {
        let mut app = app(true);
        let now = Instant::now();
        let col = app.session.state().piece.origin_col;
        app.handle_key(key(KeyCode::Right), now);
        assert_eq!(app.session.pump(now), vec![Outcome::Moved]);
        assert_eq!(app.session.state().piece.origin_col, col + 1);
    }

    #[test]
    fn test_quit_from_any_screen() {
        let now = Instant::now();
        assert_eq!(app(false).handle_key(key(KeyCode::Char('q')), now), Flow::Quit);
        assert_eq!(app(true).handle_key(key(KeyCode::Esc), now), Flow::Quit);
    }

    #[test]
    fn test_cleared_rows_trigger_flash_and_reset_cancels_it() {
        let mut app = app(true);
        app.absorb(vec![Outcome::Settled {
            cleared_rows: vec![19],
            game_over: false,
        }]);
        assert!(app.flash.is_active());
        app.absorb(vec![Outcome::Reset]);
        assert!(!app.flash.is_active());
    }

    #[test]
    fn test_no_flash_without_animation() {
        let config = GameConfig {
            animate: false,
            ..GameConfig::default()
        };
        let mut app = App::new(config, Theme::default(), true);
        app.absorb(vec![Outcome::Settled {
            cleared_rows: vec![19],
            game_over: false,
        }]);
        assert!(!app.flash.is_active());
    }
}
