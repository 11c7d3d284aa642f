//! App: terminal init, main loop, pointer and key handling.

use crate::Args;
use crate::host::{BellAudio, TerminalScene};
use crate::input::{Action, PointerKind, key_to_action, mouse_to_pointer};
use crate::theme::Theme;
use crate::ui::{View, skip_button_rect};
use anyhow::Result;
use chaindots::grid::CellPos;
use chaindots::level::{Level, SkipState};
use chaindots::{Game, GameConfig, GameEvent};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::{Position, Rect};
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

const BANNER_TIME: Duration = Duration::from_millis(1500);
/// Longest frame fed to the game; a stalled terminal must not fast-forward the clock.
const MAX_FRAME: Duration = Duration::from_millis(250);

type TerminalGame = Game<TerminalScene, BellAudio>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Ended,
}

/// Centred notice shown for a moment ("Level 2", "No more moves").
#[derive(Debug, Clone)]
pub struct Banner {
    pub text: String,
    shown_at: Instant,
}

impl Banner {
    /// Show `text`, joining it to a banner raised in the same frame.
    fn raise(slot: &mut Option<Self>, text: &str, now: Instant) {
        match slot {
            Some(banner) if banner.shown_at == now => {
                banner.text.push_str(" · ");
                banner.text.push_str(text);
            }
            _ => {
                *slot = Some(Self {
                    text: text.to_string(),
                    shown_at: now,
                });
            }
        }
    }
}

/// TachyonFX fade over cleared dots.
#[derive(Default)]
pub struct Fade {
    pub effect: Option<Effect>,
    /// Last time the effect was processed (for delta).
    pub last: Option<Instant>,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    game: TerminalGame,
    screen: Screen,
    banner: Option<Banner>,
    pulse: Option<(CellPos, Instant)>,
    fade: Fade,
    last_frame: Instant,
    size: (u16, u16),
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let size = crossterm::terminal::size().unwrap_or((80, 24));
        let game = new_game(&args, &config, size);
        Ok(Self {
            args,
            config,
            theme,
            game,
            screen: Screen::Playing,
            banner: None,
            pulse: None,
            fade: Fade::default(),
            last_frame: Instant::now(),
            size,
        })
    }

    fn reset_game(&mut self) {
        self.game = new_game(&self.args, &self.config, self.size);
        self.screen = Screen::Playing;
        self.banner = None;
        self.pulse = None;
        self.fade = Fade::default();
        self.last_frame = Instant::now();
        info!("new game");
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let (cols, rows) = crossterm::terminal::size()?;
        self.resize(cols, rows);

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
        self.game.scene_mut().resize(cols, rows);
        self.game.relayout();
        debug!(cols, rows, "relayout");
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            let dt = now.saturating_duration_since(self.last_frame).min(MAX_FRAME);
            self.last_frame = now;
            if self.screen == Screen::Playing {
                self.game.tick(dt);
                self.handle_game_events(now);
            }
            if self
                .banner
                .as_ref()
                .is_some_and(|b| now.saturating_duration_since(b.shown_at) >= BANNER_TIME)
            {
                self.banner = None;
            }

            let frame_view = view(
                &self.game,
                self.screen,
                self.banner.as_ref(),
                self.pulse,
                now,
                self.args.no_animation,
            );
            terminal.draw(|f| crate::ui::draw(f, &frame_view, &self.theme, &mut self.fade))?;

            if self.fade.effect.as_ref().is_some_and(Effect::done) {
                self.fade = Fade::default();
                self.game.scene_mut().clear_ghosts();
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match (self.screen, key_to_action(key)) {
                            (_, Action::Quit) => return Ok(()),
                            (Screen::Playing, Action::Skip) => self.skip(),
                            (Screen::Ended, Action::Restart) => self.reset_game(),
                            _ => {}
                        }
                    }
                    Event::Mouse(mouse) if self.screen == Screen::Playing => {
                        if let Some(pointer) = mouse_to_pointer(mouse) {
                            let on_skip = pointer.kind == PointerKind::Down
                                && self.game.progression().skip_state() == SkipState::Available
                                && skip_button_rect(self.area())
                                    .contains(Position::new(pointer.column, pointer.row));
                            if on_skip {
                                self.skip();
                                continue;
                            }
                            let (x, y) = pointer.point(0, 0);
                            match pointer.kind {
                                PointerKind::Down => self.game.pointer_down(x, y),
                                PointerKind::Move => self.game.pointer_move(x, y),
                                PointerKind::Up => self.game.pointer_up(x, y),
                            }
                        }
                    }
                    Event::Resize(cols, rows) => self.resize(cols, rows),
                    _ => {}
                }
            }
        }
    }

    fn area(&self) -> Rect {
        Rect::new(0, 0, self.size.0, self.size.1)
    }

    fn skip(&mut self) {
        if self.game.request_skip() {
            Banner::raise(&mut self.banner, "Skipped", Instant::now());
        }
    }

    fn handle_game_events(&mut self, now: Instant) {
        for event in self.game.drain_events() {
            match event {
                GameEvent::CommitStarted { .. } => self.fade = Fade::default(),
                GameEvent::Stalemate { .. } => Banner::raise(&mut self.banner, "No more moves", now),
                GameEvent::LevelAdvanced { level } => {
                    Banner::raise(&mut self.banner, &level.to_string(), now);
                    // level one's dots were laid out on the old geometry
                    self.fade = Fade::default();
                    self.game.scene_mut().clear_ghosts();
                }
                GameEvent::TutorialPulse { cell } => self.pulse = Some((cell, now)),
                GameEvent::SkipAvailable => debug!("skip offered"),
                GameEvent::GameEnded { reason } => {
                    info!(?reason, merges = self.game.progression().merges(), "round over");
                    self.screen = Screen::Ended;
                    self.banner = None;
                    self.fade = Fade::default();
                    self.game.scene_mut().clear_ghosts();
                }
                _ => {}
            }
        }
    }
}

fn view<'a>(
    game: &'a TerminalGame,
    screen: Screen,
    banner: Option<&'a Banner>,
    pulse: Option<(CellPos, Instant)>,
    now: Instant,
    no_animation: bool,
) -> View<'a> {
    let progression = game.progression();
    View {
        screen,
        grid: game.grid(),
        scene: game.scene(),
        level: progression.level(),
        merges: progression.merges(),
        skip: progression.skip_state(),
        remaining: (progression.level() == Level::Two).then(|| game.timer().remaining()),
        hand: game.tutorial().pose(),
        pulse,
        banner,
        end_reason: progression.end_reason(),
        now,
        no_animation,
    }
}

fn new_game(args: &Args, config: &GameConfig, (cols, rows): (u16, u16)) -> TerminalGame {
    let scene = TerminalScene::new(cols, rows, config.gravity_animation, !args.no_animation);
    Game::new(config.clone(), scene, BellAudio::new(args.bell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn banners_raised_in_one_frame_are_joined() {
        let now = Instant::now();
        let mut slot = None;
        Banner::raise(&mut slot, "No more moves", now);
        Banner::raise(&mut slot, "Level 2", now);
        assert_eq!(slot.as_ref().unwrap().text, "No more moves · Level 2");
        Banner::raise(&mut slot, "Skipped", now + Duration::from_secs(1));
        assert_eq!(slot.unwrap().text, "Skipped");
    }

    fn drag(app: &mut App, from: (usize, usize), to: (usize, usize)) {
        let geometry = *app.game.grid().geometry();
        let (x, y) = geometry.cell_center(CellPos::new(from.0, from.1));
        app.game.pointer_down(x, y);
        let (x, y) = geometry.cell_center(CellPos::new(to.0, to.1));
        app.game.pointer_move(x, y);
        app.game.pointer_up(x, y);
        app.game.tick(Duration::from_secs(1));
    }

    #[test]
    fn level_change_drops_old_ghosts() {
        let args = Args::try_parse_from(["chaindots", "--no-tutorial", "--seed", "5"]).unwrap();
        let config = crate::game_config(&args).unwrap();
        let mut app = App::new(args, config, Theme::default()).unwrap();
        drag(&mut app, (0, 1), (0, 2));
        drag(&mut app, (0, 0), (0, 1));
        assert_eq!(app.game.level(), Level::Two);
        assert!(!app.game.scene().ghosts().is_empty());

        app.handle_game_events(Instant::now());
        assert!(app.game.scene().ghosts().is_empty());
        assert!(app.fade.effect.is_none());
        assert_eq!(app.banner.as_ref().unwrap().text, "Level 2");
    }
}
