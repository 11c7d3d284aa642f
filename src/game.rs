//! Game facade: owns the board and the state machines, turns pointer and frame input into
//! grid mutations, and queues [`GameEvent`]s for the host.

use crate::chain::{ChainChange, CommitOutcome, CommitStep, CommitTask, SelectionEngine};
use crate::config::GameConfig;
use crate::grid::{CellPos, DotColor, GravityMove, Grid};
use crate::level::{EndReason, Level, Progression};
use crate::scene::{AudioService, SceneHost, Sound};
use crate::scheduler::Scheduler;
use crate::timer::{RoundTimer, TimerEvent};
use crate::tutorial::{TutorialCue, TutorialGuide};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outbound notifications, drained by the host once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    SelectionStarted { cell: CellPos, color: DotColor },
    ChainChanged { length: usize },
    SelectionCancelled,
    CommitStarted { cells: Vec<CellPos>, color: DotColor },
    TokenSpawned { cell: CellPos, color: DotColor },
    TokensFell { moves: Vec<GravityMove> },
    CommitSettled,
    SkipAvailable,
    Stalemate { level: Level },
    LevelAdvanced { level: Level },
    TimerTick { remaining: u32 },
    TutorialPulse { cell: CellPos },
    GameEnded { reason: EndReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Commit(CommitTask),
    FinishSkip,
}

impl From<CommitTask> for Task {
    fn from(task: CommitTask) -> Self {
        Self::Commit(task)
    }
}

pub struct Game<S: SceneHost, A: AudioService> {
    config: GameConfig,
    scene: S,
    audio: A,
    grid: Grid,
    selection: SelectionEngine,
    progression: Progression,
    timer: RoundTimer,
    tutorial: TutorialGuide,
    scheduler: Scheduler<Task>,
    rng: StdRng,
    events: Vec<GameEvent>,
}

impl<S: SceneHost, A: AudioService> Game<S, A> {
    /// Build level one and start the hint.
    pub fn new(config: GameConfig, mut scene: S, audio: A) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut grid = Grid::default();
        grid.rebuild(&config.level_one, &mut scene, &mut rng);
        let mut tutorial = TutorialGuide::new(
            config.hint_path.clone(),
            config.tutorial_step,
            config.tutorial_pause,
        );
        if config.tutorial {
            tutorial.start();
        }
        info!(
            columns = grid.columns(),
            rows = grid.rows(),
            tutorial = tutorial.is_active(),
            "game started"
        );
        Self {
            selection: SelectionEngine::new(config.commit_timings()),
            progression: Progression::new(config.skip_threshold),
            timer: RoundTimer::new(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
            config,
            scene,
            audio,
            grid,
            tutorial,
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn level(&self) -> Level {
        self.progression.level()
    }

    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    pub fn tutorial(&self) -> &TutorialGuide {
        &self.tutorial
    }

    pub fn is_over(&self) -> bool {
        self.progression.is_ended()
    }

    /// Pointer input is ignored while a commit settles or the game winds down.
    pub fn input_locked(&self) -> bool {
        self.selection.is_locked() || !self.progression.accepts_play()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.input_locked() {
            return;
        }
        if self.tutorial.cancel() {
            debug!("tutorial dismissed");
        }
        let Some(cell) = self.grid.cell_for_point(x, y) else {
            return;
        };
        if self.selection.begin(cell, &mut self.grid) {
            if let Some(color) = self.selection.color() {
                self.audio.play(Sound::Select);
                self.events.push(GameEvent::SelectionStarted { cell, color });
            }
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.input_locked() || !self.selection.is_selecting() {
            return;
        }
        let Some(cell) = self.grid.cell_for_point(x, y) else {
            return;
        };
        match self.selection.extend(cell, &mut self.grid) {
            ChainChange::Appended => {
                self.audio.play(Sound::Select);
                self.events.push(GameEvent::ChainChanged {
                    length: self.selection.chain().len(),
                });
            }
            ChainChange::Retracted => self.events.push(GameEvent::ChainChanged {
                length: self.selection.chain().len(),
            }),
            ChainChange::Ignored => {}
        }
    }

    /// Commit on release. The release point itself is not used.
    pub fn pointer_up(&mut self, _x: f32, _y: f32) {
        if self.input_locked() {
            return;
        }
        match self
            .selection
            .commit(&mut self.grid, &mut self.scene, &mut self.scheduler)
        {
            CommitOutcome::Started { cells, color, .. } => {
                self.audio.play(Sound::Merge);
                self.events.push(GameEvent::CommitStarted { cells, color });
                if self.progression.record_commit() {
                    self.events.push(GameEvent::SkipAvailable);
                }
            }
            CommitOutcome::Aborted => self.events.push(GameEvent::SelectionCancelled),
            CommitOutcome::Rejected => {}
        }
    }

    /// Claim the level-two skip. The board clears now; the game ends after the skip delay.
    pub fn request_skip(&mut self) -> bool {
        if !self.progression.take_skip() {
            return false;
        }
        if self.selection.abort(&mut self.grid) {
            self.events.push(GameEvent::SelectionCancelled);
        }
        self.timer.stop();
        self.grid.clear(&mut self.scene);
        self.scheduler
            .schedule_in(self.config.skip_end_delay, Task::FinishSkip);
        true
    }

    /// Viewport changed; recompute the board geometry.
    pub fn relayout(&mut self) {
        self.grid.relayout(self.scene.viewport_size());
    }

    /// Advance game time by one frame.
    pub fn tick(&mut self, dt: Duration) {
        // observers only see frames spent wholly inside their level
        let level = self.progression.level();
        let until = self.scheduler.now() + dt;
        while let Some(task) = self.scheduler.pop_due(until) {
            self.run_task(task);
        }
        self.scheduler.advance_to(until);

        if level == Level::Two && self.progression.level() == Level::Two {
            for event in self.timer.tick(dt) {
                match event {
                    TimerEvent::Tick { remaining } => {
                        self.events.push(GameEvent::TimerTick { remaining });
                    }
                    TimerEvent::Expired => self.end_game(EndReason::TimeUp),
                }
            }
        }

        if level == Level::One && self.progression.level() == Level::One {
            for cue in self.tutorial.tick(dt) {
                if let TutorialCue::Pulse(cell) = cue {
                    self.events.push(GameEvent::TutorialPulse { cell });
                }
            }
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Commit(step) => {
                let spawn_enabled = self.progression.accepts_play();
                let outcome = self.selection.advance(
                    step,
                    &mut self.grid,
                    &mut self.scene,
                    &mut self.scheduler,
                    spawn_enabled,
                );
                match outcome {
                    CommitStep::Spawned {
                        cell,
                        color: Some(color),
                    } => self.events.push(GameEvent::TokenSpawned { cell, color }),
                    CommitStep::Spawned { color: None, .. } | CommitStep::Ignored => {}
                    CommitStep::Falling { moves } => {
                        self.events.push(GameEvent::TokensFell { moves });
                    }
                    CommitStep::Settled => {
                        self.events.push(GameEvent::CommitSettled);
                        self.check_completion();
                    }
                }
            }
            Task::FinishSkip => self.end_game(EndReason::Skipped),
        }
    }

    fn check_completion(&mut self) {
        let Some(advance) = self.progression.check(&self.grid) else {
            return;
        };
        if advance.stalemate {
            warn!(level = ?advance.from, "no moves left");
            self.events.push(GameEvent::Stalemate {
                level: advance.from,
            });
        }
        match advance.from {
            Level::One => self.enter_level_two(),
            Level::Two => self.end_game(EndReason::Cleared),
            Level::Ended => {}
        }
    }

    fn enter_level_two(&mut self) {
        if !self.progression.enter_level_two() {
            return;
        }
        self.tutorial.cancel();
        self.grid
            .rebuild(&self.config.level_two, &mut self.scene, &mut self.rng);
        self.timer.start(self.config.round_seconds);
        self.events.push(GameEvent::LevelAdvanced { level: Level::Two });
    }

    fn end_game(&mut self, reason: EndReason) {
        if !self.progression.finish(reason) {
            return;
        }
        self.selection.abort(&mut self.grid);
        self.timer.stop();
        self.tutorial.cancel();
        self.grid.clear(&mut self.scene);
        self.events.push(GameEvent::GameEnded { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SelectionState;
    use crate::grid::DotColor::{Blue as B, Red as R};
    use crate::pattern::LevelLayout;
    use crate::scene::testing::{RecordingAudio, RecordingScene};

    type TestGame = Game<RecordingScene, RecordingAudio>;

    fn layout(text: &str) -> LevelLayout {
        LevelLayout::parse(text).unwrap()
    }

    fn config() -> GameConfig {
        GameConfig {
            seed: Some(11),
            tutorial: false,
            ..GameConfig::default()
        }
    }

    fn game_with(config: GameConfig) -> (TestGame, RecordingAudio) {
        let audio = RecordingAudio::default();
        let game = Game::new(config, RecordingScene::new(), audio.clone());
        (game, audio)
    }

    fn center(game: &TestGame, row: usize, col: usize) -> (f32, f32) {
        game.grid().geometry().cell_center(CellPos::new(row, col))
    }

    fn drag(game: &mut TestGame, cells: &[(usize, usize)]) {
        let (x, y) = center(game, cells[0].0, cells[0].1);
        game.pointer_down(x, y);
        for &(row, col) in &cells[1..] {
            let (x, y) = center(game, row, col);
            game.pointer_move(x, y);
        }
        let (x, y) = center(game, cells[cells.len() - 1].0, cells[cells.len() - 1].1);
        game.pointer_up(x, y);
    }

    fn settle(game: &mut TestGame) {
        game.tick(Duration::from_secs(1));
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    /// Level two as a small board that is easy to clear.
    fn small_level_two() -> GameConfig {
        GameConfig {
            level_two: layout("R R\nB B\nG G\nY Y"),
            ..config()
        }
    }

    /// Empty level one (`R B B / _ R _`) along the hinted route.
    fn clear_level_one(game: &mut TestGame) {
        drag(game, &[(0, 1), (0, 2)]);
        settle(game);
        // R R _
        drag(game, &[(0, 0), (0, 1)]);
        settle(game);
    }

    #[test]
    fn opening_board_matches_pattern() {
        let (game, _) = game_with(config());
        assert_eq!(game.level(), Level::One);
        assert_eq!(
            game.grid().color_rows(),
            vec![vec![Some(R), Some(B), Some(B)], vec![None, Some(R), None]]
        );
    }

    #[test]
    fn non_adjacent_chain_is_rejected() {
        let (mut game, _) = game_with(config());
        drag(&mut game, &[(0, 0), (1, 1)]);
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::SelectionCancelled));
        assert_eq!(game.grid().token_count(), 4);
        assert_eq!(game.selection().state(), SelectionState::Idle);
    }

    #[test]
    fn blue_pair_commit_spawns_nothing_and_settles() {
        let (mut game, audio) = game_with(config());
        drag(&mut game, &[(0, 1), (0, 2)]);
        assert!(game.input_locked());
        assert_eq!(
            game.grid().color_rows(),
            vec![vec![Some(R), None, None], vec![None, Some(R), None]]
        );

        game.tick(Duration::from_millis(125));
        assert_eq!(game.grid().color_at(CellPos::new(0, 2)), None);
        game.tick(Duration::from_millis(125));
        assert_eq!(
            game.grid().color_rows(),
            vec![vec![Some(R), Some(R), None], vec![None, None, None]]
        );
        assert!(game.input_locked());
        game.tick(Duration::from_millis(250));
        assert!(!game.input_locked());

        let events = game.drain_events();
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::TokenSpawned { .. })),
            0
        );
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::TokensFell { .. })),
            1
        );
        assert_eq!(count(&events, |e| *e == GameEvent::CommitSettled), 1);
        assert_eq!(game.level(), Level::One);
        assert_eq!(
            *audio.0.borrow(),
            vec![Sound::Select, Sound::Select, Sound::Merge]
        );
    }

    #[test]
    fn input_ignored_while_committing() {
        let (mut game, _) = game_with(config());
        drag(&mut game, &[(0, 1), (0, 2)]);
        game.drain_events();
        let (x, y) = center(&game, 0, 0);
        game.pointer_down(x, y);
        game.pointer_up(x, y);
        assert!(game.drain_events().is_empty());
        assert!(game.selection().is_locked());
    }

    #[test]
    fn single_tap_is_not_a_merge() {
        let (mut game, audio) = game_with(config());
        let (x, y) = center(&game, 0, 0);
        game.pointer_down(x, y);
        game.pointer_up(x, y);
        settle(&mut game);
        assert_eq!(game.grid().token_count(), 4);
        assert!(!audio.0.borrow().contains(&Sound::Merge));
    }

    #[test]
    fn emptying_level_one_advances_once() {
        let (mut game, _) = game_with(small_level_two());
        clear_level_one(&mut game);
        assert_eq!(game.level(), Level::Two);
        let events = game.drain_events();
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::Stalemate { .. })),
            0
        );
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::LevelAdvanced { .. })),
            1
        );
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::GameEnded { .. })),
            0
        );
        assert_eq!(game.grid().rows(), 4);
        assert!(game.timer().is_active());
    }

    #[test]
    fn stalemate_on_level_one_is_reported_and_advances() {
        let (mut game, _) = game_with(GameConfig {
            level_one: layout("R R Y\n. B P"),
            ..small_level_two()
        });
        // nothing to infer at (0,0); B rises between the gap and Y
        drag(&mut game, &[(0, 1), (0, 0)]);
        settle(&mut game);
        assert_eq!(
            game.drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::Stalemate { .. }))
                .count(),
            1
        );
        assert_eq!(game.level(), Level::Two);
    }

    #[test]
    fn emptying_level_two_ends_game_cleared() {
        let (mut game, _) = game_with(GameConfig {
            level_two: layout("B B"),
            ..config()
        });
        clear_level_one(&mut game);
        assert_eq!(game.level(), Level::Two);
        drag(&mut game, &[(0, 0), (0, 1)]);
        settle(&mut game);
        assert!(game.is_over());
        assert!(game.grid().is_empty());
        game.tick(Duration::from_secs(120));
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::GameEnded {
            reason: EndReason::Cleared
        }));
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::GameEnded { .. })),
            1
        );
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::Stalemate { .. })),
            0
        );
        assert_eq!(game.progression().end_reason(), Some(EndReason::Cleared));
    }

    #[test]
    fn timer_expiry_ends_game_with_moves_left() {
        let (mut game, _) = game_with(GameConfig {
            round_seconds: 2,
            ..small_level_two()
        });
        clear_level_one(&mut game);
        game.drain_events();
        assert!(game.grid().has_any_valid_move());
        game.tick(Duration::from_secs(1));
        game.tick(Duration::from_secs(1));
        assert!(game.is_over());
        let events = game.drain_events();
        assert_eq!(
            events,
            vec![
                GameEvent::TimerTick { remaining: 1 },
                GameEvent::TimerTick { remaining: 0 },
                GameEvent::GameEnded {
                    reason: EndReason::TimeUp
                },
            ]
        );
        assert!(game.grid().is_empty());
        game.tick(Duration::from_secs(5));
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn timer_does_not_run_on_level_one() {
        let (mut game, _) = game_with(config());
        game.tick(Duration::from_secs(120));
        assert!(!game.is_over());
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn skip_unlocks_on_third_commit_and_ends_once() {
        let (mut game, _) = game_with(GameConfig {
            level_two: layout("R R\nR R\nR R\nR R"),
            ..config()
        });
        clear_level_one(&mut game);
        assert!(!game.request_skip());
        for _ in 0..3 {
            drag(&mut game, &[(0, 0), (0, 1)]);
            settle(&mut game);
        }
        let events = game.drain_events();
        assert_eq!(count(&events, |e| *e == GameEvent::SkipAvailable), 1);
        assert_eq!(game.progression().merges(), 3);

        assert!(game.request_skip());
        assert!(!game.request_skip());
        assert!(game.grid().is_empty());
        assert!(game.input_locked());
        game.tick(Duration::from_millis(399));
        assert!(!game.is_over());
        game.tick(Duration::from_millis(1));
        assert!(game.is_over());
        game.tick(Duration::from_secs(120));
        let events = game.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::GameEnded {
                reason: EndReason::Skipped
            }]
        );
    }

    #[test]
    fn skip_during_commit_lets_commit_finish_without_spawning() {
        let (mut game, _) = game_with(GameConfig {
            skip_threshold: 1,
            ..small_level_two()
        });
        clear_level_one(&mut game);
        drag(&mut game, &[(0, 0), (0, 1)]);
        settle(&mut game);
        // B spawned at (0,1) and the B at (1,0) rose beside it
        drag(&mut game, &[(0, 0), (0, 1)]);
        assert!(game.selection().is_locked());
        game.drain_events();
        assert!(game.request_skip());
        settle(&mut game);
        assert!(game.grid().is_empty());
        assert_eq!(game.selection().state(), SelectionState::Idle);
        let events = game.drain_events();
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::GameEnded { .. })),
            1
        );
        assert!(!events.iter().any(|e| matches!(
            e,
            GameEvent::TokenSpawned { .. } | GameEvent::Stalemate { .. }
        )));
    }

    #[test]
    fn tutorial_pulses_until_first_touch() {
        let (mut game, _) = game_with(GameConfig {
            tutorial: true,
            ..config()
        });
        assert!(game.tutorial().is_active());
        game.tick(Duration::from_millis(300));
        assert_eq!(
            game.drain_events(),
            vec![GameEvent::TutorialPulse {
                cell: CellPos::new(0, 2)
            }]
        );
        let (x, y) = center(&game, 1, 0);
        game.pointer_down(x, y);
        assert!(!game.tutorial().is_active());
        game.tick(Duration::from_secs(5));
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn touching_outside_board_does_nothing() {
        let (mut game, _) = game_with(config());
        game.pointer_down(-10.0, -10.0);
        game.pointer_move(1.0, 1.0);
        game.pointer_up(1.0, 1.0);
        assert!(game.drain_events().is_empty());
        assert_eq!(game.selection().state(), SelectionState::Idle);
    }

    #[test]
    fn relayout_follows_viewport() {
        let (mut game, _) = game_with(config());
        let before = *game.grid().geometry();
        game.scene_mut().viewport = crate::scene::Viewport::new(900.0, 600.0);
        game.relayout();
        assert!(game.grid().geometry().spacing > before.spacing);
    }
}
