//! Tunables for one game session.

use crate::chain::CommitTimings;
use crate::grid::CellPos;
use crate::pattern::LevelLayout;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub level_one: LevelLayout,
    pub level_two: LevelLayout,
    /// Pause between destroy, spawn and gravity.
    pub settle_delay: Duration,
    /// How long the host animates a gravity fall.
    pub gravity_animation: Duration,
    /// Delay between claiming the skip and the end of the game.
    pub skip_end_delay: Duration,
    /// Level-two commits needed before skipping is offered.
    pub skip_threshold: u32,
    pub round_seconds: u32,
    pub tutorial: bool,
    pub hint_path: Vec<CellPos>,
    pub tutorial_step: Duration,
    pub tutorial_pause: Duration,
    /// Seed for the random fill outside level patterns; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn commit_timings(&self) -> CommitTimings {
        CommitTimings {
            settle_delay: self.settle_delay,
            gravity_animation: self.gravity_animation,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            level_one: LevelLayout::level_one(),
            level_two: LevelLayout::level_two(),
            settle_delay: Duration::from_millis(125),
            gravity_animation: Duration::from_millis(250),
            skip_end_delay: Duration::from_millis(400),
            skip_threshold: 3,
            round_seconds: 60,
            tutorial: true,
            hint_path: vec![CellPos::new(0, 1), CellPos::new(0, 2)],
            tutorial_step: Duration::from_millis(500),
            tutorial_pause: Duration::from_millis(1000),
            seed: None,
        }
    }
}
