//! Level progression, completion detection and the level-two skip option.

use crate::grid::Grid;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    One,
    Two,
    Ended,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "Level 1"),
            Self::Two => write!(f, "Level 2"),
            Self::Ended => write!(f, "Game over"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipState {
    Locked,
    Available,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Level two emptied or stalled.
    Cleared,
    TimeUp,
    Skipped,
}

/// A level finished; `stalemate` when it stopped on a non-empty board with no moves left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub from: Level,
    pub stalemate: bool,
}

/// `None` while a move remains; otherwise `Some(stalemate)`, false for an empty board.
pub fn level_complete(grid: &Grid) -> Option<bool> {
    if grid.is_empty() {
        Some(false)
    } else if !grid.has_any_valid_move() {
        Some(true)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Progression {
    level: Level,
    merges: u32,
    skip: SkipState,
    skip_threshold: u32,
    ending: Option<EndReason>,
}

impl Progression {
    pub fn new(skip_threshold: u32) -> Self {
        Self {
            level: Level::One,
            merges: 0,
            skip: SkipState::Locked,
            skip_threshold,
            ending: None,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Commits made on level two.
    pub fn merges(&self) -> u32 {
        self.merges
    }

    pub fn skip_state(&self) -> SkipState {
        self.skip
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.ending
    }

    pub fn is_ended(&self) -> bool {
        self.level == Level::Ended
    }

    /// False once the game is over or a skip is winding it down.
    pub fn accepts_play(&self) -> bool {
        self.level != Level::Ended && self.skip != SkipState::Used
    }

    /// Count a started commit. Returns true when this commit unlocked the skip.
    pub fn record_commit(&mut self) -> bool {
        if self.level != Level::Two || !self.accepts_play() {
            return false;
        }
        self.merges += 1;
        if self.skip == SkipState::Locked && self.merges >= self.skip_threshold {
            self.skip = SkipState::Available;
            debug!(merges = self.merges, "skip unlocked");
            return true;
        }
        false
    }

    /// Check the settled board. Nothing happens while play is winding down.
    pub fn check(&self, grid: &Grid) -> Option<Advance> {
        if !self.accepts_play() {
            return None;
        }
        level_complete(grid).map(|stalemate| Advance {
            from: self.level,
            stalemate,
        })
    }

    pub fn enter_level_two(&mut self) -> bool {
        if self.level != Level::One {
            return false;
        }
        self.level = Level::Two;
        self.merges = 0;
        self.skip = SkipState::Locked;
        info!("entering level two");
        true
    }

    /// Claim the skip. Only on level two, once available, and only once.
    pub fn take_skip(&mut self) -> bool {
        if self.level != Level::Two || self.skip != SkipState::Available {
            return false;
        }
        self.skip = SkipState::Used;
        info!(merges = self.merges, "skip taken");
        true
    }

    /// Move to `Ended`. Returns false if already there, so the end is reported once.
    pub fn finish(&mut self, reason: EndReason) -> bool {
        if self.level == Level::Ended {
            return false;
        }
        self.level = Level::Ended;
        self.ending = Some(reason);
        info!(?reason, "game ended");
        true
    }
}
