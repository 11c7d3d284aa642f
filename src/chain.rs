//! Selection chain engine: build a chain of same-coloured adjacent dots, backtrack over it,
//! and commit it as a destroy → spawn → gravity sequence on the scheduler.

use crate::grid::{CellPos, DotColor, GravityMove, Grid};
use crate::scene::SceneHost;
use crate::scheduler::Scheduler;
use std::time::Duration;
use tracing::{debug, warn};

/// Phase of an in-flight commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    /// Chain removed; waiting to spawn the replacement.
    Destroying,
    /// Replacement spawned; waiting to apply gravity.
    Spawning,
    /// Gravity applied; waiting for the fall to finish on screen.
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selecting,
    Committing(CommitPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainChange {
    Appended,
    Retracted,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Not selecting; nothing happened.
    Rejected,
    /// Chain too short; selection dropped without touching the grid.
    Aborted,
    Started {
        cells: Vec<CellPos>,
        color: DotColor,
        anchor: CellPos,
    },
}

/// Deferred continuation of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTask {
    Spawn,
    Gravity,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStep {
    Spawned {
        cell: CellPos,
        color: Option<DotColor>,
    },
    Falling {
        moves: Vec<GravityMove>,
    },
    /// Sequence finished; the engine is idle again.
    Settled,
    /// Task did not match the current phase.
    Ignored,
}

/// Delays between the visual beats of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitTimings {
    pub settle_delay: Duration,
    pub gravity_animation: Duration,
}

impl Default for CommitTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(125),
            gravity_animation: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    anchor: CellPos,
}

#[derive(Debug, Clone)]
pub struct SelectionEngine {
    state: SelectionState,
    chain: Vec<CellPos>,
    color: Option<DotColor>,
    in_flight: Option<InFlight>,
    timings: CommitTimings,
}

impl SelectionEngine {
    pub fn new(timings: CommitTimings) -> Self {
        Self {
            state: SelectionState::Idle,
            chain: Vec::new(),
            color: None,
            in_flight: None,
            timings,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn chain(&self) -> &[CellPos] {
        &self.chain
    }

    pub fn color(&self) -> Option<DotColor> {
        self.color
    }

    /// A commit is settling; no new selection may start.
    pub fn is_locked(&self) -> bool {
        matches!(self.state, SelectionState::Committing(_))
    }

    pub fn is_selecting(&self) -> bool {
        self.state == SelectionState::Selecting
    }

    /// Start a chain on the token at `pos`. Only from `Idle`.
    pub fn begin(&mut self, pos: CellPos, grid: &mut Grid) -> bool {
        if self.state != SelectionState::Idle {
            return false;
        }
        let Some(color) = grid.color_at(pos) else {
            return false;
        };
        grid.clear_selection();
        self.chain.clear();
        self.chain.push(pos);
        self.color = Some(color);
        grid.set_selected(pos, true);
        self.state = SelectionState::Selecting;
        debug!(?pos, ?color, "selection started");
        true
    }

    /// Grow or retract the chain toward `pos`.
    pub fn extend(&mut self, pos: CellPos, grid: &mut Grid) -> ChainChange {
        if self.state != SelectionState::Selecting {
            return ChainChange::Ignored;
        }
        let (Some(color), Some(&last)) = (self.color, self.chain.last()) else {
            return ChainChange::Ignored;
        };
        if grid.color_at(pos) != Some(color) || !pos.is_adjacent(last) {
            return ChainChange::Ignored;
        }
        let len = self.chain.len();
        if len >= 2 && self.chain[len - 2] == pos {
            if let Some(dropped) = self.chain.pop() {
                grid.set_selected(dropped, false);
            }
            return ChainChange::Retracted;
        }
        if self.chain.contains(&pos) {
            return ChainChange::Ignored;
        }
        self.chain.push(pos);
        grid.set_selected(pos, true);
        ChainChange::Appended
    }

    /// Finish the selection. Chains of two or more are destroyed now; spawn and gravity follow
    /// on the scheduler.
    pub fn commit<T: From<CommitTask>>(
        &mut self,
        grid: &mut Grid,
        scene: &mut dyn SceneHost,
        scheduler: &mut Scheduler<T>,
    ) -> CommitOutcome {
        if self.state != SelectionState::Selecting {
            return CommitOutcome::Rejected;
        }
        let (Some(color), Some(&anchor)) = (self.color, self.chain.last()) else {
            self.reset(grid);
            return CommitOutcome::Aborted;
        };
        if self.chain.len() < 2 {
            self.reset(grid);
            return CommitOutcome::Aborted;
        }
        let cells = std::mem::take(&mut self.chain);
        self.color = None;
        grid.destroy_tokens(&cells, scene);
        self.in_flight = Some(InFlight { anchor });
        self.state = SelectionState::Committing(CommitPhase::Destroying);
        scheduler.schedule_in(self.timings.settle_delay, CommitTask::Spawn.into());
        debug!(length = cells.len(), ?color, ?anchor, "chain committed");
        CommitOutcome::Started {
            cells,
            color,
            anchor,
        }
    }

    /// Run the next beat of the in-flight commit. With `spawn_enabled` false the replacement is
    /// skipped (the board is being torn down) but the sequence still runs to the end.
    pub fn advance<T: From<CommitTask>>(
        &mut self,
        task: CommitTask,
        grid: &mut Grid,
        scene: &mut dyn SceneHost,
        scheduler: &mut Scheduler<T>,
        spawn_enabled: bool,
    ) -> CommitStep {
        let (SelectionState::Committing(phase), Some(flight)) = (self.state, self.in_flight)
        else {
            warn!(?task, state = ?self.state, "commit task without a commit in flight");
            return CommitStep::Ignored;
        };
        match (phase, task) {
            (CommitPhase::Destroying, CommitTask::Spawn) => {
                let color = if spawn_enabled {
                    grid.spawn_token_infer_color(flight.anchor, scene)
                } else {
                    None
                };
                self.state = SelectionState::Committing(CommitPhase::Spawning);
                scheduler.schedule_in(self.timings.settle_delay, CommitTask::Gravity.into());
                debug!(cell = ?flight.anchor, ?color, "replacement spawned");
                CommitStep::Spawned {
                    cell: flight.anchor,
                    color,
                }
            }
            (CommitPhase::Spawning, CommitTask::Gravity) => {
                let moves = grid.apply_gravity(scene);
                if moves.is_empty() {
                    self.finish();
                    return CommitStep::Settled;
                }
                self.state = SelectionState::Committing(CommitPhase::Settling);
                scheduler.schedule_in(self.timings.gravity_animation, CommitTask::Settled.into());
                debug!(moved = moves.len(), "gravity applied");
                CommitStep::Falling { moves }
            }
            (CommitPhase::Settling, CommitTask::Settled) => {
                self.finish();
                CommitStep::Settled
            }
            _ => {
                warn!(?phase, ?task, "commit task out of order");
                CommitStep::Ignored
            }
        }
    }

    /// Drop the current selection. Has no effect on a commit already in flight.
    pub fn abort(&mut self, grid: &mut Grid) -> bool {
        match self.state {
            SelectionState::Committing(_) => false,
            SelectionState::Idle if self.chain.is_empty() => false,
            _ => {
                self.reset(grid);
                true
            }
        }
    }

    fn reset(&mut self, grid: &mut Grid) {
        grid.clear_selection();
        self.chain.clear();
        self.color = None;
        self.state = SelectionState::Idle;
    }

    fn finish(&mut self) {
        self.in_flight = None;
        self.state = SelectionState::Idle;
        debug!("commit settled");
    }
}
