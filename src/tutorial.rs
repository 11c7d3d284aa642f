//! Looping hint that walks a hand along a path of cells on level one until the player touches
//! the board.

use crate::grid::CellPos;
use std::time::Duration;

const MIN_BEAT: Duration = Duration::from_millis(1);
/// Upper bound on phase changes handled in one tick.
const MAX_TRANSITIONS: usize = 64;

/// Where to draw the hand: `progress` runs 0..=1 from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub from: CellPos,
    pub to: CellPos,
    pub progress: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialCue {
    /// Hand is halfway to this cell.
    Pulse(CellPos),
    /// End of the path; hand hidden during the pause.
    Hidden,
    /// Loop restarted at the first cell.
    Shown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Stopped,
    Walking {
        step: usize,
        elapsed: Duration,
        pulsed: bool,
    },
    Resting {
        elapsed: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct TutorialGuide {
    path: Vec<CellPos>,
    step_time: Duration,
    pause: Duration,
    phase: Phase,
    cancelled: bool,
}

impl TutorialGuide {
    pub fn new(path: Vec<CellPos>, step_time: Duration, pause: Duration) -> Self {
        Self {
            path,
            step_time: step_time.max(MIN_BEAT),
            pause: pause.max(MIN_BEAT),
            phase: Phase::Stopped,
            cancelled: false,
        }
    }

    /// Begin the loop. No-op after a cancel or for paths shorter than two cells.
    pub fn start(&mut self) -> bool {
        if self.cancelled || self.path.len() < 2 {
            return false;
        }
        self.phase = Phase::Walking {
            step: 0,
            elapsed: Duration::ZERO,
            pulsed: false,
        };
        true
    }

    /// Stop for good. Returns true if the hint was running.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.cancelled = true;
        self.phase = Phase::Stopped;
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Stopped
    }

    pub fn path(&self) -> &[CellPos] {
        &self.path
    }

    pub fn pose(&self) -> Option<HandPose> {
        match self.phase {
            Phase::Walking { step, elapsed, .. } => Some(HandPose {
                from: self.path[step],
                to: self.path[step + 1],
                progress: (elapsed.as_secs_f32() / self.step_time.as_secs_f32()).clamp(0.0, 1.0),
            }),
            _ => None,
        }
    }

    pub fn tick(&mut self, dt: Duration) -> Vec<TutorialCue> {
        let mut cues = Vec::new();
        let mut budget = dt;
        let half = self.step_time / 2;
        for _ in 0..MAX_TRANSITIONS {
            match &mut self.phase {
                Phase::Stopped => break,
                Phase::Walking {
                    step,
                    elapsed,
                    pulsed,
                } => {
                    let left = self.step_time.saturating_sub(*elapsed);
                    if budget < left {
                        *elapsed += budget;
                        if !*pulsed && *elapsed >= half {
                            *pulsed = true;
                            cues.push(TutorialCue::Pulse(self.path[*step + 1]));
                        }
                        break;
                    }
                    budget -= left;
                    if !*pulsed {
                        cues.push(TutorialCue::Pulse(self.path[*step + 1]));
                    }
                    let next = *step + 1;
                    if next + 1 >= self.path.len() {
                        self.phase = Phase::Resting {
                            elapsed: Duration::ZERO,
                        };
                        cues.push(TutorialCue::Hidden);
                    } else {
                        *step = next;
                        *elapsed = Duration::ZERO;
                        *pulsed = false;
                    }
                }
                Phase::Resting { elapsed } => {
                    let left = self.pause.saturating_sub(*elapsed);
                    if budget < left {
                        *elapsed += budget;
                        break;
                    }
                    budget -= left;
                    self.phase = Phase::Walking {
                        step: 0,
                        elapsed: Duration::ZERO,
                        pulsed: false,
                    };
                    cues.push(TutorialCue::Shown);
                }
            }
        }
        cues
    }
}
