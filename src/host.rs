//! Terminal scene host and bell audio.

use chaindots::grid::{CellPos, DotColor};
use chaindots::scene::{AudioService, SceneHost, Sound, TokenHandle, Viewport};
use std::collections::HashMap;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::debug;

/// A token's visual.
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub cell: CellPos,
    pub color: DotColor,
    fall: Option<Fall>,
}

#[derive(Debug, Clone, Copy)]
struct Fall {
    from_row: usize,
    started: Instant,
}

/// A destroyed token still on screen while its fade runs.
#[derive(Debug, Clone, Copy)]
pub struct Ghost {
    pub cell: CellPos,
    pub color: DotColor,
}

#[derive(Debug)]
pub struct TerminalScene {
    viewport: Viewport,
    next_handle: u64,
    sprites: HashMap<TokenHandle, Sprite>,
    ghosts: Vec<Ghost>,
    fall_time: Duration,
    animate: bool,
}

/// Bounce ease-out, as a dropped dot lands.
fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    let t = t.clamp(0.0, 1.0);
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984_375
    }
}

impl TerminalScene {
    pub fn new(columns: u16, rows: u16, fall_time: Duration, animate: bool) -> Self {
        Self {
            viewport: viewport_for(columns, rows),
            next_handle: 0,
            sprites: HashMap::new(),
            ghosts: Vec::new(),
            fall_time,
            animate,
        }
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.viewport = viewport_for(columns, rows);
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.sprites.values()
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn clear_ghosts(&mut self) {
        self.ghosts.clear();
    }

    /// Row the sprite is drawn at, fractional while falling.
    pub fn sprite_row(&self, sprite: &Sprite, now: Instant) -> f32 {
        let to = sprite.cell.row as f32;
        let Some(fall) = sprite.fall else {
            return to;
        };
        let t = now.saturating_duration_since(fall.started).as_secs_f32()
            / self.fall_time.as_secs_f32().max(f32::EPSILON);
        if t >= 1.0 {
            return to;
        }
        let from = fall.from_row as f32;
        from + (to - from) * bounce_out(t)
    }
}

/// Terminal cells are about twice as tall as wide: two board units per row.
fn viewport_for(columns: u16, rows: u16) -> Viewport {
    Viewport::new(f32::from(columns), f32::from(rows) * 2.0)
}

impl SceneHost for TerminalScene {
    fn create_token(&mut self, cell: CellPos, color: DotColor) -> Option<TokenHandle> {
        self.next_handle += 1;
        let handle = TokenHandle(self.next_handle);
        self.sprites.insert(
            handle,
            Sprite {
                cell,
                color,
                fall: None,
            },
        );
        Some(handle)
    }

    fn destroy_token(&mut self, handle: TokenHandle) {
        if let Some(sprite) = self.sprites.remove(&handle) {
            if self.animate {
                self.ghosts.push(Ghost {
                    cell: sprite.cell,
                    color: sprite.color,
                });
            }
        }
    }

    fn move_token(&mut self, handle: TokenHandle, from: CellPos, to: CellPos) {
        let animate = self.animate;
        if let Some(sprite) = self.sprites.get_mut(&handle) {
            sprite.cell = to;
            sprite.fall = animate.then(|| Fall {
                from_row: from.row,
                started: Instant::now(),
            });
        }
    }

    fn viewport_size(&self) -> Viewport {
        self.viewport
    }
}

/// Which sounds ring the terminal bell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Bell {
    #[default]
    Off,
    Merge,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct BellAudio {
    bell: Bell,
}

impl BellAudio {
    pub const fn new(bell: Bell) -> Self {
        Self { bell }
    }
}

impl AudioService for BellAudio {
    fn play(&mut self, sound: Sound) {
        let ring = match (self.bell, sound) {
            (Bell::Off, _) | (Bell::Merge, Sound::Select) => false,
            (Bell::Merge, Sound::Merge) | (Bell::All, _) => true,
        };
        if !ring {
            return;
        }
        let mut out = std::io::stdout();
        if let Err(err) = out.write_all(b"\x07").and_then(|()| out.flush()) {
            debug!(%err, ?sound, "bell failed");
        }
    }
}
