//! Boundary with the presentation layer: the scene host owns visual tokens, the audio
//! service plays sounds. Both are consumed by the core, never implemented by it.

use crate::grid::{CellPos, DotColor};

/// Opaque handle to a visual token owned by the scene host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHandle(pub u64);

/// Viewport size in host units (pixels on a canvas, half-rows in a terminal).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Visual side of the grid. Layering, sizing and tweening are the host's business.
pub trait SceneHost {
    /// `None` when the host cannot create a visual; the logical token still exists.
    fn create_token(&mut self, cell: CellPos, color: DotColor) -> Option<TokenHandle>;
    fn destroy_token(&mut self, handle: TokenHandle);
    /// Token settled from `from` to `to`; the host animates the fall.
    fn move_token(&mut self, handle: TokenHandle, from: CellPos, to: CellPos);
    fn viewport_size(&self) -> Viewport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Select,
    Merge,
}

/// Fire-and-forget playback. Implementations swallow their own failures.
pub trait AudioService {
    fn play(&mut self, sound: Sound);
}

/// Scene host with no visuals: hands out sequential handles and tracks how many are live.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    viewport: Viewport,
    next_handle: u64,
    live: usize,
}

impl HeadlessScene {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn live_tokens(&self) -> usize {
        self.live
    }
}

impl SceneHost for HeadlessScene {
    fn create_token(&mut self, _cell: CellPos, _color: DotColor) -> Option<TokenHandle> {
        self.next_handle += 1;
        self.live += 1;
        Some(TokenHandle(self.next_handle))
    }

    fn destroy_token(&mut self, _handle: TokenHandle) {
        self.live = self.live.saturating_sub(1);
    }

    fn move_token(&mut self, _handle: TokenHandle, _from: CellPos, _to: CellPos) {}

    fn viewport_size(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording doubles for the scene host and audio service.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SceneCall {
        Create(CellPos, DotColor),
        Destroy(TokenHandle),
        Move(TokenHandle, CellPos, CellPos),
    }

    #[derive(Debug, Default)]
    pub struct RecordingScene {
        pub calls: Vec<SceneCall>,
        pub refuse_creates: bool,
        pub viewport: Viewport,
        next_handle: u64,
    }

    impl RecordingScene {
        pub fn new() -> Self {
            Self {
                viewport: Viewport::new(300.0, 200.0),
                ..Self::default()
            }
        }

        pub fn destroyed(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, SceneCall::Destroy(_)))
                .count()
        }

        pub fn moves(&self) -> Vec<(CellPos, CellPos)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    SceneCall::Move(_, from, to) => Some((*from, *to)),
                    _ => None,
                })
                .collect()
        }
    }

    impl SceneHost for RecordingScene {
        fn create_token(&mut self, cell: CellPos, color: DotColor) -> Option<TokenHandle> {
            self.calls.push(SceneCall::Create(cell, color));
            if self.refuse_creates {
                return None;
            }
            self.next_handle += 1;
            Some(TokenHandle(self.next_handle))
        }

        fn destroy_token(&mut self, handle: TokenHandle) {
            self.calls.push(SceneCall::Destroy(handle));
        }

        fn move_token(&mut self, handle: TokenHandle, from: CellPos, to: CellPos) {
            self.calls.push(SceneCall::Move(handle, from, to));
        }

        fn viewport_size(&self) -> Viewport {
            self.viewport
        }
    }

    /// Shares its log so a test can inspect it after the game took ownership.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingAudio(pub Rc<RefCell<Vec<Sound>>>);

    impl AudioService for RecordingAudio {
        fn play(&mut self, sound: Sound) {
            self.0.borrow_mut().push(sound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_scene_tracks_live_handles() {
        let mut scene = HeadlessScene::new(Viewport::new(100.0, 100.0));
        let a = scene.create_token(CellPos::new(0, 0), DotColor::Red).unwrap();
        let b = scene.create_token(CellPos::new(0, 1), DotColor::Blue).unwrap();
        assert_ne!(a, b);
        assert_eq!(scene.live_tokens(), 2);
        scene.destroy_token(a);
        assert_eq!(scene.live_tokens(), 1);
        assert_eq!(scene.viewport_size(), Viewport::new(100.0, 100.0));
    }
}
