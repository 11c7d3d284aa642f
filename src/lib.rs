//! chaindots: two-level dot-chain puzzle core. Drag a chain of same-coloured adjacent dots,
//! release to clear it, and the column settles. Rendering and sound live behind
//! [`scene::SceneHost`] and [`scene::AudioService`].

pub mod chain;
pub mod config;
pub mod game;
pub mod grid;
pub mod level;
pub mod pattern;
pub mod scene;
pub mod scheduler;
pub mod timer;
pub mod tutorial;

pub use config::GameConfig;
pub use game::{Game, GameEvent};
