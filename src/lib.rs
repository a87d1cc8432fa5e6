#![warn(clippy::all, rust_2018_idioms)]

pub mod canvas;
pub mod clipboard;
pub mod communicator;
pub mod compiler;
pub mod config;
pub mod error;
pub mod history;
pub mod save_load;
pub mod simulator;
pub mod state_manager;
pub mod terminals;

pub use canvas::{CanvasState, Cell, Element, ElementKind, Point, Rect};
pub use error::{CompileError, ConfigError, ReadError};
pub use state_manager::StateManager;
