// Public API for integration tests and embedding in a room server

pub mod config;
pub mod error;
pub mod handlers;
pub mod machine;
pub mod protocol;
pub mod rules;
pub mod state;
pub mod types;

pub use error::{GameError, GameResult};
pub use machine::{GameStateMachine, ValidationReport};
