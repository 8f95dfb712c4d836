//! voice-arcade - voice-driven platform games
//!
//! Two game modes share one simulation core:
//! - Pitch mode: the vocal pitch lifts an avatar through scrolling gates
//! - Command mode: spoken commands (run, jump, duck) move a runner across
//!   a procedurally generated obstacle course
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   atomics    ┌──────────────┐
//! │ AudioCapture │─────────────▶│              │
//! │ + pitch      │              │              │
//! └──────────────┘              │  GameSession │──▶ front-end (tui)
//! ┌──────────────┐  mpsc(1)     │  60 Hz tick  │
//! │ Command      │─────────────▶│              │
//! │ listener     │              │              │
//! └──────────────┘              └──────────────┘
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod tui;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use game::{GameSession, Screen};
pub use voice::VoiceCommand;
