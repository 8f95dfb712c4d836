//! Game simulation
//!
//! Everything here is deterministic given its inputs (a pitch reading or a
//! command per tick, plus a seeded RNG), so it can be driven by the terminal
//! front-end or by tests alike.

pub mod command;
pub mod pitch;
mod session;
pub mod terrain;

pub use command::{Animation, CommandGame, Hazard, MoveOutcome, RunnerState};
pub use pitch::{Barrier, PitchGame};
pub use session::{Action, ActiveGame, GameMode, GameSession, Screen};
pub use terrain::{Cell, ColumnKind, GameMap, TerrainColumn, TerrainGenerator};

/// Simulation ticks per second
pub const TICK_RATE: u32 = 60;

/// Lives at the start of every game
pub const INITIAL_LIVES: u32 = 3;

/// Ticks of immunity after losing a life
pub const INVULNERABILITY_TICKS: u32 = 30;

/// Score, lives and the post-collision immunity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoreboard {
    pub score: u32,
    pub lives: u32,
    pub invulnerability: u32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            score: 0,
            lives: INITIAL_LIVES,
            invulnerability: 0,
        }
    }
}

impl Scoreboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a hit; ignored while invulnerable
    ///
    /// Returns whether a life was lost.
    pub fn hit(&mut self) -> bool {
        if self.invulnerability > 0 {
            return false;
        }
        self.lives = self.lives.saturating_sub(1);
        self.invulnerability = INVULNERABILITY_TICKS;
        tracing::debug!(lives = self.lives, "life lost");
        true
    }

    pub const fn tick_invulnerability(&mut self) {
        self.invulnerability = self.invulnerability.saturating_sub(1);
    }

    #[must_use]
    pub const fn is_invulnerable(&self) -> bool {
        self.invulnerability > 0
    }

    /// Whether the avatar is hidden this tick while invulnerable
    #[must_use]
    pub const fn is_blinking(&self) -> bool {
        self.invulnerability > 0 && self.invulnerability % 10 < 5
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.lives == 0
    }
}
