//! Command mode: a runner on a column grid moved by discrete commands

use rand::Rng;
use rand::rngs::StdRng;

use super::Scoreboard;
use super::terrain::{GameMap, TerrainGenerator};
use crate::voice::VoiceCommand;

/// Columns that must exist ahead of the runner
pub const LOOKAHEAD: usize = 15;

/// Length of a freshly built map
pub const INITIAL_MAP_LENGTH: usize = 30;

/// Starting column
pub const START_X: usize = 2;

/// Columns visible on screen
pub const VIEWPORT_COLUMNS: usize = 20;

const RUN_TICKS: u32 = 20;
const JUMP_TICKS: u32 = 25;
const DUCK_TICKS: u32 = 20;

/// Runner pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Animation {
    #[default]
    Idle,
    Running,
    Jumping,
    Ducking,
}

/// Grid position and pose of the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerState {
    pub x: usize,
    pub row: usize,
    pub animation: Animation,
    pub animation_ticks: u32,
}

impl RunnerState {
    fn animate(&mut self, animation: Animation, ticks: u32) {
        self.animation = animation;
        self.animation_ticks = ticks;
    }
}

/// What the runner ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Hole,
    LowCeiling,
}

/// Result of applying one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved and scored
    Moved { points: u32 },
    /// Ran into a hazard and was pushed past it
    Collided { hazard: Hazard, life_lost: bool },
    /// The destination was not valid; nothing changed
    Rejected,
}

/// State of one command-mode game
#[derive(Debug, Clone)]
pub struct CommandGame<R: Rng = StdRng> {
    map: GameMap,
    generator: TerrainGenerator<R>,
    runner: RunnerState,
    scoreboard: Scoreboard,
}

impl<R: Rng> CommandGame<R> {
    /// Start a game on a freshly generated map
    #[must_use]
    pub fn new(mut generator: TerrainGenerator<R>) -> Self {
        let map = generator.build(INITIAL_MAP_LENGTH);
        Self::with_map(map, generator)
    }

    /// Start a game on a prepared map; the generator only extends it
    #[must_use]
    pub fn with_map(mut map: GameMap, mut generator: TerrainGenerator<R>) -> Self {
        generator.extend(&mut map, START_X + LOOKAHEAD);
        let runner = RunnerState {
            x: START_X,
            row: map.ground_level(START_X),
            animation: Animation::Idle,
            animation_ticks: 0,
        };
        Self {
            map,
            generator,
            runner,
            scoreboard: Scoreboard::new(),
        }
    }

    /// Advance one tick, consuming at most one command
    pub fn tick(&mut self, command: Option<VoiceCommand>) -> Option<MoveOutcome> {
        self.scoreboard.tick_invulnerability();
        self.ensure_lookahead();

        let outcome = command.map(|c| self.apply(c));
        if outcome.is_some() {
            self.ensure_lookahead();
        }

        if self.runner.animation_ticks > 0 {
            self.runner.animation_ticks -= 1;
            if self.runner.animation_ticks == 0 {
                self.runner.animation = Animation::Idle;
            }
        }

        outcome
    }

    /// Apply a command immediately
    pub fn apply(&mut self, command: VoiceCommand) -> MoveOutcome {
        self.ensure_lookahead();
        let outcome = match command {
            VoiceCommand::Run => self.run(),
            VoiceCommand::Jump => self.jump(),
            VoiceCommand::Duck => self.duck(),
        };

        match outcome {
            MoveOutcome::Moved { points } => {
                tracing::debug!(%command, x = self.runner.x, points, "runner moved");
            }
            MoveOutcome::Collided { hazard, life_lost } => {
                tracing::debug!(%command, ?hazard, life_lost, x = self.runner.x, "runner collided");
            }
            MoveOutcome::Rejected => {
                tracing::debug!(%command, x = self.runner.x, "move rejected");
            }
        }
        outcome
    }

    fn run(&mut self) -> MoveOutcome {
        let target = self.runner.x + 1;
        let row = self.map.ground_level(target);

        let hazard = if self.map.is_hole(target) {
            Some(Hazard::Hole)
        } else if self.map.has_low_ceiling(target, row) {
            Some(Hazard::LowCeiling)
        } else {
            None
        };

        self.runner.animate(Animation::Running, RUN_TICKS);

        let Some(hazard) = hazard else {
            self.move_to(target);
            self.scoreboard.score += 1;
            return MoveOutcome::Moved { points: 1 };
        };

        let life_lost = self.scoreboard.hit();
        let landing = if hazard == Hazard::Hole {
            target + 1
        } else {
            target
        };
        self.move_to(landing);
        MoveOutcome::Collided { hazard, life_lost }
    }

    fn jump(&mut self) -> MoveOutcome {
        let target = self.runner.x + 2;
        if !self.can_land(target) {
            return MoveOutcome::Rejected;
        }

        self.move_to(target);
        self.runner.animate(Animation::Jumping, JUMP_TICKS);
        self.scoreboard.score += 2;
        MoveOutcome::Moved { points: 2 }
    }

    fn duck(&mut self) -> MoveOutcome {
        let next = self.runner.x + 1;
        let under_obstacle = self
            .map
            .has_low_ceiling(next, self.map.ground_level(next));
        let target = if under_obstacle { next + 1 } else { next };

        if !self.can_land(target) {
            return MoveOutcome::Rejected;
        }

        let points = if under_obstacle { 2 } else { 1 };
        self.move_to(target);
        self.runner.animate(Animation::Ducking, DUCK_TICKS);
        self.scoreboard.score += points;
        MoveOutcome::Moved { points }
    }

    /// Ground beneath and headroom at the standing row
    fn can_land(&self, x: usize) -> bool {
        x < self.map.len()
            && !self.map.is_hole(x)
            && !self.map.has_low_ceiling(x, self.map.ground_level(x))
    }

    fn move_to(&mut self, x: usize) {
        self.runner.x = x;
        self.runner.row = self.map.ground_level(x);
    }

    fn ensure_lookahead(&mut self) {
        self.generator
            .extend(&mut self.map, self.runner.x + LOOKAHEAD);
    }

    /// First visible column
    #[must_use]
    pub const fn scroll_offset(&self) -> usize {
        self.runner.x.saturating_sub(VIEWPORT_COLUMNS / 3)
    }

    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    #[must_use]
    pub const fn runner(&self) -> &RunnerState {
        &self.runner
    }

    #[must_use]
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub const fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.scoreboard.is_game_over()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::terrain::ColumnKind::{Hole, LowCeiling, Plain};
    use crate::game::terrain::{ColumnKind, STANDING_ROW};

    fn game(kinds: &[ColumnKind]) -> CommandGame {
        CommandGame::with_map(GameMap::from_kinds(kinds), TerrainGenerator::seeded(1))
    }

    // -- run ---

    #[test]
    fn run_on_flat_ground_scores_one() {
        let mut game = game(&[Plain, Plain, Plain, Plain]);
        assert_eq!(game.apply(VoiceCommand::Run), MoveOutcome::Moved { points: 1 });
        assert_eq!(game.runner().x, 3);
        assert_eq!(game.runner().row, STANDING_ROW);
        assert_eq!(game.scoreboard().score, 1);
    }

    #[test]
    fn run_into_low_ceiling_stops_under_it() {
        let mut game = game(&[Plain, Plain, Plain, LowCeiling, Plain]);
        let outcome = game.apply(VoiceCommand::Run);
        assert_eq!(
            outcome,
            MoveOutcome::Collided {
                hazard: Hazard::LowCeiling,
                life_lost: true
            }
        );
        assert_eq!(game.runner().x, 3);
        assert_eq!(game.scoreboard().score, 0);
    }

    #[test]
    fn collision_while_invulnerable_keeps_lives() {
        let mut game = game(&[Plain, Plain, Plain, Hole, Plain, Hole, Plain]);
        game.apply(VoiceCommand::Run);
        let outcome = game.apply(VoiceCommand::Run);
        assert_eq!(
            outcome,
            MoveOutcome::Collided {
                hazard: Hazard::Hole,
                life_lost: false
            }
        );
        assert_eq!(game.scoreboard().lives, 2);
        assert_eq!(game.runner().x, 6);
    }

    // -- duck ---

    #[test]
    fn duck_under_low_ceiling_scores_two() {
        let mut game = game(&[Plain, Plain, Plain, LowCeiling, Plain]);
        assert_eq!(game.apply(VoiceCommand::Duck), MoveOutcome::Moved { points: 2 });
        assert_eq!(game.runner().x, 4);
        assert_eq!(game.runner().animation, Animation::Ducking);
    }

    #[test]
    fn duck_into_hole_is_rejected() {
        let mut game = game(&[Plain, Plain, Plain, Hole, Plain]);
        assert_eq!(game.apply(VoiceCommand::Duck), MoveOutcome::Rejected);
        assert_eq!(game.runner().x, START_X);
    }

    // -- tick ---

    #[test]
    fn animation_returns_to_idle() {
        let mut game = game(&[Plain; 5]);
        game.tick(Some(VoiceCommand::Run));
        for _ in 1..RUN_TICKS {
            assert_eq!(game.runner().animation, Animation::Running);
            game.tick(None);
        }
        assert_eq!(game.runner().animation, Animation::Idle);
    }

    #[test]
    fn lookahead_is_maintained() {
        let mut game = CommandGame::new(TerrainGenerator::seeded(11));
        for _ in 0..40 {
            game.tick(Some(VoiceCommand::Run));
            assert!(game.map().len() >= game.runner().x + LOOKAHEAD);
        }
    }

    #[test]
    fn scroll_keeps_runner_in_first_third() {
        let mut game = game(&[Plain; 20]);
        assert_eq!(game.scroll_offset(), 0);
        for _ in 0..10 {
            game.apply(VoiceCommand::Run);
        }
        assert_eq!(game.scroll_offset(), game.runner().x - VIEWPORT_COLUMNS / 3);
    }
}
