//! Pitch mode: steer an avatar through scrolling gates with your voice

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{INVULNERABILITY_TICKS, Scoreboard};
use crate::voice::PitchMapping;

/// Playfield width
pub const WIDTH: f32 = 800.0;

/// Playfield height
pub const HEIGHT: f32 = 600.0;

/// Fixed horizontal position of the avatar
pub const AVATAR_X: f32 = 200.0;

pub const AVATAR_RADIUS: f32 = 20.0;

pub const BARRIER_WIDTH: f32 = 20.0;

/// Vertical opening of every barrier
pub const BARRIER_GAP: f32 = 150.0;

/// Range of the top edge of the opening
pub const GAP_Y_RANGE: std::ops::RangeInclusive<u32> = 100..=350;

pub const BASE_SPEED: f32 = 3.0;

/// Speed multiplier applied per level
pub const SPEED_FACTOR: f32 = 1.25;

/// Points per level
pub const POINTS_PER_LEVEL: u32 = 2;

const BASE_SPAWN_INTERVAL: f32 = 150.0;
const MIN_SPAWN_INTERVAL: u32 = 30;

/// Fraction of the remaining distance covered per tick
const EASING: f32 = 0.05;

/// A pair of pillars with an opening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barrier {
    /// Left edge
    pub x: f32,
    /// Top of the opening
    pub gap_y: f32,
    pub passed: bool,
}

impl Barrier {
    #[must_use]
    pub const fn new(x: f32, gap_y: f32) -> Self {
        Self {
            x,
            gap_y,
            passed: false,
        }
    }

    /// Whether the avatar's horizontal extent overlaps this barrier
    #[must_use]
    pub const fn overlaps_avatar(&self) -> bool {
        AVATAR_X + AVATAR_RADIUS > self.x && AVATAR_X - AVATAR_RADIUS < self.x + BARRIER_WIDTH
    }

    /// Whether `y` lies strictly inside the opening
    #[must_use]
    pub const fn gap_contains(&self, y: f32) -> bool {
        self.gap_y < y && y < self.gap_y + BARRIER_GAP
    }

    #[must_use]
    pub const fn right_edge(&self) -> f32 {
        self.x + BARRIER_WIDTH
    }
}

/// `level = score / 2`
#[must_use]
pub const fn level_for_score(score: u32) -> u32 {
    score / POINTS_PER_LEVEL
}

/// Barrier speed in px per tick for a score
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
#[must_use]
pub fn speed_for_score(score: u32) -> f32 {
    BASE_SPEED * SPEED_FACTOR.powi(level_for_score(score) as i32)
}

/// Ticks between barrier spawns for a score
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn spawn_interval_for_score(score: u32) -> u32 {
    let scaled = (BASE_SPAWN_INTERVAL / SPEED_FACTOR.powi(level_for_score(score) as i32)).floor();
    (scaled as u32).max(MIN_SPAWN_INTERVAL)
}

/// State of one pitch-mode game
#[derive(Debug, Clone)]
pub struct PitchGame<R: Rng = StdRng> {
    rng: R,
    mapping: PitchMapping,
    avatar_y: f32,
    target_y: f32,
    barriers: Vec<Barrier>,
    spawn_timer: u32,
    speed: f32,
    spawn_interval: u32,
    scoreboard: Scoreboard,
}

impl PitchGame<StdRng> {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> PitchGame<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        let mapping = PitchMapping::default();
        Self {
            rng,
            avatar_y: mapping.ground_y,
            target_y: mapping.ground_y,
            mapping,
            barriers: Vec::new(),
            spawn_timer: 0,
            speed: speed_for_score(0),
            spawn_interval: spawn_interval_for_score(0),
            scoreboard: Scoreboard::new(),
        }
    }

    /// Advance one tick with the current smoothed pitch (`None` = no voice)
    pub fn tick(&mut self, smoothed_pitch: Option<f32>) {
        self.spawn_timer += 1;
        if self.spawn_timer > self.spawn_interval {
            #[allow(clippy::cast_precision_loss)]
            let gap_y = self.rng.gen_range(GAP_Y_RANGE) as f32;
            self.insert_barrier(Barrier::new(WIDTH, gap_y));
            self.spawn_timer = 0;
        }

        for barrier in &mut self.barriers {
            barrier.x -= self.speed;
        }
        self.barriers.retain(|b| b.right_edge() > 0.0);

        if self.scoreboard.is_invulnerable() {
            self.scoreboard.tick_invulnerability();
        } else {
            self.check_collision();
        }

        let mut passed = 0;
        for barrier in &mut self.barriers {
            if !barrier.passed && barrier.right_edge() < AVATAR_X {
                barrier.passed = true;
                passed += 1;
            }
        }
        if passed > 0 {
            self.scoreboard.score += passed;
            self.speed = speed_for_score(self.scoreboard.score);
            self.spawn_interval = spawn_interval_for_score(self.scoreboard.score);
            tracing::debug!(
                score = self.scoreboard.score,
                speed = self.speed,
                "barrier passed"
            );
        }

        self.target_y = smoothed_pitch.map_or(self.mapping.ground_y, |p| self.mapping.target_y(p));
        self.avatar_y += (self.target_y - self.avatar_y) * EASING;
    }

    /// At most one life per tick, and only the first offending barrier goes
    fn check_collision(&mut self) {
        let y = self.avatar_y;
        let hit = self
            .barriers
            .iter()
            .position(|b| b.overlaps_avatar() && !b.gap_contains(y));

        if let Some(index) = hit {
            self.barriers.remove(index);
            self.scoreboard.hit();
            tracing::debug!(lives = self.scoreboard.lives, "hit barrier");
        } else if !(0.0..=HEIGHT).contains(&y) {
            // Out of bounds only grants the slowdown window, no life is lost
            self.scoreboard.invulnerability = INVULNERABILITY_TICKS;
            tracing::debug!(y, "left the playfield");
        }
    }

    /// Place a barrier directly (spawning is otherwise timer-driven)
    pub fn insert_barrier(&mut self, barrier: Barrier) {
        self.barriers.push(barrier);
    }

    pub const fn set_avatar_y(&mut self, y: f32) {
        self.avatar_y = y;
    }

    #[must_use]
    pub const fn avatar_y(&self) -> f32 {
        self.avatar_y
    }

    #[must_use]
    pub const fn target_y(&self) -> f32 {
        self.target_y
    }

    #[must_use]
    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }

    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Current speed relative to the base speed
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed / BASE_SPEED
    }

    #[must_use]
    pub const fn spawn_interval(&self) -> u32 {
        self.spawn_interval
    }

    #[must_use]
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub const fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }

    /// Set the score and the speed that goes with it
    pub fn set_score(&mut self, score: u32) {
        self.scoreboard.score = score;
        self.speed = speed_for_score(score);
        self.spawn_interval = spawn_interval_for_score(score);
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.scoreboard.is_game_over()
    }
}
