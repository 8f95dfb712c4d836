//! Pitch mode physics, difficulty and collision tests

use voice_arcade::game::pitch::{AVATAR_X, BASE_SPEED, speed_for_score};
use voice_arcade::game::{Barrier, INITIAL_LIVES, INVULNERABILITY_TICKS, PitchGame};
use voice_arcade::voice::PitchMapping;
use voice_arcade::voice::pitch::{MAX_PITCH, MIN_PITCH};

mod common;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

// -- mapping ---

#[test]
fn test_higher_pitch_never_lowers_the_avatar() {
    let mapping = PitchMapping::default();
    let mut previous = mapping.target_y(MIN_PITCH);
    let mut pitch = MIN_PITCH;
    while pitch <= MAX_PITCH {
        let y = mapping.target_y(pitch);
        assert!(y <= previous, "target rose from {previous} to {y} at {pitch} Hz");
        previous = y;
        pitch += 0.5;
    }
    assert!(approx(mapping.target_y(MIN_PITCH), 550.0));
    assert!(approx(mapping.target_y(MAX_PITCH), 50.0));
}

// -- difficulty ---

#[test]
fn test_score_four_is_level_two_speed() {
    let mut game = PitchGame::seeded(3);
    game.set_score(4);
    assert!(approx(game.speed(), BASE_SPEED * 1.25 * 1.25));
    assert!(approx(speed_for_score(4), 4.6875));
    assert_eq!(game.spawn_interval(), 96);
}

#[test]
fn test_passing_barrier_raises_speed_at_level_boundary() {
    let mut game = PitchGame::seeded(3);
    game.set_score(1);
    game.scoreboard_mut().invulnerability = 10;
    game.insert_barrier(Barrier::new(AVATAR_X - 21.0, 0.0));

    game.tick(None);

    assert_eq!(game.scoreboard().score, 2);
    assert!(approx(game.speed(), BASE_SPEED * 1.25));
}

// -- easing ---

#[test]
fn test_avatar_eases_toward_target() {
    let mut game = PitchGame::seeded(3);
    game.tick(Some(MAX_PITCH));
    assert!(approx(game.target_y(), 50.0));
    assert!(approx(game.avatar_y(), 550.0 - 500.0 * 0.05));
}

#[test]
fn test_silence_returns_avatar_to_ground() {
    let mut game = PitchGame::seeded(3);
    game.set_avatar_y(300.0);
    game.tick(None);
    assert!(approx(game.target_y(), 550.0));
    assert!(game.avatar_y() > 300.0);
}

// -- collision ---

#[test]
fn test_two_overlapping_barriers_cost_one_life() {
    let mut game = PitchGame::seeded(3);
    game.insert_barrier(Barrier::new(AVATAR_X - 5.0, 100.0));
    game.insert_barrier(Barrier::new(AVATAR_X + 5.0, 100.0));

    game.tick(None);

    assert_eq!(game.scoreboard().lives, INITIAL_LIVES - 1);
    assert_eq!(game.barriers().len(), 1);
    assert_eq!(game.scoreboard().invulnerability, INVULNERABILITY_TICKS);

    game.tick(None);
    assert_eq!(game.scoreboard().lives, INITIAL_LIVES - 1);
    assert_eq!(game.barriers().len(), 1);
}

#[test]
fn test_flying_through_gap_is_safe() {
    let mut game = PitchGame::seeded(3);
    game.insert_barrier(Barrier::new(AVATAR_X - 5.0, 475.0));
    game.tick(None);
    assert_eq!(game.scoreboard().lives, INITIAL_LIVES);
}

#[test]
fn test_game_ends_after_three_hits() {
    let mut game = PitchGame::seeded(3);
    for _ in 0..3 {
        game.insert_barrier(Barrier::new(AVATAR_X, 0.0));
        game.tick(None);
        for _ in 0..INVULNERABILITY_TICKS {
            game.tick(None);
        }
    }
    assert!(game.is_over());
}

#[test]
fn test_leaving_the_playfield_only_starts_invulnerability() {
    let mut game = PitchGame::seeded(3);
    game.set_avatar_y(700.0);
    game.tick(None);
    assert_eq!(game.scoreboard().lives, INITIAL_LIVES);
    assert_eq!(game.scoreboard().invulnerability, INVULNERABILITY_TICKS);

    // Staying out of bounds for a long time never ends the game
    for _ in 0..200 {
        game.set_avatar_y(-50.0);
        game.tick(None);
    }
    assert_eq!(game.scoreboard().lives, INITIAL_LIVES);
    assert!(!game.is_over());
}
