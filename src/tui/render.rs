//! Drawing of every screen onto the canvas

use crossterm::style::Color;

use super::UiState;
use super::canvas::{Canvas, Glyph};
use crate::game::command::VIEWPORT_COLUMNS;
use crate::game::pitch::{AVATAR_X, BARRIER_GAP, BARRIER_WIDTH, HEIGHT, POINTS_PER_LEVEL, WIDTH};
use crate::game::terrain::{Cell, GRID_HEIGHT};
use crate::game::{ActiveGame, Animation, CommandGame, GameSession, PitchGame, Screen};
use crate::voice::pitch::{MAX_PITCH, MIN_PITCH};
use crate::voice::{ListenerControl, SignalSnapshot, VoiceCommand};

const TITLE: Color = Color::Yellow;
const HINT: Color = Color::DarkGrey;
const TEXT: Color = Color::White;
const PITCH_BG: Color = Color::Rgb { r: 20, g: 20, b: 30 };
const SKY: Color = Color::Rgb {
    r: 135,
    g: 206,
    b: 235,
};

/// Draw the current screen
pub fn draw<L: ListenerControl>(
    canvas: &mut Canvas,
    session: &GameSession<L>,
    ui: &UiState,
    signal: SignalSnapshot,
) {
    canvas.clear(Color::Black);

    match (session.screen(), session.game()) {
        (Screen::Menu, _) => draw_menu(canvas),
        (Screen::ConfiguringMicrophone, _) => draw_devices(canvas, ui),
        (Screen::TestingMicrophone, _) => draw_mic_test(canvas, signal),
        (Screen::PlayingPitch, Some(ActiveGame::Pitch(game))) => {
            draw_pitch_game(canvas, game, signal);
        }
        (Screen::PlayingCommand, Some(ActiveGame::Command(game))) => {
            draw_command_game(canvas, game, session.last_command(), session.listener().is_active());
            if ui.show_help {
                draw_help(canvas);
            }
        }
        (Screen::GameOver, game) => draw_game_over(canvas, game.map_or(0, ActiveGame::score)),
        _ => {}
    }

    if let Some(status) = &ui.status {
        let y = to_i32(canvas.height()) - 1;
        canvas.text(1, y, status, Color::Red);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn to_i32(v: usize) -> i32 {
    v as i32
}

/// Scale a playfield coordinate to a canvas cell
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn scale(value: f32, field: f32, cells: usize) -> i32 {
    (value / field * cells as f32).floor() as i32
}

// -- menus ---

fn draw_menu(canvas: &mut Canvas) {
    let top = to_i32(canvas.height()) / 3;
    canvas.centered_text(top, "V O I C E   A R C A D E", TITLE);
    canvas.centered_text(top + 3, "[1] Pitch game", TEXT);
    canvas.centered_text(top + 4, "[2] Command game", TEXT);
    canvas.centered_text(top + 5, "[3] Microphone", TEXT);
    canvas.centered_text(top + 7, "[q] Quit", HINT);
}

fn draw_devices(canvas: &mut Canvas, ui: &UiState) {
    canvas.centered_text(1, "Microphone", TITLE);

    if ui.devices.is_empty() {
        canvas.centered_text(4, "No input devices found", TEXT);
    }
    for (row, device) in (4..).zip(&ui.devices) {
        let marker = if ui.selected_device == Some(device.id) {
            '>'
        } else {
            ' '
        };
        let line = format!(
            "{marker} [{}] {} ({} ch, {} Hz)",
            device.id, device.name, device.channels, device.sample_rate
        );
        canvas.text(2, row, &line, TEXT);
    }

    let bottom = to_i32(canvas.height()) - 3;
    canvas.centered_text(bottom, "[0-9] Select  [t] Test  [Esc] Back", HINT);
}

fn draw_mic_test(canvas: &mut Canvas, signal: SignalSnapshot) {
    canvas.centered_text(1, "Microphone test", TITLE);
    canvas.centered_text(3, "Speak or hum into the microphone", TEXT);

    let bar_width = canvas.width().saturating_sub(10);
    draw_bar(canvas, 5, 6, bar_width, signal.volume / 100.0, Color::Green);
    canvas.text(5, 5, &format!("Volume {:>5.1}", signal.volume), TEXT);

    let pitch_text = if signal.pitch > 0.0 {
        format!("Pitch  {:>5.0} Hz", signal.pitch)
    } else {
        "Pitch      -".to_string()
    };
    canvas.text(5, 8, &pitch_text, TEXT);

    let position = signal
        .smoothed_pitch
        .map_or(0.0, |p| (p - MIN_PITCH) / (MAX_PITCH - MIN_PITCH));
    draw_bar(canvas, 5, 9, bar_width, position, Color::Cyan);
    canvas.text(5, 10, &format!("{MIN_PITCH:.0} Hz"), HINT);

    let bottom = to_i32(canvas.height()) - 3;
    canvas.centered_text(bottom, "[Esc] Back", HINT);
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn draw_bar(canvas: &mut Canvas, x: i32, y: i32, width: usize, fraction: f32, color: Color) {
    let filled = (fraction.clamp(0.0, 1.0) * width as f32).round() as usize;
    canvas.fill_rect(x, y, to_i32(width), 1, Glyph::new('░', HINT, Color::Black));
    canvas.fill_rect(x, y, to_i32(filled), 1, Glyph::new('█', color, Color::Black));
}

fn draw_game_over(canvas: &mut Canvas, score: u32) {
    let top = to_i32(canvas.height()) / 3;
    canvas.centered_text(top, "GAME OVER", Color::Red);
    canvas.centered_text(top + 2, &format!("Score: {score}"), TEXT);
    canvas.centered_text(top + 5, "[r] Retry  [m] Menu", HINT);
}

fn draw_lives(canvas: &mut Canvas, lives: u32) {
    let hearts: String = (0..lives).map(|_| '♥').collect();
    let x = to_i32(canvas.width()) - to_i32(hearts.chars().count()) - 2;
    canvas.text(x, 0, &hearts, Color::Red);
}

// -- pitch game ---

fn draw_pitch_game(canvas: &mut Canvas, game: &PitchGame, signal: SignalSnapshot) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.clear(PITCH_BG);

    let pillar = Glyph::new('█', Color::Green, PITCH_BG);
    for barrier in game.barriers() {
        let x0 = scale(barrier.x, WIDTH, w);
        let x1 = scale(barrier.x + BARRIER_WIDTH, WIDTH, w).max(x0 + 1);
        let gap_top = scale(barrier.gap_y, HEIGHT, h);
        let gap_bottom = scale(barrier.gap_y + BARRIER_GAP, HEIGHT, h);
        canvas.fill_rect(x0, 0, x1 - x0, gap_top, pillar);
        canvas.fill_rect(x0, gap_bottom, x1 - x0, to_i32(h) - gap_bottom, pillar);
    }

    let board = game.scoreboard();
    if !board.is_blinking() {
        let color = if board.is_invulnerable() {
            Color::Rgb {
                r: 100,
                g: 100,
                b: 255,
            }
        } else {
            Color::Rgb { r: 0, g: 200, b: 255 }
        };
        let x = scale(AVATAR_X, WIDTH, w);
        let y = scale(game.avatar_y(), HEIGHT, h);
        canvas.set(x, y, Glyph::new('●', color, PITCH_BG));
    }

    canvas.text(1, 0, &format!("Score: {}", board.score), TEXT);
    if board.score / POINTS_PER_LEVEL > 0 {
        canvas.text(
            1,
            1,
            &format!("Speed: {:.2}x", game.speed_multiplier()),
            Color::Rgb { r: 255, g: 200, b: 0 },
        );
    }
    draw_lives(canvas, board.lives);

    let pitch = signal
        .smoothed_pitch
        .map_or_else(|| "no voice".to_string(), |p| format!("{p:.0} Hz"));
    canvas.text(1, to_i32(h) - 1, &format!("Pitch: {pitch}  [Esc] Menu"), HINT);
}

// -- command game ---

fn draw_command_game(
    canvas: &mut Canvas,
    game: &CommandGame,
    last_command: Option<VoiceCommand>,
    listening: bool,
) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_rect(0, 0, to_i32(w), to_i32(h) / 2, Glyph::new(' ', TEXT, SKY));

    let cell_w = to_i32((w / VIEWPORT_COLUMNS).max(1));
    let cell_h = to_i32(((h.saturating_sub(2)) / GRID_HEIGHT).max(1));
    let origin_y = to_i32(h) - cell_h * to_i32(GRID_HEIGHT);
    let offset = game.scroll_offset();

    for col in 0..VIEWPORT_COLUMNS {
        let Some(column) = game.map().column(offset + col) else {
            continue;
        };
        for row in 0..GRID_HEIGHT {
            let glyph = match column.cell(row) {
                Cell::Ground => Glyph::new('▓', Color::DarkYellow, Color::Rgb { r: 90, g: 60, b: 30 }),
                Cell::LowCeiling => Glyph::new('▀', Color::Grey, Color::DarkGrey),
                Cell::Platform => Glyph::new('=', Color::Grey, Color::Black),
                Cell::Empty => continue,
            };
            canvas.fill_rect(
                to_i32(col) * cell_w,
                origin_y + to_i32(row) * cell_h,
                cell_w,
                cell_h,
                glyph,
            );
        }
    }

    let runner = game.runner();
    let board = game.scoreboard();
    if !board.is_blinking() {
        let (ch, color) = match runner.animation {
            Animation::Idle => ('@', TEXT),
            Animation::Running => ('@', Color::Green),
            Animation::Jumping => ('^', Color::Yellow),
            Animation::Ducking => ('_', Color::Magenta),
        };
        let lift = if runner.animation == Animation::Jumping {
            cell_h
        } else {
            0
        };
        let x = to_i32(runner.x - offset) * cell_w + cell_w / 2;
        let y = origin_y + to_i32(runner.row) * cell_h + cell_h / 2 - lift;
        canvas.set(x, y, Glyph::new(ch, color, Color::Black));
    }

    canvas.text(1, 0, &format!("Score: {}", board.score), Color::Black);
    draw_lives(canvas, board.lives);

    let heard = last_command.map_or("-", VoiceCommand::label);
    let status = if listening { "listening" } else { "mic off" };
    canvas.text(1, 1, &format!("Last: {heard}  ({status})"), Color::Black);
    canvas.text(1, 2, "[a/w/s] run/jump/duck  [h] Help  [Esc] Menu", Color::DarkBlue);
}

fn draw_help(canvas: &mut Canvas) {
    let (w, h) = (to_i32(canvas.width()), to_i32(canvas.height()));
    let box_w = 50.min(w - 2);
    let box_h = 11.min(h - 2);
    let (x, y) = ((w - box_w) / 2, (h - box_h) / 2);
    canvas.fill_rect(x, y, box_w, box_h, Glyph::new(' ', TEXT, Color::DarkBlue));

    canvas.text(x + 2, y + 1, "Say one of these words:", TITLE);
    for (row, command) in (y + 3..).step_by(2).zip(VoiceCommand::ALL) {
        let words = command.vocabulary().join(", ");
        canvas.text(x + 2, row, &format!("{:<5} {words}", command.label()), TEXT);
    }
    canvas.text(x + 2, y + box_h - 2, "Keys: a run, w jump, s duck, h close", HINT);
}
