//! Terminal front-end
//!
//! Owns the terminal, maps keys to session actions, keeps the pitch capture
//! running on the screens that need it, and draws every tick.

mod canvas;
mod render;

use std::io::{self, Stdout, stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use tokio::time::MissedTickBehavior;

pub use canvas::{Canvas, Glyph};

use crate::game::{Action, GameSession, Screen, TICK_RATE};
use crate::voice::{
    AudioCaptureService, DeviceInfo, DeviceSelection, ListenerControl, MicrophoneSource,
    SpeechCommandListener, VoiceCommand, list_devices,
};
use crate::{Config, Result};

/// Front-end state that is not part of the simulation
#[derive(Debug, Default)]
pub struct UiState {
    pub devices: Vec<DeviceInfo>,
    pub selected_device: Option<usize>,
    pub show_help: bool,
    /// One-line message shown at the bottom of the screen
    pub status: Option<String>,
}

/// Whether the main loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Restores the terminal when dropped
struct TerminalGuard {
    out: Stdout,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = stdout();
        execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::DisableLineWrap,
        )?;
        Ok(Self { out })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        );
        let _ = terminal::disable_raw_mode();
    }
}

type Listener = Option<SpeechCommandListener>;

struct App {
    session: GameSession<Listener>,
    capture: AudioCaptureService,
    ui: UiState,
}

impl App {
    fn new(config: &Config) -> Self {
        let selection = DeviceSelection::new(config.device);
        let capture = AudioCaptureService::with_selection(selection.clone());

        let (listener, commands) = match config.speech_to_text() {
            Ok(stt) => {
                let (listener, commands) = SpeechCommandListener::new(
                    Arc::new(MicrophoneSource::new(selection)),
                    Arc::new(stt),
                    config.speech.language.clone(),
                );
                (Some(listener), commands)
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition unavailable, keyboard only");
                let (_, commands) = tokio::sync::mpsc::channel(1);
                (None, commands)
            }
        };

        let ui = UiState {
            selected_device: capture.selected_device(),
            ..UiState::default()
        };

        Self {
            session: GameSession::new(listener, commands, config.seed),
            capture,
            ui,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Flow::Quit;
        }

        self.ui.status = None;
        let action = match (self.session.screen(), key.code) {
            (Screen::Menu, KeyCode::Char('q') | KeyCode::Esc) => return Flow::Quit,
            (Screen::Menu, KeyCode::Char('1')) => Some(Action::StartPitch),
            (Screen::Menu, KeyCode::Char('2')) => Some(Action::StartCommand),
            (Screen::Menu, KeyCode::Char('3')) => Some(Action::ConfigureMicrophone),
            (Screen::ConfiguringMicrophone, KeyCode::Char(c)) if c.is_ascii_digit() => {
                self.select_device(c);
                None
            }
            (Screen::ConfiguringMicrophone, KeyCode::Char('t')) => Some(Action::TestMicrophone),
            (Screen::PlayingCommand, KeyCode::Esc) if self.ui.show_help => {
                self.ui.show_help = false;
                None
            }
            (Screen::PlayingCommand, KeyCode::Char('h')) => {
                self.ui.show_help = !self.ui.show_help;
                None
            }
            (Screen::PlayingCommand, KeyCode::Char(c)) => {
                let command = match c {
                    'a' => Some(VoiceCommand::Run),
                    'w' => Some(VoiceCommand::Jump),
                    's' => Some(VoiceCommand::Duck),
                    _ => None,
                };
                if let Some(command) = command {
                    self.session.queue_command(command);
                }
                None
            }
            (Screen::GameOver, KeyCode::Char('r')) => Some(Action::Retry),
            (Screen::GameOver, KeyCode::Char('m')) => Some(Action::ToMenu),
            (_, KeyCode::Esc) => Some(Action::Back),
            _ => None,
        };

        if let Some(action) = action {
            self.apply(action);
        }
        Flow::Continue
    }

    fn apply(&mut self, action: Action) {
        if !self.session.handle(action) {
            return;
        }

        self.ui.show_help = false;
        if self.session.screen() == Screen::ConfiguringMicrophone {
            self.refresh_devices();
        }
        self.sync_capture();
    }

    fn refresh_devices(&mut self) {
        match list_devices() {
            Ok(devices) => self.ui.devices = devices,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list audio devices");
                self.ui.status = Some(e.to_string());
            }
        }
    }

    fn select_device(&mut self, digit: char) {
        let Some(id) = digit.to_digit(10).and_then(|d| usize::try_from(d).ok()) else {
            return;
        };

        match self.capture.select_from(id, &self.ui.devices) {
            Ok(()) => {
                self.ui.selected_device = Some(id);
                if self.capture.is_capturing() {
                    self.start_capture();
                }
            }
            Err(e) => self.ui.status = Some(e.to_string()),
        }
    }

    /// Pitch capture runs only while something reads it
    fn sync_capture(&mut self) {
        let wanted = matches!(
            self.session.screen(),
            Screen::PlayingPitch | Screen::TestingMicrophone
        );
        if wanted && !self.capture.is_capturing() {
            self.start_capture();
        } else if !wanted && self.capture.is_capturing() {
            self.capture.stop();
        }
    }

    fn start_capture(&mut self) {
        if let Err(e) = self.capture.start() {
            tracing::error!(error = %e, "failed to start audio capture");
            self.ui.status = Some(e.to_string());
        }
    }
}

/// Run the interactive game until the user quits
///
/// # Errors
///
/// Returns error if the terminal cannot be driven
#[allow(clippy::future_not_send)]
pub async fn run(config: &Config) -> Result<()> {
    let mut app = App::new(config);
    let mut guard = TerminalGuard::enter()?;

    let (cols, rows) = terminal::size()?;
    let mut canvas = Canvas::new(usize::from(cols), usize::from(rows));

    let monitor = app.capture.monitor();
    let mut ticker = tokio::time::interval(Duration::from_secs(1) / TICK_RATE);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(cols, rows, "terminal front-end started");

    loop {
        ticker.tick().await;

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) == Flow::Quit {
                        tracing::info!("quit");
                        app.capture.stop();
                        return Ok(());
                    }
                }
                Event::Resize(c, r) => canvas.resize(usize::from(c), usize::from(r)),
                _ => {}
            }
        }

        let signal = monitor.snapshot();
        let before = app.session.screen();
        app.session.tick(signal.smoothed_pitch);
        if app.session.screen() != before {
            app.ui.show_help = false;
            app.sync_capture();
        }

        render::draw(&mut canvas, &app.session, &app.ui, signal);
        canvas.render(&mut guard.out)?;
    }
}
