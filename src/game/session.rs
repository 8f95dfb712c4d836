//! Top-level game state machine
//!
//! One `GameSession` owns the active game, the command inbox and the
//! listener handle, and is advanced once per tick by the front-end.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use super::command::CommandGame;
use super::pitch::PitchGame;
use super::terrain::TerrainGenerator;
use crate::voice::{ListenerControl, VoiceCommand};

/// What the front-end should be showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    ConfiguringMicrophone,
    TestingMicrophone,
    PlayingPitch,
    PlayingCommand,
    GameOver,
}

/// The two game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Pitch,
    Command,
}

/// User intents the front-end translates input into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartPitch,
    StartCommand,
    ConfigureMicrophone,
    TestMicrophone,
    Back,
    Retry,
    ToMenu,
}

/// The game currently being played (kept on the game-over screen for its score)
#[derive(Debug, Clone)]
pub enum ActiveGame {
    Pitch(PitchGame),
    Command(CommandGame),
}

impl ActiveGame {
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        match self {
            Self::Pitch(_) => GameMode::Pitch,
            Self::Command(_) => GameMode::Command,
        }
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        match self {
            Self::Pitch(game) => game.scoreboard().score,
            Self::Command(game) => game.scoreboard().score,
        }
    }

    #[must_use]
    pub const fn lives(&self) -> u32 {
        match self {
            Self::Pitch(game) => game.scoreboard().lives,
            Self::Command(game) => game.scoreboard().lives,
        }
    }

    const fn is_over(&self) -> bool {
        match self {
            Self::Pitch(game) => game.is_over(),
            Self::Command(game) => game.is_over(),
        }
    }
}

/// Simulation context passed through every tick
pub struct GameSession<L: ListenerControl> {
    screen: Screen,
    listener: L,
    commands: mpsc::Receiver<VoiceCommand>,
    queued: Option<VoiceCommand>,
    seed: Option<u64>,
    game: Option<ActiveGame>,
    last_mode: Option<GameMode>,
    last_command: Option<VoiceCommand>,
}

impl<L: ListenerControl> GameSession<L> {
    /// Create a session on the menu screen
    ///
    /// With a seed every game gets the same course, otherwise courses are random.
    #[must_use]
    pub const fn new(
        listener: L,
        commands: mpsc::Receiver<VoiceCommand>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            screen: Screen::Menu,
            listener,
            commands,
            queued: None,
            seed,
            game: None,
            last_mode: None,
            last_command: None,
        }
    }

    /// Apply a user action; returns whether the screen changed
    pub fn handle(&mut self, action: Action) -> bool {
        let before = self.screen;

        match (self.screen, action) {
            (Screen::Menu, Action::StartPitch) => self.start(GameMode::Pitch),
            (Screen::Menu, Action::StartCommand) => self.start(GameMode::Command),
            (Screen::Menu, Action::ConfigureMicrophone) => {
                self.screen = Screen::ConfiguringMicrophone;
            }
            (Screen::ConfiguringMicrophone, Action::TestMicrophone) => {
                self.screen = Screen::TestingMicrophone;
            }
            (Screen::ConfiguringMicrophone, Action::Back | Action::ToMenu) => {
                self.screen = Screen::Menu;
            }
            (Screen::TestingMicrophone, Action::Back) => {
                self.screen = Screen::ConfiguringMicrophone;
            }
            (Screen::PlayingPitch | Screen::PlayingCommand, Action::Back | Action::ToMenu) => {
                tracing::info!("game abandoned");
                self.leave_game();
                self.screen = Screen::Menu;
            }
            (Screen::GameOver, Action::Retry) => {
                if let Some(mode) = self.last_mode {
                    self.start(mode);
                }
            }
            (Screen::GameOver, Action::ToMenu | Action::Back) => {
                self.game = None;
                self.screen = Screen::Menu;
            }
            (screen, action) => {
                tracing::trace!(?screen, ?action, "action ignored");
            }
        }

        if self.screen != before {
            tracing::debug!(from = ?before, to = ?self.screen, "screen changed");
        }
        self.screen != before
    }

    /// Advance the active game by one tick
    pub fn tick(&mut self, smoothed_pitch: Option<f32>) {
        match (self.screen, self.game.as_mut()) {
            (Screen::PlayingPitch, Some(ActiveGame::Pitch(game))) => game.tick(smoothed_pitch),
            (Screen::PlayingCommand, Some(ActiveGame::Command(game))) => {
                let command = self.queued.take().or_else(|| self.commands.try_recv().ok());
                if let Some(command) = command {
                    self.last_command = Some(command);
                }
                game.tick(command);
            }
            _ => return,
        }

        if self.game.as_ref().is_some_and(ActiveGame::is_over) {
            let score = self.game.as_ref().map_or(0, ActiveGame::score);
            tracing::info!(score, mode = ?self.last_mode, "game over");
            self.leave_game();
            self.screen = Screen::GameOver;
        }
    }

    /// Queue a command from another input (the keyboard) for the next tick
    pub fn queue_command(&mut self, command: VoiceCommand) {
        if self.screen == Screen::PlayingCommand {
            self.queued = Some(command);
        }
    }

    fn start(&mut self, mode: GameMode) {
        self.queued = None;
        self.last_command = None;
        self.last_mode = Some(mode);

        match mode {
            GameMode::Pitch => {
                let game = self.seed.map_or_else(PitchGame::from_entropy, PitchGame::seeded);
                self.game = Some(ActiveGame::Pitch(game));
                self.screen = Screen::PlayingPitch;
            }
            GameMode::Command => {
                let rng = self.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                let game = CommandGame::new(TerrainGenerator::new(rng));
                self.game = Some(ActiveGame::Command(game));
                while self.commands.try_recv().is_ok() {}
                self.listener.start();
                self.screen = Screen::PlayingCommand;
            }
        }

        tracing::info!(?mode, "game started");
    }

    fn leave_game(&mut self) {
        if self.screen == Screen::PlayingCommand {
            self.listener.stop();
        }
        self.queued = None;
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub const fn game(&self) -> Option<&ActiveGame> {
        self.game.as_ref()
    }

    pub const fn game_mut(&mut self) -> Option<&mut ActiveGame> {
        self.game.as_mut()
    }

    /// Mode to restart on retry
    #[must_use]
    pub const fn last_mode(&self) -> Option<GameMode> {
        self.last_mode
    }

    /// Most recent command applied in command mode
    #[must_use]
    pub const fn last_command(&self) -> Option<VoiceCommand> {
        self.last_command
    }

    #[must_use]
    pub const fn listener(&self) -> &L {
        &self.listener
    }
}

impl<L: ListenerControl> Drop for GameSession<L> {
    fn drop(&mut self) {
        self.leave_game();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Switch {
        active: bool,
        starts: u32,
    }

    impl ListenerControl for Switch {
        fn start(&mut self) {
            self.active = true;
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn session() -> (GameSession<Switch>, mpsc::Sender<VoiceCommand>) {
        let (tx, rx) = mpsc::channel(1);
        (GameSession::new(Switch::default(), rx, Some(5)), tx)
    }

    #[test]
    fn menu_ignores_retry() {
        let (mut session, _tx) = session();
        assert!(!session.handle(Action::Retry));
        assert_eq!(session.screen(), Screen::Menu);
    }

    #[test]
    fn microphone_screens_navigate_back() {
        let (mut session, _tx) = session();
        session.handle(Action::ConfigureMicrophone);
        session.handle(Action::TestMicrophone);
        assert_eq!(session.screen(), Screen::TestingMicrophone);
        session.handle(Action::Back);
        assert_eq!(session.screen(), Screen::ConfiguringMicrophone);
        session.handle(Action::Back);
        assert_eq!(session.screen(), Screen::Menu);
    }

    #[test]
    fn stale_commands_are_drained_on_start() {
        let (mut session, tx) = session();
        tx.try_send(VoiceCommand::Jump).unwrap();
        session.handle(Action::StartCommand);
        session.tick(None);
        assert_eq!(session.last_command(), None);
    }

    #[test]
    fn queued_command_is_applied() {
        let (mut session, _tx) = session();
        session.handle(Action::StartCommand);
        session.queue_command(VoiceCommand::Run);
        session.tick(None);
        assert_eq!(session.last_command(), Some(VoiceCommand::Run));
    }
}
