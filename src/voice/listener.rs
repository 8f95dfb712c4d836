//! Background speech command listener
//!
//! Runs a capture → transcribe → match loop on a tokio task and publishes
//! recognized commands through a capacity-1 outbox. A command that arrives
//! while another is still pending is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::command::VoiceCommand;
use super::microphone::{ListenError, UtteranceSource};
use super::segmenter::ListenSettings;
use super::stt::{RecognitionError, Transcriber};

/// Delay before retrying after a device or service failure
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Start/stop surface the game state machine drives
pub trait ListenerControl {
    /// Begin listening; no-op while already active
    fn start(&mut self);

    /// Ask the loop to stop after its current cycle
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// No listener configured (keyboard-only command mode)
impl<T: ListenerControl> ListenerControl for Option<T> {
    fn start(&mut self) {
        if let Some(listener) = self {
            listener.start();
        }
    }

    fn stop(&mut self) {
        if let Some(listener) = self {
            listener.stop();
        }
    }

    fn is_active(&self) -> bool {
        self.as_ref().is_some_and(ListenerControl::is_active)
    }
}

/// Everything the loop needs, cloned into each task
#[derive(Clone)]
struct LoopContext {
    source: Arc<dyn UtteranceSource>,
    transcriber: Arc<dyn Transcriber>,
    language: String,
    settings: ListenSettings,
    backoff: Duration,
    outbox: mpsc::Sender<VoiceCommand>,
}

struct ActiveTask {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Listens for spoken commands on a background task
pub struct SpeechCommandListener {
    context: LoopContext,
    task: Option<ActiveTask>,
}

impl SpeechCommandListener {
    /// Create a listener and the receiving end of its outbox
    #[must_use]
    pub fn new(
        source: Arc<dyn UtteranceSource>,
        transcriber: Arc<dyn Transcriber>,
        language: impl Into<String>,
    ) -> (Self, mpsc::Receiver<VoiceCommand>) {
        let (outbox, inbox) = mpsc::channel(1);
        let listener = Self {
            context: LoopContext {
                source,
                transcriber,
                language: language.into(),
                settings: ListenSettings::default(),
                backoff: DEFAULT_BACKOFF,
                outbox,
            },
            task: None,
        };
        (listener, inbox)
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ListenSettings) -> Self {
        self.context.settings = settings;
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.context.backoff = backoff;
        self
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.context.language
    }
}

impl ListenerControl for SpeechCommandListener {
    fn start(&mut self) {
        if self.is_active() {
            return;
        }

        // A stopped task may still be finishing its last cycle; it only checks
        // its own flag, so a fresh task can start alongside it.
        let running = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run_loop(self.context.clone(), Arc::clone(&running)));
        self.task = Some(ActiveTask { running, handle });

        tracing::info!(language = %self.context.language, "command listener started");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.running.store(false, Ordering::Release);
            tracing::info!("command listener stopping");
        }
    }

    fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| t.running.load(Ordering::Acquire) && !t.handle.is_finished())
    }
}

impl Drop for SpeechCommandListener {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(ctx: LoopContext, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        let source = Arc::clone(&ctx.source);
        let settings = ctx.settings.clone();
        let captured = tokio::task::spawn_blocking(move || source.capture(&settings)).await;

        if !running.load(Ordering::Acquire) {
            break;
        }

        let utterance = match captured {
            Ok(Ok(utterance)) => utterance,
            Ok(Err(ListenError::Timeout)) => continue,
            Ok(Err(ListenError::Device(message))) => {
                tracing::warn!(error = %message, "microphone unavailable, retrying");
                tokio::time::sleep(ctx.backoff).await;
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, "capture task failed");
                tokio::time::sleep(ctx.backoff).await;
                continue;
            }
        };

        tracing::debug!(
            duration_ms = utterance.duration().as_millis(),
            "utterance captured"
        );

        let transcript = match ctx.transcriber.transcribe(&utterance, &ctx.language).await {
            Ok(text) => text,
            Err(RecognitionError::NoSpeech) => {
                tracing::debug!("utterance not understood");
                continue;
            }
            Err(RecognitionError::Service(message)) => {
                tracing::warn!(error = %message, "recognition failed, retrying");
                tokio::time::sleep(ctx.backoff).await;
                continue;
            }
        };

        let Some(command) = VoiceCommand::from_transcript(&transcript) else {
            tracing::info!(transcript = %transcript, "no command in transcript");
            continue;
        };

        if !running.load(Ordering::Acquire) {
            break;
        }

        match ctx.outbox.try_send(command) {
            Ok(()) => tracing::info!(%command, transcript = %transcript, "command recognized"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(%command, "command dropped, previous one still pending");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("command receiver gone");
                break;
            }
        }
    }

    tracing::debug!("command listener stopped");
}
