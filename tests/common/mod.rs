//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use voice_arcade::game::{ColumnKind, GameMap};
use voice_arcade::voice::{
    ListenError, ListenSettings, ListenerControl, RecognitionError, Transcriber, Utterance,
    UtteranceSource,
};

/// Generate sine wave audio samples
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sine(frequency: f32, duration_secs: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn silence(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; (sample_rate as f32 * duration_secs) as usize]
}

/// A short utterance with arbitrary content
pub fn utterance() -> Utterance {
    Utterance {
        samples: vec![0.2; 1600],
        sample_rate: 16_000,
    }
}

/// Build a map from column kinds
pub fn map(kinds: &[ColumnKind]) -> GameMap {
    GameMap::from_kinds(kinds)
}

/// Utterance source that replays a script, then keeps timing out
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Utterance, ListenError>>>,
    captures: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Utterance, ListenError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            captures: AtomicUsize::new(0),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl UtteranceSource for ScriptedSource {
    fn capture(&self, _settings: &ListenSettings) -> Result<Utterance, ListenError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            std::thread::sleep(Duration::from_millis(5));
            Err(ListenError::Timeout)
        })
    }
}

/// Transcriber that replays a script, then hears nothing
pub struct ScriptedTranscriber {
    script: Mutex<VecDeque<Result<String, RecognitionError>>>,
    languages: Mutex<Vec<String>>,
}

impl ScriptedTranscriber {
    pub fn new(script: Vec<Result<String, RecognitionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            languages: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok((*t).to_string())).collect())
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        _utterance: &Utterance,
        language: &str,
    ) -> Result<String, RecognitionError> {
        self.languages.lock().unwrap().push(language.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Err(RecognitionError::NoSpeech))
    }
}

/// Listener stand-in that records how it was driven
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub active: bool,
    pub starts: u32,
    pub stops: u32,
}

impl ListenerControl for RecordingListener {
    fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.starts += 1;
        }
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.stops += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
