//! Voice processing module
//!
//! Handles pitch capture for the pitch game, and utterance capture plus
//! speech-to-text for spoken commands.

mod capture;
mod command;
mod listener;
mod microphone;
pub mod pitch;
mod segmenter;
mod signal;
mod stt;

pub use capture::{
    AudioCaptureService, BLOCK_SIZE, BlockAssembler, DeviceInfo, DeviceSelection, SAMPLE_RATE,
    list_devices, samples_to_wav,
};
pub use command::VoiceCommand;
pub use listener::{DEFAULT_BACKOFF, ListenerControl, SpeechCommandListener};
pub use microphone::{ListenError, MicrophoneSource, Utterance, UtteranceSource};
pub use pitch::{PitchMapping, PitchReading};
pub use segmenter::{
    ListenSettings, MIN_ENERGY_THRESHOLD, SegmentEvent, SegmenterState, UtteranceSegmenter,
};
pub use signal::{SignalMonitor, SignalSnapshot};
pub use stt::{RecognitionError, SpeechToText, SttProvider, Transcriber};
