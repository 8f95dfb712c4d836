//! Scoped microphone capture of single utterances

use std::sync::mpsc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};

use super::capture::{BlockAssembler, DeviceSelection, input_config, input_device, samples_to_wav};
use super::segmenter::{ListenSettings, SegmentEvent, UtteranceSegmenter};
use crate::Result;

/// Chunk size fed to the segmenter (~23 ms at 44.1 kHz)
const CHUNK_SIZE: usize = 1024;

/// Longest gap between device buffers before the stream is considered dead
const STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// A captured phrase
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Utterance {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Encode as 16-bit mono WAV
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples, self.sample_rate)
    }
}

/// Why a listen cycle produced no utterance
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    /// Nobody spoke before the timeout
    #[error("no speech before timeout")]
    Timeout,

    /// The microphone could not be opened or stopped delivering audio
    #[error("microphone error: {0}")]
    Device(String),
}

/// Blocking source of utterances
pub trait UtteranceSource: Send + Sync {
    /// Run one calibrate-then-listen cycle
    ///
    /// # Errors
    ///
    /// Returns `ListenError::Timeout` when no phrase starts in time
    fn capture(&self, settings: &ListenSettings) -> std::result::Result<Utterance, ListenError>;
}

/// Utterance source backed by a cpal input device
///
/// The stream only lives for the duration of one `capture` call.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneSource {
    device: DeviceSelection,
}

impl MicrophoneSource {
    #[must_use]
    pub const fn new(device: DeviceSelection) -> Self {
        Self { device }
    }
}

impl UtteranceSource for MicrophoneSource {
    fn capture(&self, settings: &ListenSettings) -> std::result::Result<Utterance, ListenError> {
        let device_id = self.device.get();
        let device = input_device(device_id).map_err(|e| ListenError::Device(e.to_string()))?;
        let config = input_config(&device, None).map_err(|e| ListenError::Device(e.to_string()))?;
        let channels = usize::from(config.channels);
        let sample_rate = config.sample_rate.0;

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let mut assembler = BlockAssembler::new(CHUNK_SIZE);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    assembler.push_interleaved(data, channels, |chunk| {
                        let _ = tx.send(chunk.to_vec());
                    });
                },
                |err| {
                    tracing::error!(error = %err, "command microphone error");
                },
                None,
            )
            .map_err(|e| ListenError::Device(e.to_string()))?;
        stream.play().map_err(|e| ListenError::Device(e.to_string()))?;

        tracing::debug!(device = ?device_id, sample_rate, "listening for commands");

        let mut segmenter = UtteranceSegmenter::new(sample_rate, settings);

        let calibration_end = Instant::now() + settings.calibration;
        while let Some(remaining) = calibration_end.checked_duration_since(Instant::now()) {
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining.min(STALL_TIMEOUT)) {
                Ok(chunk) => segmenter.calibrate(&chunk),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(ListenError::Device("audio stream closed".to_string()));
                }
            }
        }
        segmenter.finish_calibration();

        loop {
            let chunk = rx.recv_timeout(STALL_TIMEOUT).map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => {
                    ListenError::Device("audio stream stalled".to_string())
                }
                mpsc::RecvTimeoutError::Disconnected => {
                    ListenError::Device("audio stream closed".to_string())
                }
            })?;

            match segmenter.process(&chunk) {
                SegmentEvent::Pending => {}
                SegmentEvent::TimedOut => return Err(ListenError::Timeout),
                SegmentEvent::Complete(samples) => {
                    return Ok(Utterance {
                        samples,
                        sample_rate,
                    });
                }
            }
        }
    }
}
