//! Energy-based utterance segmentation
//!
//! Splits a live sample stream into short spoken phrases: calibrate against
//! ambient noise, wait for the energy to rise above the threshold, then record
//! until a pause or the phrase limit.

use std::time::Duration;

use super::pitch::rms;

/// Multiplier applied to the ambient level to get the speech threshold
const DYNAMIC_RATIO: f32 = 1.5;

/// Floor for the speech threshold (≈300 on a 16-bit scale)
pub const MIN_ENERGY_THRESHOLD: f32 = 0.009;

/// Timing parameters for one listen cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSettings {
    /// Ambient-noise calibration window
    pub calibration: Duration,
    /// How long to wait for speech to start
    pub timeout: Duration,
    /// Maximum phrase length
    pub phrase_limit: Duration,
    /// Silence that ends a phrase
    pub pause: Duration,
    /// Voiced audio required for a phrase to count
    pub min_phrase: Duration,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            timeout: Duration::from_secs(2),
            phrase_limit: Duration::from_secs(2),
            pause: Duration::from_millis(500),
            min_phrase: Duration::from_millis(300),
        }
    }
}

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Measuring ambient noise
    Calibrating,
    /// Waiting for energy above threshold
    WaitingForSpeech,
    /// Accumulating a phrase
    Recording,
}

/// Result of feeding one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Nothing decided yet
    Pending,
    /// A phrase finished
    Complete(Vec<f32>),
    /// No speech started before the timeout
    TimedOut,
}

/// Segments utterances from a stream of sample chunks
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    threshold: f32,
    ambient_sum_squares: f64,
    ambient_samples: usize,
    waited: usize,
    phrase: Vec<f32>,
    voiced: usize,
    silence: usize,
    timeout_samples: usize,
    phrase_limit_samples: usize,
    pause_samples: usize,
    min_phrase_samples: usize,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

impl UtteranceSegmenter {
    #[must_use]
    pub fn new(sample_rate: u32, settings: &ListenSettings) -> Self {
        Self {
            state: SegmenterState::Calibrating,
            threshold: MIN_ENERGY_THRESHOLD,
            ambient_sum_squares: 0.0,
            ambient_samples: 0,
            waited: 0,
            phrase: Vec::new(),
            voiced: 0,
            silence: 0,
            timeout_samples: to_samples(settings.timeout, sample_rate),
            phrase_limit_samples: to_samples(settings.phrase_limit, sample_rate),
            pause_samples: to_samples(settings.pause, sample_rate),
            min_phrase_samples: to_samples(settings.min_phrase, sample_rate),
        }
    }

    /// Accumulate ambient noise
    pub fn calibrate(&mut self, chunk: &[f32]) {
        self.ambient_sum_squares += chunk.iter().map(|&s| f64::from(s * s)).sum::<f64>();
        self.ambient_samples += chunk.len();
    }

    /// Fix the speech threshold from the ambient level and start waiting
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn finish_calibration(&mut self) -> f32 {
        let ambient = if self.ambient_samples == 0 {
            0.0
        } else {
            (self.ambient_sum_squares / self.ambient_samples as f64).sqrt() as f32
        };
        self.threshold = (ambient * DYNAMIC_RATIO).max(MIN_ENERGY_THRESHOLD);
        self.state = SegmenterState::WaitingForSpeech;

        tracing::debug!(ambient, threshold = self.threshold, "ambient noise calibrated");
        self.threshold
    }

    /// Feed one chunk of samples
    pub fn process(&mut self, chunk: &[f32]) -> SegmentEvent {
        let is_speech = rms(chunk) > self.threshold;

        match self.state {
            SegmenterState::Calibrating => {
                self.calibrate(chunk);
                SegmentEvent::Pending
            }
            SegmenterState::WaitingForSpeech => {
                if is_speech {
                    self.state = SegmenterState::Recording;
                    self.phrase.clear();
                    self.phrase.extend_from_slice(chunk);
                    self.voiced = chunk.len();
                    self.silence = 0;
                    tracing::trace!("speech onset");
                    return SegmentEvent::Pending;
                }

                self.waited += chunk.len();
                if self.waited >= self.timeout_samples {
                    SegmentEvent::TimedOut
                } else {
                    SegmentEvent::Pending
                }
            }
            SegmenterState::Recording => {
                self.phrase.extend_from_slice(chunk);
                if is_speech {
                    self.voiced += chunk.len();
                    self.silence = 0;
                } else {
                    self.silence += chunk.len();
                }

                let paused = self.silence >= self.pause_samples;
                let at_limit = self.phrase.len() >= self.phrase_limit_samples;
                if !paused && !at_limit {
                    return SegmentEvent::Pending;
                }

                if self.voiced < self.min_phrase_samples {
                    // Too short to be a word; keep waiting within the same timeout
                    tracing::trace!(voiced = self.voiced, "discarding short phrase");
                    self.waited += self.phrase.len();
                    self.phrase.clear();
                    self.state = SegmenterState::WaitingForSpeech;
                    return if self.waited >= self.timeout_samples {
                        SegmentEvent::TimedOut
                    } else {
                        SegmentEvent::Pending
                    };
                }

                self.state = SegmenterState::WaitingForSpeech;
                self.waited = 0;
                tracing::debug!(samples = self.phrase.len(), "phrase complete");
                SegmentEvent::Complete(std::mem::take(&mut self.phrase))
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}
