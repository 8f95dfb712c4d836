//! Pitch estimation and smoothing
//!
//! Runs on the audio callback thread: each capture block is appended to an
//! [`AnalysisWindow`], the window is searched for its dominant spectral peak
//! and valid readings are averaged through a short [`PitchHistory`].

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Number of samples kept for analysis
pub const WINDOW_SIZE: usize = 2048;

/// Number of readings averaged into the smoothed pitch
pub const PITCH_HISTORY_LEN: usize = 5;

/// Lowest pitch (Hz) accepted as voice, exclusive
pub const MIN_PITCH: f32 = 80.0;

/// Highest pitch (Hz) accepted as voice, exclusive
pub const MAX_PITCH: f32 = 400.0;

/// Raw RMS below which a block counts as silence
pub const SILENCE_RMS: f32 = 0.01;

/// Frame length used for each spectral estimate
const FRAME_LEN: usize = 1024;

/// Distance between consecutive frames
const FRAME_HOP: usize = 256;

/// Zero-padded FFT length (finer bin spacing for low voices)
const FFT_LEN: usize = 4096;

/// Spectral search band (Hz)
const SEARCH_MIN_HZ: f32 = 50.0;
const SEARCH_MAX_HZ: f32 = 2000.0;

/// Frames whose peak falls below this fraction of the strongest are unvoiced
const PEAK_THRESHOLD: f32 = 0.1;

/// Root-mean-square of a block of samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Map a raw RMS to the 0-100 meter scale
#[must_use]
pub fn normalized_volume(rms: f32) -> f32 {
    (rms * 1000.0).min(100.0)
}

/// Circular buffer holding the most recent audio samples
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    samples: Vec<f32>,
    write_pos: usize,
    filled: usize,
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        Self::new(WINDOW_SIZE)
    }
}

impl AnalysisWindow {
    /// Create an empty window holding `capacity` samples
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_pos: 0,
            filled: 0,
        }
    }

    /// Append a block, overwriting the oldest samples
    pub fn push(&mut self, block: &[f32]) {
        let capacity = self.samples.len();
        for &sample in block {
            self.samples[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % capacity;
        }
        self.filled = (self.filled + block.len()).min(capacity);
    }

    /// Samples in chronological order (oldest first)
    ///
    /// Before the window fills up the result is zero-padded at the front.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        let mut ordered = Vec::with_capacity(self.samples.len());
        ordered.extend_from_slice(&self.samples[self.write_pos..]);
        ordered.extend_from_slice(&self.samples[..self.write_pos]);
        ordered
    }

    /// Number of real samples written so far (saturates at capacity)
    #[must_use]
    pub const fn filled(&self) -> usize {
        self.filled
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.write_pos = 0;
        self.filled = 0;
    }
}

/// Bounded FIFO of recent valid pitch readings
#[derive(Debug, Clone, Default)]
pub struct PitchHistory {
    readings: VecDeque<f32>,
}

impl PitchHistory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(PITCH_HISTORY_LEN),
        }
    }

    /// Push a reading, evicting the oldest once full
    pub fn push(&mut self, pitch: f32) {
        if self.readings.len() == PITCH_HISTORY_LEN {
            self.readings.pop_front();
        }
        self.readings.push_back(pitch);
    }

    /// Mean of the stored readings
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> Option<f32> {
        if self.readings.is_empty() {
            return None;
        }
        Some(self.readings.iter().sum::<f32>() / self.readings.len() as f32)
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings oldest first
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.readings.iter().copied()
    }
}

/// Whether a pitch lies inside the playable voice range
#[must_use]
pub fn in_voice_range(pitch: f32) -> bool {
    pitch > MIN_PITCH && pitch < MAX_PITCH
}

/// Maps a pitch to a vertical screen coordinate
///
/// The 0.8 exponent makes low and middle pitches climb away from the ground
/// faster than a linear mapping, leaving finer control near the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchMapping {
    /// Resting y coordinate (lowest pitch)
    pub ground_y: f32,
    /// Highest reachable y coordinate (highest pitch)
    pub top_margin: f32,
}

impl Default for PitchMapping {
    fn default() -> Self {
        Self {
            ground_y: 550.0,
            top_margin: 50.0,
        }
    }
}

impl PitchMapping {
    /// Target y for a pitch; smaller y is higher on screen
    #[must_use]
    pub fn target_y(&self, pitch: f32) -> f32 {
        let relative = ((pitch - MIN_PITCH) / (MAX_PITCH - MIN_PITCH)).clamp(0.0, 1.0);
        self.ground_y - relative.powf(0.8) * (self.ground_y - self.top_margin)
    }
}

/// Estimates the fundamental pitch of a window of samples
pub struct PitchExtractor {
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
}

impl std::fmt::Debug for PitchExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchExtractor")
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl PitchExtractor {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_LEN);

        let hann = (0..FRAME_LEN)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (FRAME_LEN - 1) as f32).cos())
            })
            .collect();

        Self {
            sample_rate,
            fft,
            hann,
        }
    }

    /// Median of the per-frame dominant frequencies, or 0 when nothing is voiced
    #[must_use]
    pub fn estimate(&self, samples: &[f32]) -> f32 {
        let mut peaks: Vec<(f32, f32)> = frame_starts(samples.len())
            .filter_map(|start| {
                let end = (start + FRAME_LEN).min(samples.len());
                self.frame_peak(&samples[start..end])
            })
            .collect();

        let strongest = peaks.iter().map(|&(_, mag)| mag).fold(0.0_f32, f32::max);
        if strongest <= f32::EPSILON {
            return 0.0;
        }
        peaks.retain(|&(_, mag)| mag >= strongest * PEAK_THRESHOLD);

        let mut candidates: Vec<f32> = peaks.into_iter().map(|(freq, _)| freq).collect();
        median(&mut candidates).unwrap_or(0.0)
    }

    /// Dominant frequency and its magnitude for one frame
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn frame_peak(&self, frame: &[f32]) -> Option<(f32, f32)> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.hann.iter())
            .map(|(&sample, &window)| Complex::new(sample * window, 0.0))
            .collect();
        buffer.resize(FFT_LEN, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let bin_hz = self.sample_rate as f32 / FFT_LEN as f32;
        let magnitudes: Vec<f32> = buffer[..FFT_LEN / 2].iter().map(|c| c.norm()).collect();

        let lo = ((SEARCH_MIN_HZ / bin_hz).floor() as usize).max(1);
        let hi = ((SEARCH_MAX_HZ / bin_hz).ceil() as usize).min(magnitudes.len() - 2);

        let (bin, &peak) = magnitudes[lo..=hi]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        let bin = bin + lo;

        if peak <= f32::EPSILON {
            return None;
        }

        // Parabolic interpolation around the peak bin
        let alpha = magnitudes[bin - 1];
        let gamma = magnitudes[bin + 1];
        let denom = alpha - 2.0 * peak + gamma;
        let offset = if denom.abs() > f32::EPSILON {
            (0.5 * (alpha - gamma) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        Some(((bin as f32 + offset) * bin_hz, peak))
    }
}

/// Start offsets of the analysis frames covering `len` samples
fn frame_starts(len: usize) -> impl Iterator<Item = usize> {
    let last = len.saturating_sub(FRAME_LEN);
    (0..=last).step_by(FRAME_HOP).take_while(move |_| len > 0)
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// One analysed capture block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchReading {
    /// Volume on the 0-100 meter scale
    pub volume: f32,
    /// Unsmoothed pitch estimate in Hz (0 when undetected)
    pub pitch: f32,
    /// Mean of the recent valid readings, `None` while no voice is detected
    pub smoothed: Option<f32>,
}

/// Per-block pipeline owned by the capture callback
#[derive(Debug)]
pub struct BlockAnalyzer {
    window: AnalysisWindow,
    extractor: PitchExtractor,
    history: PitchHistory,
}

impl BlockAnalyzer {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            window: AnalysisWindow::default(),
            extractor: PitchExtractor::new(sample_rate),
            history: PitchHistory::new(),
        }
    }

    /// Analyse one capture block
    pub fn process(&mut self, block: &[f32]) -> PitchReading {
        let level = rms(block);
        let volume = normalized_volume(level);

        if level < SILENCE_RMS {
            self.history.clear();
            return PitchReading {
                volume,
                pitch: 0.0,
                smoothed: None,
            };
        }

        self.window.push(block);
        let pitch = self.extractor.estimate(&self.window.to_vec());

        let smoothed = if in_voice_range(pitch) {
            self.history.push(pitch);
            self.history.mean()
        } else {
            self.history.clear();
            None
        };

        tracing::trace!(volume, pitch, ?smoothed, "pitch block");

        PitchReading {
            volume,
            pitch,
            smoothed,
        }
    }

    #[must_use]
    pub const fn history(&self) -> &PitchHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    #[allow(clippy::cast_precision_loss)]
    fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin()
            })
            .collect()
    }

    // -- AnalysisWindow -------------------------------------------------------

    #[test]
    fn window_keeps_most_recent_samples_in_order() {
        let mut window = AnalysisWindow::new(4);
        window.push(&[1.0, 2.0, 3.0]);
        window.push(&[4.0, 5.0]);
        assert_eq!(window.to_vec(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(window.filled(), 4);
    }

    #[test]
    fn window_pads_front_before_full() {
        let mut window = AnalysisWindow::new(4);
        window.push(&[7.0]);
        assert_eq!(window.to_vec(), vec![0.0, 0.0, 0.0, 7.0]);
        assert_eq!(window.filled(), 1);
    }

    // -- PitchHistory ---------------------------------------------------------

    #[test]
    fn history_evicts_oldest_after_five() {
        let mut history = PitchHistory::new();
        for p in [100.0, 110.0, 120.0, 130.0, 140.0, 150.0] {
            history.push(p);
        }
        assert_eq!(history.len(), PITCH_HISTORY_LEN);
        assert_eq!(history.iter().next(), Some(110.0));
        assert_eq!(history.mean(), Some(130.0));
    }

    #[test]
    fn empty_history_has_no_mean() {
        assert_eq!(PitchHistory::new().mean(), None);
    }

    // -- PitchExtractor -------------------------------------------------------

    #[test]
    fn detects_sine_frequency() {
        let extractor = PitchExtractor::new(RATE);
        for freq in [110.0, 220.0, 330.0] {
            let estimate = extractor.estimate(&sine(freq, WINDOW_SIZE, 0.5));
            assert!((estimate - freq).abs() < 5.0, "{freq} Hz -> {estimate}");
        }
    }

    #[test]
    fn silence_yields_zero() {
        let extractor = PitchExtractor::new(RATE);
        assert!(extractor.estimate(&vec![0.0; WINDOW_SIZE]).abs() < f32::EPSILON);
        assert!(extractor.estimate(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        let mut values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), Some(2.5));
    }

    // -- PitchMapping ---------------------------------------------------------

    #[test]
    fn mapping_spans_ground_to_top() {
        let mapping = PitchMapping::default();
        assert!((mapping.target_y(MIN_PITCH) - 550.0).abs() < 1e-3);
        assert!((mapping.target_y(MAX_PITCH) - 50.0).abs() < 1e-3);
        assert!((mapping.target_y(20.0) - 550.0).abs() < 1e-3);
    }

    // -- BlockAnalyzer --------------------------------------------------------

    #[test]
    fn quiet_block_clears_history() {
        let mut analyzer = BlockAnalyzer::new(RATE);
        let voiced = sine(200.0, 1024, 0.5);
        analyzer.process(&voiced);
        analyzer.process(&voiced);
        assert!(!analyzer.history().is_empty());

        let reading = analyzer.process(&vec![0.001; 1024]);
        assert!(reading.smoothed.is_none());
        assert!(analyzer.history().is_empty());
    }

    #[test]
    fn out_of_range_pitch_clears_history() {
        let mut analyzer = BlockAnalyzer::new(RATE);
        for _ in 0..3 {
            analyzer.process(&sine(200.0, 1024, 0.5));
        }
        assert!(!analyzer.history().is_empty());

        for _ in 0..3 {
            analyzer.process(&sine(900.0, 1024, 0.5));
        }
        let reading = analyzer.process(&sine(900.0, 1024, 0.5));
        assert!(reading.smoothed.is_none());
        assert!(analyzer.history().is_empty());
    }

    #[test]
    fn volume_is_capped_at_hundred() {
        assert!((normalized_volume(0.5) - 100.0).abs() < f32::EPSILON);
        assert!((normalized_volume(0.02) - 20.0).abs() < 1e-4);
    }
}
