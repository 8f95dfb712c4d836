//! Lock-free handoff of pitch readings from the audio thread

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::pitch::PitchReading;

/// Latest analysis results, written by the capture callback
///
/// Volume and raw pitch share one 64-bit word so the microphone meter never
/// shows a volume from one block next to a pitch from another. The smoothed
/// pitch drives gameplay and is stored on its own; 0.0 encodes "undetected".
#[derive(Debug, Default)]
pub struct SignalMonitor {
    levels: AtomicU64,
    smoothed: AtomicU32,
}

/// Consistent copy of the monitor's values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalSnapshot {
    /// Volume on the 0-100 meter scale
    pub volume: f32,
    /// Unsmoothed pitch in Hz (0 when undetected)
    pub pitch: f32,
    /// Smoothed in-range pitch
    pub smoothed_pitch: Option<f32>,
}

impl SignalMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the published values with a new reading
    pub fn publish(&self, reading: &PitchReading) {
        let packed =
            (u64::from(reading.volume.to_bits()) << 32) | u64::from(reading.pitch.to_bits());
        self.levels.store(packed, Ordering::Release);
        self.smoothed
            .store(reading.smoothed.unwrap_or(0.0).to_bits(), Ordering::Release);
    }

    /// Read the latest values
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn snapshot(&self) -> SignalSnapshot {
        let packed = self.levels.load(Ordering::Acquire);
        let smoothed = f32::from_bits(self.smoothed.load(Ordering::Acquire));

        SignalSnapshot {
            volume: f32::from_bits((packed >> 32) as u32),
            pitch: f32::from_bits(packed as u32),
            smoothed_pitch: (smoothed > 0.0).then_some(smoothed),
        }
    }

    /// Forget any detected voice (e.g. when the stream is closed)
    pub fn reset(&self) {
        self.publish(&PitchReading::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent() {
        let snapshot = SignalMonitor::new().snapshot();
        assert_eq!(snapshot, SignalSnapshot::default());
    }

    #[test]
    fn publish_round_trips_all_fields() {
        let monitor = SignalMonitor::new();
        monitor.publish(&PitchReading {
            volume: 42.5,
            pitch: 181.25,
            smoothed: Some(175.0),
        });

        let snapshot = monitor.snapshot();
        assert!((snapshot.volume - 42.5).abs() < f32::EPSILON);
        assert!((snapshot.pitch - 181.25).abs() < f32::EPSILON);
        assert_eq!(snapshot.smoothed_pitch, Some(175.0));
    }

    #[test]
    fn reset_clears_detection() {
        let monitor = SignalMonitor::new();
        monitor.publish(&PitchReading {
            volume: 10.0,
            pitch: 200.0,
            smoothed: Some(200.0),
        });
        monitor.reset();
        assert_eq!(monitor.snapshot().smoothed_pitch, None);
    }
}
