//! Audio capture from microphone

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};

use super::pitch::BlockAnalyzer;
use super::signal::SignalMonitor;
use crate::{Error, Result};

/// Sample rate for pitch capture
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per analysis block
pub const BLOCK_SIZE: usize = 1024;

/// An input-capable audio device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the host's input device enumeration
    pub id: usize,
    pub name: String,
    /// Maximum input channel count
    pub channels: u16,
    /// Native (default) sample rate
    pub sample_rate: u32,
}

/// List the input devices of the default host
///
/// # Errors
///
/// Returns error if the host cannot enumerate devices
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?;

    let infos = devices
        .enumerate()
        .filter_map(|(id, device)| {
            let config = device.default_input_config().ok()?;
            let channels = device
                .supported_input_configs()
                .ok()
                .and_then(|configs| configs.map(|c| c.channels()).max())
                .unwrap_or_else(|| config.channels());
            Some(DeviceInfo {
                id,
                name: device.name().unwrap_or_else(|_| format!("device {id}")),
                channels,
                sample_rate: config.sample_rate().0,
            })
        })
        .collect();

    Ok(infos)
}

/// Resolve a device index (or the default device) on the default host
///
/// # Errors
///
/// Returns `Error::UnknownDevice` if the index is not enumerated
pub(crate) fn input_device(id: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();
    match id {
        Some(id) => host
            .input_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .nth(id)
            .ok_or(Error::UnknownDevice(id)),
        None => host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string())),
    }
}

/// Pick an f32 input config, preferring `rate` and the fewest channels
///
/// # Errors
///
/// Returns error if the device offers no f32 input config
pub(crate) fn input_config(device: &Device, rate: Option<u32>) -> Result<StreamConfig> {
    let configs: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if let Some(rate) = rate {
        if let Some(supported) = configs
            .iter()
            .filter(|c| c.min_sample_rate() <= SampleRate(rate) && c.max_sample_rate() >= SampleRate(rate))
            .min_by_key(|c| c.channels())
        {
            return Ok(supported.clone().with_sample_rate(SampleRate(rate)).config());
        }
    }

    let default = device
        .default_input_config()
        .map_err(|e| Error::Audio(e.to_string()))?;
    if default.sample_format() == SampleFormat::F32 {
        return Ok(default.config());
    }

    configs
        .into_iter()
        .min_by_key(|c| c.channels())
        .map(cpal::SupportedStreamConfigRange::with_max_sample_rate)
        .map(|c| c.config())
        .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))
}

/// Input device choice shared between the pitch capture and the command microphone
#[derive(Debug, Clone)]
pub struct DeviceSelection(Arc<AtomicUsize>);

impl Default for DeviceSelection {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DeviceSelection {
    const DEFAULT_DEVICE: usize = usize::MAX;

    #[must_use]
    pub fn new(id: Option<usize>) -> Self {
        Self(Arc::new(AtomicUsize::new(id.unwrap_or(Self::DEFAULT_DEVICE))))
    }

    /// Selected index, `None` for the host default
    #[must_use]
    pub fn get(&self) -> Option<usize> {
        let id = self.0.load(Ordering::Acquire);
        (id != Self::DEFAULT_DEVICE).then_some(id)
    }

    pub fn set(&self, id: Option<usize>) {
        self.0
            .store(id.unwrap_or(Self::DEFAULT_DEVICE), Ordering::Release);
    }
}

/// Collects interleaved device buffers into fixed-size mono blocks
#[derive(Debug)]
pub struct BlockAssembler {
    block_size: usize,
    pending: Vec<f32>,
}

impl BlockAssembler {
    #[must_use]
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            pending: Vec::with_capacity(block_size),
        }
    }

    /// Down-mix interleaved frames and emit each completed block
    #[allow(clippy::cast_precision_loss)]
    pub fn push_interleaved(&mut self, data: &[f32], channels: usize, mut emit: impl FnMut(&[f32])) {
        let channels = channels.max(1);
        for frame in data.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            self.pending.push(mono);
            if self.pending.len() == self.block_size {
                emit(&self.pending);
                self.pending.clear();
            }
        }
    }
}

/// Owns the microphone stream feeding the pitch pipeline
pub struct AudioCaptureService {
    device: DeviceSelection,
    monitor: Arc<SignalMonitor>,
    stream: Option<Stream>,
}

impl Default for AudioCaptureService {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCaptureService {
    /// Create a capture service bound to the default input device
    #[must_use]
    pub fn new() -> Self {
        Self {
            device: DeviceSelection::default(),
            monitor: Arc::new(SignalMonitor::new()),
            stream: None,
        }
    }

    /// Create a capture service sharing a device selection
    #[must_use]
    pub fn with_selection(device: DeviceSelection) -> Self {
        Self {
            device,
            ..Self::new()
        }
    }

    /// Select the device used by the next `start`
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if the index is not an input device;
    /// the previous selection stays in effect
    pub fn select_device(&mut self, id: usize) -> Result<()> {
        let devices = list_devices()?;
        self.select_from(id, &devices)
    }

    /// Select a device from an already enumerated list
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if `id` is not in `devices`
    pub fn select_from(&mut self, id: usize, devices: &[DeviceInfo]) -> Result<()> {
        let Some(device) = devices.iter().find(|d| d.id == id) else {
            tracing::warn!(id, "unknown audio device, keeping current selection");
            return Err(Error::UnknownDevice(id));
        };

        tracing::info!(id, name = %device.name, "audio device selected");
        self.device.set(Some(id));
        Ok(())
    }

    /// Currently selected device index (`None` = host default)
    #[must_use]
    pub fn selected_device(&self) -> Option<usize> {
        self.device.get()
    }

    /// Handle to the selection, for sharing with the command microphone
    #[must_use]
    pub fn selection(&self) -> DeviceSelection {
        self.device.clone()
    }

    /// Start capturing, replacing any running stream
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        let device = input_device(self.device.get())?;
        let config = input_config(&device, Some(SAMPLE_RATE))?;
        let channels = usize::from(config.channels);

        let monitor = Arc::clone(&self.monitor);
        let mut assembler = BlockAssembler::new(BLOCK_SIZE);
        let mut analyzer = BlockAnalyzer::new(config.sample_rate.0);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    assembler.push_interleaved(data, channels, |block| {
                        let reading = analyzer.process(block);
                        monitor.publish(&reading);
                    });
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels,
            "audio capture started"
        );
        Ok(())
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.monitor.reset();
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Shared view of the latest analysis results
    #[must_use]
    pub fn monitor(&self) -> Arc<SignalMonitor> {
        Arc::clone(&self.monitor)
    }
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo {
                id: 0,
                name: "Built-in".to_string(),
                channels: 2,
                sample_rate: 48_000,
            },
            DeviceInfo {
                id: 3,
                name: "USB Mic".to_string(),
                channels: 1,
                sample_rate: 44_100,
            },
        ]
    }

    #[test]
    fn selecting_known_device_updates_selection() {
        let mut capture = AudioCaptureService::new();
        capture.select_from(3, &devices()).unwrap();
        assert_eq!(capture.selected_device(), Some(3));
    }

    #[test]
    fn unknown_device_keeps_previous_selection() {
        let mut capture = AudioCaptureService::new();
        capture.select_from(0, &devices()).unwrap();

        let err = capture.select_from(7, &devices()).unwrap_err();
        assert!(matches!(err, Error::UnknownDevice(7)));
        assert_eq!(capture.selected_device(), Some(0));
    }

    #[test]
    fn selection_is_shared() {
        let capture = AudioCaptureService::new();
        let shared = capture.selection();
        shared.set(Some(2));
        assert_eq!(capture.selected_device(), Some(2));
        shared.set(None);
        assert_eq!(capture.selected_device(), None);
    }

    #[test]
    fn assembler_downmixes_and_reblocks() {
        let mut assembler = BlockAssembler::new(2);
        let mut blocks = Vec::new();

        // Three stereo frames -> one full block, one pending sample
        assembler.push_interleaved(&[1.0, 0.0, 0.5, 0.5, 0.2, 0.2], 2, |b| {
            blocks.push(b.to_vec());
        });
        assert_eq!(blocks, vec![vec![0.5, 0.5]]);

        assembler.push_interleaved(&[0.0, 1.0], 2, |b| blocks.push(b.to_vec()));
        assert_eq!(blocks.len(), 2);
        assert!((blocks[1][0] - 0.2).abs() < 1e-6);
        assert!((blocks[1][1] - 0.5).abs() < 1e-6);
    }
}
