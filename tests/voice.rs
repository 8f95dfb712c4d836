//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::time::Duration;

use voice_arcade::VoiceCommand;
use voice_arcade::voice::pitch::BlockAnalyzer;
use voice_arcade::voice::{
    BLOCK_SIZE, ListenSettings, MIN_ENERGY_THRESHOLD, SAMPLE_RATE, SegmentEvent, SegmenterState,
    SignalMonitor, Utterance, UtteranceSegmenter, samples_to_wav,
};

mod common;

use common::{silence, sine};

const RATE: u32 = 16_000;
const CHUNK: usize = 1024;

fn calibrated(ambient: &[f32]) -> UtteranceSegmenter {
    let mut segmenter = UtteranceSegmenter::new(RATE, &ListenSettings::default());
    for chunk in ambient.chunks(CHUNK) {
        segmenter.calibrate(chunk);
    }
    segmenter.finish_calibration();
    segmenter
}

/// Feed samples until something other than `Pending` happens
fn feed(segmenter: &mut UtteranceSegmenter, samples: &[f32]) -> SegmentEvent {
    for chunk in samples.chunks(CHUNK) {
        let event = segmenter.process(chunk);
        if event != SegmentEvent::Pending {
            return event;
        }
    }
    SegmentEvent::Pending
}

// -- segmentation ---

#[test]
fn test_quiet_room_uses_threshold_floor() {
    let segmenter = calibrated(&silence(1.0, RATE));
    assert!((segmenter.threshold() - MIN_ENERGY_THRESHOLD).abs() < f32::EPSILON);
    assert_eq!(segmenter.state(), SegmenterState::WaitingForSpeech);
}

#[test]
fn test_noisy_room_raises_threshold() {
    let segmenter = calibrated(&sine(50.0, 1.0, 0.1, RATE));
    // rms of a 0.1 sine is ~0.0707
    assert!((segmenter.threshold() - 0.0707 * 1.5).abs() < 0.005);
}

#[test]
fn test_phrase_ends_after_pause() {
    let mut segmenter = calibrated(&silence(1.0, RATE));
    let mut audio = silence(0.3, RATE);
    audio.extend(sine(220.0, 0.6, 0.3, RATE));
    audio.extend(silence(1.0, RATE));

    let SegmentEvent::Complete(phrase) = feed(&mut segmenter, &audio) else {
        panic!("expected a phrase");
    };
    let seconds = phrase.len() as f32 / RATE as f32;
    assert!((1.0..1.3).contains(&seconds), "phrase lasted {seconds}s");
}

#[test]
fn test_phrase_is_cut_at_limit() {
    let mut segmenter = calibrated(&silence(1.0, RATE));
    let audio = sine(220.0, 4.0, 0.3, RATE);

    let SegmentEvent::Complete(phrase) = feed(&mut segmenter, &audio) else {
        panic!("expected a phrase");
    };
    assert!(phrase.len() >= 2 * RATE as usize);
    assert!(phrase.len() < 2 * RATE as usize + CHUNK);
}

#[test]
fn test_silence_times_out() {
    let mut segmenter = calibrated(&silence(1.0, RATE));
    assert_eq!(
        feed(&mut segmenter, &silence(3.0, RATE)),
        SegmentEvent::TimedOut
    );
}

#[test]
fn test_short_blip_is_discarded() {
    let mut segmenter = calibrated(&silence(1.0, RATE));
    let mut audio = sine(220.0, 0.1, 0.3, RATE);
    audio.extend(silence(4.0, RATE));

    assert_eq!(feed(&mut segmenter, &audio), SegmentEvent::TimedOut);
}

// -- command vocabulary ---

#[test]
fn test_every_vocabulary_word_resolves_to_its_command() {
    for command in VoiceCommand::ALL {
        for word in command.vocabulary() {
            assert_eq!(
                VoiceCommand::from_transcript(&format!("  {} ", word.to_uppercase())),
                Some(command),
                "{word}"
            );
        }
    }
}

#[test]
fn test_command_labels() {
    assert_eq!(VoiceCommand::Run.to_string(), "run");
    assert_eq!(VoiceCommand::Jump.to_string(), "jump");
    assert_eq!(VoiceCommand::Duck.to_string(), "duck");
}

// -- audio encoding ---

#[test]
fn test_utterance_encodes_to_wav() {
    let utterance = Utterance {
        samples: sine(440.0, 0.5, 0.5, RATE),
        sample_rate: RATE,
    };
    assert_eq!(utterance.duration(), Duration::from_millis(500));

    let wav = utterance.to_wav().unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, utterance.samples.len());
}

#[test]
fn test_wav_clamps_out_of_range_samples() {
    let wav = tokio_test::assert_ok!(samples_to_wav(&[2.0, -2.0], RATE));
    let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples, vec![i16::MAX, i16::MIN]);
}

// -- pitch pipeline ---

#[test]
fn test_sung_note_reaches_the_monitor() {
    let monitor = SignalMonitor::new();
    let mut analyzer = BlockAnalyzer::new(SAMPLE_RATE);

    for block in sine(220.0, 0.5, 0.3, SAMPLE_RATE).chunks_exact(BLOCK_SIZE) {
        monitor.publish(&analyzer.process(block));
    }

    let snapshot = monitor.snapshot();
    let pitch = snapshot.smoothed_pitch.expect("pitch detected");
    assert!((pitch - 220.0).abs() < 5.0, "detected {pitch} Hz");
    assert!(snapshot.volume > 50.0);
}

#[test]
fn test_silence_clears_the_monitor() {
    let monitor = SignalMonitor::new();
    let mut analyzer = BlockAnalyzer::new(SAMPLE_RATE);

    for block in sine(220.0, 0.3, 0.3, SAMPLE_RATE).chunks_exact(BLOCK_SIZE) {
        monitor.publish(&analyzer.process(block));
    }
    monitor.publish(&analyzer.process(&vec![0.0; BLOCK_SIZE]));

    assert_eq!(monitor.snapshot().smoothed_pitch, None);
    assert!(analyzer.history().is_empty());
}
