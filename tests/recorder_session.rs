//! End-to-end sessions driven by a replayed device.

use std::cell::RefCell;
use std::rc::Rc;

use voice_recorder::audio::{wav, IssueKind, ReplayDevice};
use voice_recorder::config::RecorderConfig;
use voice_recorder::recorder::{Recorder, RecorderError, RecorderState};

fn ramp(len: usize, offset: f32) -> Vec<f32> {
    (0..len).map(|i| offset + i as f32 * 1e-4).collect()
}

#[test]
fn blocks_land_at_their_arrival_offsets() {
    let a = ramp(4_096, 0.1);
    let b = ramp(1_000, -0.2);
    let c = ramp(2_904, 0.3);

    let mut rec = Recorder::new(ReplayDevice::new(vec![a.clone()]));
    rec.start().expect("start");
    rec.poll_blocks();
    rec.device_mut().queue_block(b.clone());
    rec.device_mut().queue_block(c.clone());
    rec.poll_blocks();

    let take = rec.stop().expect("recording");
    let (la, lb) = (a.len(), b.len());
    assert_eq!(take.samples.len(), la + lb + c.len());
    assert_eq!(&take.samples[..la], a.as_slice());
    assert_eq!(&take.samples[la..la + lb], b.as_slice());
    assert_eq!(&take.samples[la + lb..], c.as_slice());
}

#[test]
fn artifact_is_consistent() {
    let blocks: Vec<Vec<f32>> = (0..10).map(|_| vec![0.25; 1_600]).collect();
    let mut rec = Recorder::new(ReplayDevice::new(blocks));
    rec.start().expect("start");

    let take = rec.stop().expect("recording");
    assert_eq!(take.duration, take.samples.len() as f64 / take.sample_rate as f64);
    assert_eq!(take.blob, wav::encode(&take.samples, take.sample_rate));
    assert_eq!(take.analysis.duration, take.duration);
    assert!(take.analysis.is_valid);
    assert!(take.analysis.issues.is_empty());
}

#[test]
fn silent_take_is_rejected_with_messages() {
    let mut rec = Recorder::new(ReplayDevice::new(vec![vec![0.0; 4_000]]));
    rec.start().expect("start");
    let take = rec.stop().expect("recording");

    assert!(!take.analysis.is_valid);
    let hard: Vec<_> = take.analysis.hard_issues().map(|i| i.kind).collect();
    assert_eq!(hard, vec![IssueKind::TooShort, IssueKind::TooSilent]);
    let soft: Vec<_> = take.analysis.soft_issues().map(|i| i.kind).collect();
    assert_eq!(soft, vec![IssueKind::TooQuiet]);
    assert!(take.analysis.issues.iter().all(|i| !i.message.is_empty()));
}

#[test]
fn can_record_again_after_stop() {
    let mut rec = Recorder::new(ReplayDevice::new(vec![vec![0.3; 8_000]]));
    rec.start().expect("first start");
    let first = rec.stop().expect("first take");
    assert_eq!(first.samples.len(), 8_000);

    rec.device_mut().queue_block(vec![-0.3; 16_000]);
    rec.start().expect("second start");
    assert_eq!(rec.state(), RecorderState::Recording);
    let second = rec.stop().expect("second take");

    // A new session never sees the previous one's chunks.
    assert_eq!(second.samples.len(), 16_000);
    assert!(second.samples.iter().all(|&s| s == -0.3));
    assert_eq!(rec.device().opens(), 2);
    assert_eq!(rec.device().closes(), 2);
}

#[test]
fn denied_then_granted() {
    let mut rec = Recorder::new(ReplayDevice::new(vec![vec![0.3; 8_000]]).denied());
    assert!(matches!(rec.start(), Err(RecorderError::DeviceUnavailable(_))));
    assert_eq!(rec.state(), RecorderState::Idle);
    assert!(rec.stop().is_none());

    rec.device_mut().set_denied(false);
    rec.start().expect("granted");
    assert!(rec.stop().expect("take").analysis.is_valid);
}

#[test]
fn configured_policy_is_applied() {
    let mut config = RecorderConfig::default();
    config.quality.min_duration_secs = 2.0;
    config.capture.target_sample_rate = 8_000;
    config.capture.snapshot_len = 16;

    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&frames);

    let device = ReplayDevice::new(vec![vec![0.3; 8_000]]).with_float_snapshot(vec![0.5; 64]);
    let mut rec = Recorder::with_config(device, &config);
    rec.set_waveform_callback(move |frame| sink.borrow_mut().push(frame.to_vec()));

    rec.start().expect("start");
    assert_eq!(rec.sample_rate(), Some(8_000));
    assert!(rec.sample_waveform());

    let take = rec.stop().expect("take");
    assert_eq!(take.duration, 1.0);
    assert!(take.analysis.has(IssueKind::TooShort));

    let frames = frames.borrow();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], vec![0.5; 16]);
}

#[test]
fn wav_from_session_reads_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("take.wav");

    let mut rec = Recorder::new(ReplayDevice::new(vec![vec![0.5; 800], vec![-0.5; 800]]).with_sample_rate(48_000));
    rec.start().expect("start");
    let take = rec.stop().expect("take");
    std::fs::write(&path, &take.blob).expect("write");

    let mut reader = hound::WavReader::open(&path).expect("open");
    assert_eq!(reader.spec().sample_rate, 48_000);
    assert_eq!(reader.len() as usize, 1_600);
    let first: i16 = reader.samples::<i16>().next().expect("one").expect("sample");
    assert_eq!(first, 16_383);
}
