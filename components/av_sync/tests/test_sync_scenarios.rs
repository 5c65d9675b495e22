//! Clock behavior scenarios

use std::time::{Duration, Instant};
use zenplay_av_sync::{FrameAction, MasterClock, SyncController, SyncThresholds};

fn audio_master() -> SyncController {
    SyncController::new(MasterClock::Audio, SyncThresholds::default())
}

#[test]
fn test_pause_resume_round_trip_preserves_position() {
    let sync = audio_master();
    let start = Instant::now();
    sync.update_audio_clock(0.0, start);

    // Pause at 1 s of media time, wait 2 s of wall time, resume.
    let pause_at = start + Duration::from_millis(1000);
    sync.pause(pause_at);
    let before = sync.master_clock_ms(pause_at + Duration::from_millis(700));

    let resume_at = pause_at + Duration::from_secs(2);
    sync.resume(resume_at);
    let after = sync.master_clock_ms(resume_at);

    assert!((before - after).abs() < 2.0, "pause/resume moved the clock");

    // One more second of playback advances exactly one second.
    let later = resume_at + Duration::from_millis(1000);
    let advanced = sync.master_clock_ms(later);
    assert!((advanced - after - 1000.0).abs() < 50.0);
}

#[test]
fn test_paused_clock_is_stable_across_queries() {
    let sync = audio_master();
    let start = Instant::now();
    sync.update_audio_clock(500.0, start);
    sync.update_audio_clock(600.0, start + Duration::from_millis(100));

    let pause_at = start + Duration::from_millis(250);
    sync.pause(pause_at);

    let mut samples = Vec::new();
    for offset_ms in [0u64, 100, 1000, 30_000] {
        samples.push(sync.master_clock_ms(pause_at + Duration::from_millis(offset_ms)));
    }
    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min < 2.0, "paused clock drifted: {samples:?}");
}

#[test]
fn test_seek_lands_on_target_not_zero() {
    let sync = audio_master();
    let start = Instant::now();
    // File starts at 1.4 s of stream time.
    sync.update_audio_clock(1400.0, start);

    let seek_at = start + Duration::from_millis(300);
    sync.reset_for_seek(30_000, seek_at);

    let reported = sync.master_clock_ms(seek_at) + sync.master_base_ms();
    assert!(
        (reported - 30_000.0).abs() < 50.0,
        "post-seek position was {reported}"
    );
}

#[test]
fn test_consecutive_seeks_keep_absolute_positions() {
    let sync = audio_master();
    let start = Instant::now();
    sync.update_audio_clock(0.0, start);

    sync.reset_for_seek(10_000, start + Duration::from_millis(100));
    sync.reset_for_seek(50_000, start + Duration::from_millis(200));

    let reported = sync.master_clock_ms(start + Duration::from_millis(200));
    assert!((reported - 50_000.0).abs() < 50.0);
}

#[test]
fn test_video_only_external_clock_advances_at_real_time() {
    let sync = SyncController::new(MasterClock::External, SyncThresholds::default());
    let start = Instant::now();
    sync.mark_play_start(start);

    for ms in [100u64, 500, 1000] {
        let reading = sync.master_clock_ms(start + Duration::from_millis(ms));
        assert!((reading - ms as f64).abs() < 2.0);
    }
}

#[test]
fn test_scheduling_policy_with_custom_thresholds() {
    let sync = SyncController::new(
        MasterClock::Audio,
        SyncThresholds {
            repeat_ms: 20,
            drop_ms: 250,
        },
    );

    assert_eq!(sync.schedule(-200.0), FrameAction::Display);
    assert_eq!(sync.schedule(-300.0), FrameAction::Drop);
    match sync.schedule(40.0) {
        FrameAction::Wait(delay) => {
            assert!((delay.as_millis() as i64 - 40).abs() <= 1);
        }
        other => panic!("expected Wait, got {other:?}"),
    }
}

#[test]
fn test_drift_absorbs_small_timing_error() {
    let sync = audio_master();
    let start = Instant::now();
    sync.update_audio_clock(0.0, start);

    // The source runs 1% fast relative to the wall clock; each update
    // lands 10 ms ahead of the extrapolation. The drift term keeps the
    // published clock within a small bound of the reports.
    for i in 1..=10u64 {
        let at = start + Duration::from_millis(i * 1000);
        sync.update_audio_clock(i as f64 * 1010.0, at);
        let reading = sync.master_clock_ms(at);
        let reported = i as f64 * 1010.0;
        assert!(
            (reading - reported).abs() < 25.0,
            "reading {reading} too far from report {reported}"
        );
    }
}
