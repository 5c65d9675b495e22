//! Facade behavior without media
//!
//! Everything here runs against sources that fail to open, which
//! exercises the state machine, observer plumbing, and recovery path
//! without needing media files or devices.

use parking_lot::Mutex;
use std::sync::Arc;
use zenplay_engine::ZenPlayer;
use zenplay_shared_types::{PlayerConfig, PlayerState};

#[test]
fn test_failed_open_reports_states_in_order() {
    let player = ZenPlayer::new(PlayerConfig::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let id = {
        let log = Arc::clone(&log);
        player.register_state_callback(move |old, new| {
            log.lock().push((old, new));
        })
    };

    assert!(player.open("/nonexistent/file.mp4", None).is_err());
    assert_eq!(
        *log.lock(),
        vec![
            (PlayerState::Idle, PlayerState::Opening),
            (PlayerState::Opening, PlayerState::Error),
        ]
    );

    player.unregister_state_callback(id);
    player.close().unwrap();
    assert_eq!(player.state(), PlayerState::Idle);
}

#[test]
fn test_close_then_reopen_attempt_is_accepted() {
    let player = ZenPlayer::new(PlayerConfig::default());

    assert!(player.open("/nonexistent/a.mp4", None).is_err());
    player.close().unwrap();

    // A second open proceeds from Idle again (and fails the same way).
    assert!(player.open("/nonexistent/a.mp4", None).is_err());
    assert_eq!(player.state(), PlayerState::Error);
}

#[test]
fn test_open_rejected_while_not_idle() {
    let player = ZenPlayer::new(PlayerConfig::default());
    assert!(player.open("/nonexistent/a.mp4", None).is_err());

    // State is Error; a second open without close is refused.
    let result = player.open("/nonexistent/b.mp4", None);
    assert!(result.is_err());
}

#[test]
fn test_config_snapshot_reaches_engine() {
    let snapshot = serde_json::json!({
        "render.use_hardware_acceleration": false,
        "player.sync.method": "external",
    });
    let config = PlayerConfig::from_snapshot(&snapshot);
    assert!(!config.render.use_hardware_acceleration);

    // The engine accepts any well-formed configuration.
    let player = ZenPlayer::new(config);
    assert_eq!(player.state(), PlayerState::Idle);
}
