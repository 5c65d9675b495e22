//! Integration tests for the state manager

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use zenplay_player_state::StateManager;
use zenplay_shared_types::{PlayerError, PlayerState};

fn open_and_play(manager: &StateManager) {
    manager.transition_to(PlayerState::Opening).unwrap();
    manager.transition_to(PlayerState::Stopped).unwrap();
    manager.transition_to(PlayerState::Playing).unwrap();
}

#[test]
fn test_full_playback_lifecycle() {
    let manager = StateManager::new();
    open_and_play(&manager);

    manager.transition_to(PlayerState::Paused).unwrap();
    manager.transition_to(PlayerState::Seeking).unwrap();
    manager.transition_to(PlayerState::Paused).unwrap();
    manager.transition_to(PlayerState::Playing).unwrap();
    manager.transition_to(PlayerState::Stopped).unwrap();
    manager.transition_to(PlayerState::Idle).unwrap();
}

#[test]
fn test_every_transition_is_validated() {
    let manager = StateManager::new();
    // Idle permits only Opening.
    for target in [
        PlayerState::Stopped,
        PlayerState::Playing,
        PlayerState::Paused,
        PlayerState::Seeking,
        PlayerState::Buffering,
        PlayerState::Error,
    ] {
        assert!(matches!(
            manager.transition_to(target),
            Err(PlayerError::InvalidStateTransition { .. })
        ));
    }
    assert_eq!(manager.state(), PlayerState::Idle);
}

#[test]
fn test_concurrent_transitions_serialize() {
    let manager = Arc::new(StateManager::new());
    open_and_play(&manager);

    // Many threads race Playing -> Paused; exactly one wins.
    let successes = Arc::new(AtomicUsize::new(0));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                if manager.transition_to(PlayerState::Paused).is_ok() {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), PlayerState::Paused);
}

#[test]
fn test_workers_unblock_promptly_on_resume() {
    let manager = Arc::new(StateManager::new());
    open_and_play(&manager);
    manager.transition_to(PlayerState::Paused).unwrap();

    let mut waiters = Vec::new();
    for _ in 0..4 {
        let manager = Arc::clone(&manager);
        waiters.push(thread::spawn(move || {
            let start = Instant::now();
            let state = manager.wait_for_resume(Duration::from_secs(5));
            (state, start.elapsed())
        }));
    }

    thread::sleep(Duration::from_millis(50));
    manager.transition_to(PlayerState::Playing).unwrap();

    for waiter in waiters {
        let (state, waited) = waiter.join().unwrap();
        assert_eq!(state, PlayerState::Playing);
        // Woken by the broadcast, not the 5 s timeout.
        assert!(waited < Duration::from_secs(1));
    }
}

#[test]
fn test_observer_sequence_is_ordered() {
    let manager = StateManager::new();
    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let log = Arc::clone(&log);
        manager.register_callback(move |old, new| {
            log.lock().push(format!("{old}->{new}"));
        });
    }

    open_and_play(&manager);
    manager.transition_to(PlayerState::Stopped).unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "Idle->Opening".to_string(),
            "Opening->Stopped".to_string(),
            "Stopped->Playing".to_string(),
            "Playing->Stopped".to_string(),
        ]
    );
}
