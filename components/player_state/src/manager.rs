//! State manager implementation

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zenplay_shared_types::{PlayerError, PlayerResult, PlayerState};

/// Observer callback invoked with `(old, new)` on every transition
type StateCallback = Arc<dyn Fn(PlayerState, PlayerState) + Send + Sync>;

/// Handle returned by callback registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Owns the playback state and its transition rules
///
/// The state itself is a single atomic value, so predicates like
/// [`should_stop`](StateManager::should_stop) are safe to poll from any
/// worker without locking. Transitions use compare-and-set with retry,
/// which serializes concurrent transition attempts; observers are
/// notified synchronously on the transitioning thread.
///
/// # Examples
///
/// ```
/// use zenplay_player_state::StateManager;
/// use zenplay_shared_types::PlayerState;
///
/// let manager = StateManager::new();
/// manager.transition_to(PlayerState::Opening).unwrap();
/// manager.transition_to(PlayerState::Stopped).unwrap();
/// manager.transition_to(PlayerState::Playing).unwrap();
/// assert!(manager.is_playing());
/// ```
pub struct StateManager {
    state: AtomicU8,
    resume_lock: Mutex<()>,
    resume_cv: Condvar,
    observers: Mutex<Vec<(CallbackId, StateCallback)>>,
    next_callback_id: AtomicU64,
}

impl StateManager {
    /// Creates a manager in the Idle state
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PlayerState::Idle as u8),
            resume_lock: Mutex::new(()),
            resume_cv: Condvar::new(),
            observers: Mutex::new(Vec::new()),
            next_callback_id: AtomicU64::new(1),
        }
    }

    /// Returns the current state
    pub fn state(&self) -> PlayerState {
        // The atomic only ever holds values written from PlayerState.
        PlayerState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(PlayerState::Error)
    }

    /// True when the current state is Playing
    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    /// True when the current state is Paused
    pub fn is_paused(&self) -> bool {
        self.state() == PlayerState::Paused
    }

    /// True when every worker loop must exit
    pub fn should_stop(&self) -> bool {
        self.state().is_stop_state()
    }

    /// True when workers must hold without exiting
    pub fn should_pause(&self) -> bool {
        self.state().is_pause_state()
    }

    /// Attempts the transition to `target`, returning the previous state
    ///
    /// The current→target edge is validated against the transition table;
    /// on success every registered observer is invoked synchronously with
    /// `(old, new)` before this method returns.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidStateTransition`] when the edge is
    /// not in the table.
    pub fn transition_to(&self, target: PlayerState) -> PlayerResult<PlayerState> {
        let old = loop {
            let current = self.state();
            if !current.can_transition_to(target) {
                warn!(
                    from = current.as_str(),
                    to = target.as_str(),
                    "rejected state transition"
                );
                return Err(PlayerError::InvalidStateTransition {
                    from: current.as_str(),
                    to: target.as_str(),
                });
            }
            match self.state.compare_exchange(
                current as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break current,
                // Another thread transitioned first; re-validate from the
                // new current state.
                Err(_) => continue,
            }
        };

        debug!(from = old.as_str(), to = target.as_str(), "state transition");

        // Transitions out of the held states must wake parked workers
        // right away instead of on their wait timeout.
        if matches!(
            target,
            PlayerState::Playing | PlayerState::Stopped | PlayerState::Idle | PlayerState::Error
        ) {
            let _guard = self.resume_lock.lock();
            self.resume_cv.notify_all();
        }

        self.notify_observers(old, target);
        Ok(old)
    }

    /// Blocks until the state becomes Playing or a stop state holds
    ///
    /// Returns the state observed on wake-up. Wakes immediately on any
    /// qualifying transition; the timeout only bounds the wait when no
    /// transition occurs.
    pub fn wait_for_resume(&self, timeout: Duration) -> PlayerState {
        let deadline = Instant::now() + timeout;
        let mut guard = self.resume_lock.lock();
        loop {
            let state = self.state();
            if state == PlayerState::Playing || state.is_stop_state() {
                return state;
            }
            let now = Instant::now();
            if now >= deadline {
                return state;
            }
            self.resume_cv.wait_for(&mut guard, deadline - now);
        }
    }

    /// Registers a state-change observer
    ///
    /// The callback fires synchronously on the transitioning thread and
    /// must not block; GUI hosts re-post to their own event queue.
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(PlayerState, PlayerState) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a previously registered observer
    ///
    /// Safe to call from within a callback and from any thread; removal
    /// takes effect from the next transition onward.
    pub fn unregister_callback(&self, id: CallbackId) {
        self.observers.lock().retain(|(other, _)| *other != id);
    }

    fn notify_observers(&self, old: PlayerState, new: PlayerState) {
        // Snapshot under the lock, invoke outside it, so a callback can
        // unregister (itself or others) without deadlocking.
        let snapshot: Vec<StateCallback> = self
            .observers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(old, new);
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn manager_in(state: PlayerState) -> StateManager {
        let manager = StateManager::new();
        let path: &[PlayerState] = match state {
            PlayerState::Idle => &[],
            PlayerState::Opening => &[PlayerState::Opening],
            PlayerState::Stopped => &[PlayerState::Opening, PlayerState::Stopped],
            PlayerState::Playing => &[
                PlayerState::Opening,
                PlayerState::Stopped,
                PlayerState::Playing,
            ],
            PlayerState::Paused => &[
                PlayerState::Opening,
                PlayerState::Stopped,
                PlayerState::Playing,
                PlayerState::Paused,
            ],
            _ => panic!("unsupported setup state"),
        };
        for step in path {
            manager.transition_to(*step).unwrap();
        }
        manager
    }

    #[test]
    fn test_initial_state_is_idle() {
        assert_eq!(StateManager::new().state(), PlayerState::Idle);
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let manager = StateManager::new();
        let result = manager.transition_to(PlayerState::Playing);
        assert!(matches!(
            result,
            Err(PlayerError::InvalidStateTransition { from: "Idle", to: "Playing" })
        ));
        assert_eq!(manager.state(), PlayerState::Idle);
    }

    #[test]
    fn test_observer_sees_old_and_new() {
        let manager = StateManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            manager.register_callback(move |old, new| {
                seen.lock().push((old, new));
            });
        }

        manager.transition_to(PlayerState::Opening).unwrap();
        manager.transition_to(PlayerState::Stopped).unwrap();

        let events = seen.lock();
        assert_eq!(
            *events,
            vec![
                (PlayerState::Idle, PlayerState::Opening),
                (PlayerState::Opening, PlayerState::Stopped),
            ]
        );
    }

    #[test]
    fn test_unregister_stops_notifications() {
        let manager = StateManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = {
            let count = Arc::clone(&count);
            manager.register_callback(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        manager.transition_to(PlayerState::Opening).unwrap();
        manager.unregister_callback(id);
        manager.transition_to(PlayerState::Stopped).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_from_within_callback() {
        let manager = Arc::new(StateManager::new());
        let count = Arc::new(AtomicUsize::new(0));

        let id_slot: Arc<Mutex<Option<CallbackId>>> = Arc::new(Mutex::new(None));
        let id = {
            let manager = Arc::clone(&manager);
            let count = Arc::clone(&count);
            let id_slot = Arc::clone(&id_slot);
            manager.clone().register_callback(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *id_slot.lock() {
                    manager.unregister_callback(id);
                }
            })
        };
        *id_slot.lock() = Some(id);

        manager.transition_to(PlayerState::Opening).unwrap();
        manager.transition_to(PlayerState::Stopped).unwrap();

        // The callback removed itself during the first notification.
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_for_resume_wakes_on_play() {
        let manager = Arc::new(manager_in(PlayerState::Paused));

        let waiter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.wait_for_resume(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        manager.transition_to(PlayerState::Playing).unwrap();
        let state = waiter.join().unwrap();

        assert_eq!(state, PlayerState::Playing);
        // Must have woken on the broadcast, not on the 5 s timeout.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_for_resume_wakes_on_stop() {
        let manager = Arc::new(manager_in(PlayerState::Paused));

        let waiter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.wait_for_resume(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(50));
        manager.transition_to(PlayerState::Stopped).unwrap();
        assert_eq!(waiter.join().unwrap(), PlayerState::Stopped);
    }

    #[test]
    fn test_wait_for_resume_times_out_while_paused() {
        let manager = manager_in(PlayerState::Paused);
        let start = Instant::now();
        let state = manager.wait_for_resume(Duration::from_millis(50));
        assert_eq!(state, PlayerState::Paused);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_predicates() {
        let manager = manager_in(PlayerState::Playing);
        assert!(manager.is_playing());
        assert!(!manager.should_stop());
        assert!(!manager.should_pause());

        manager.transition_to(PlayerState::Seeking).unwrap();
        assert!(manager.should_pause());

        manager.transition_to(PlayerState::Stopped).unwrap();
        assert!(manager.should_stop());
    }
}
