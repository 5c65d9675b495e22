//! Playback state machine definitions
//!
//! The state enum and the transition table live here so the rules can be
//! validated without pulling in the state manager itself.

/// Playback state of the engine
///
/// Stored as a single atomic value by the state manager. The `Buffering`
/// state is reachable through the transition table but no pipeline
/// component currently enters it.
///
/// # State Transitions
///
/// Valid transitions:
/// - Idle → Opening
/// - Opening → Stopped | Error
/// - Stopped → Playing | Seeking | Idle
/// - Playing → Paused | Stopped | Seeking | Buffering | Error
/// - Paused → Playing | Stopped | Seeking
/// - Seeking → Playing | Paused | Stopped
/// - Buffering → Playing | Error
/// - Error → Idle
///
/// # Examples
///
/// ```
/// use zenplay_shared_types::PlayerState;
///
/// let state = PlayerState::Stopped;
/// assert!(state.can_transition_to(PlayerState::Playing));
/// assert!(!state.can_transition_to(PlayerState::Paused));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PlayerState {
    /// No media loaded
    #[default]
    Idle = 0,
    /// A source is being opened
    Opening = 1,
    /// Media opened, playback not started
    Stopped = 2,
    /// Actively playing
    Playing = 3,
    /// Paused by the user
    Paused = 4,
    /// An asynchronous seek is in flight
    Seeking = 5,
    /// Waiting for data (reserved; never entered by the core)
    Buffering = 6,
    /// An unrecoverable failure occurred
    Error = 7,
}

impl PlayerState {
    /// Reconstructs a state from its `u8` representation
    ///
    /// Returns `None` for values outside the enum range.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PlayerState::Idle),
            1 => Some(PlayerState::Opening),
            2 => Some(PlayerState::Stopped),
            3 => Some(PlayerState::Playing),
            4 => Some(PlayerState::Paused),
            5 => Some(PlayerState::Seeking),
            6 => Some(PlayerState::Buffering),
            7 => Some(PlayerState::Error),
            _ => None,
        }
    }

    /// Checks whether the transition `self → target` is permitted
    ///
    /// Unlisted edges are forbidden; there is no wildcard edge.
    pub fn can_transition_to(self, target: PlayerState) -> bool {
        use PlayerState::*;

        matches!(
            (self, target),
            (Idle, Opening)
                | (Opening, Stopped)
                | (Opening, Error)
                | (Stopped, Playing)
                | (Stopped, Seeking)
                | (Stopped, Idle)
                | (Playing, Paused)
                | (Playing, Stopped)
                | (Playing, Seeking)
                | (Playing, Buffering)
                | (Playing, Error)
                | (Paused, Playing)
                | (Paused, Stopped)
                | (Paused, Seeking)
                | (Seeking, Playing)
                | (Seeking, Paused)
                | (Seeking, Stopped)
                | (Buffering, Playing)
                | (Buffering, Error)
                | (Error, Idle)
        )
    }

    /// True for the states that terminate every worker loop
    ///
    /// Workers exit when the state is Idle, Stopped, or Error.
    pub fn is_stop_state(self) -> bool {
        matches!(
            self,
            PlayerState::Idle | PlayerState::Stopped | PlayerState::Error
        )
    }

    /// True for the states during which workers hold instead of exiting
    ///
    /// Paused, Seeking, and Buffering suspend the pipeline without
    /// tearing it down.
    pub fn is_pause_state(self) -> bool {
        matches!(
            self,
            PlayerState::Paused | PlayerState::Seeking | PlayerState::Buffering
        )
    }

    /// Returns the state name as a string
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Opening => "Opening",
            PlayerState::Stopped => "Stopped",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Seeking => "Seeking",
            PlayerState::Buffering => "Buffering",
            PlayerState::Error => "Error",
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(PlayerState::default(), PlayerState::Idle);
    }

    #[test]
    fn test_round_trip_u8() {
        for value in 0..8u8 {
            let state = PlayerState::from_u8(value).unwrap();
            assert_eq!(state as u8, value);
        }
        assert!(PlayerState::from_u8(8).is_none());
    }

    #[test]
    fn test_allowed_edges() {
        use PlayerState::*;

        assert!(Idle.can_transition_to(Opening));
        assert!(Opening.can_transition_to(Stopped));
        assert!(Opening.can_transition_to(Error));
        assert!(Stopped.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Seeking));
        assert!(Seeking.can_transition_to(Paused));
        assert!(Buffering.can_transition_to(Playing));
        assert!(Error.can_transition_to(Idle));
    }

    #[test]
    fn test_forbidden_edges() {
        use PlayerState::*;

        assert!(!Idle.can_transition_to(Playing));
        assert!(!Opening.can_transition_to(Playing));
        assert!(!Paused.can_transition_to(Buffering));
        assert!(!Error.can_transition_to(Playing));
        assert!(!Stopped.can_transition_to(Paused));
        // No self edges
        for value in 0..8u8 {
            let state = PlayerState::from_u8(value).unwrap();
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn test_stop_and_pause_predicates() {
        assert!(PlayerState::Idle.is_stop_state());
        assert!(PlayerState::Stopped.is_stop_state());
        assert!(PlayerState::Error.is_stop_state());
        assert!(!PlayerState::Playing.is_stop_state());

        assert!(PlayerState::Paused.is_pause_state());
        assert!(PlayerState::Seeking.is_pause_state());
        assert!(PlayerState::Buffering.is_pause_state());
        assert!(!PlayerState::Playing.is_pause_state());
    }
}
