//! Session endpoint state

use super::Error;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Unmapped state
    Unmapped,

    /// BeginSent
    BeginSent,

    /// BeginReceived
    BeginReceived,

    /// Mapped
    Mapped,

    /// EndSent
    EndSent,

    /// EndReceived
    EndReceived,

    /// Discarding
    Discarding,
}

/// Inputs of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A local begin was written
    BeginSent,

    /// The peer's begin arrived
    BeginReceived,

    /// A local end was written, `error` if it carries an error
    EndSent {
        /// Whether the end carries an error
        error: bool,
    },

    /// The peer's end arrived
    EndReceived,
}

impl SessionState {
    /// The state after `event`, or `Err(Error::IllegalState)` if the event is not allowed
    pub fn transition(self, event: SessionEvent) -> Result<Self, Error> {
        use SessionEvent as E;
        use SessionState as S;

        let next = match (self, event) {
            (S::Unmapped, E::BeginSent) => S::BeginSent,
            (S::Unmapped, E::BeginReceived) => S::BeginReceived,
            (S::BeginSent, E::BeginReceived) | (S::BeginReceived, E::BeginSent) => S::Mapped,
            (S::BeginSent | S::BeginReceived | S::Mapped, E::EndSent { error: false }) => {
                S::EndSent
            }
            (S::BeginSent | S::BeginReceived | S::Mapped, E::EndSent { error: true }) => {
                S::Discarding
            }
            (S::Mapped, E::EndReceived) => S::EndReceived,
            (S::EndReceived, E::EndSent { .. }) => S::Unmapped,
            (S::EndSent | S::Discarding, E::EndReceived) => S::Unmapped,
            _ => return Err(Error::IllegalState),
        };
        Ok(next)
    }

    /// Whether frames may be sent on the session's channel
    pub fn can_send(&self) -> bool {
        matches!(
            self,
            SessionState::BeginSent | SessionState::Mapped | SessionState::EndReceived
        )
    }

    /// Whether inbound frames other than `end` are dropped
    pub fn drops_inbound(&self) -> bool {
        matches!(self, SessionState::Discarding)
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionEvent, SessionState};

    #[test]
    fn begin_exchange() {
        let state = SessionState::Unmapped.transition(SessionEvent::BeginSent).unwrap();
        assert_eq!(state, SessionState::BeginSent);
        assert_eq!(
            state.transition(SessionEvent::BeginReceived).unwrap(),
            SessionState::Mapped
        );

        let state = SessionState::Unmapped
            .transition(SessionEvent::BeginReceived)
            .unwrap();
        assert_eq!(state, SessionState::BeginReceived);
        assert_eq!(state.transition(SessionEvent::BeginSent).unwrap(), SessionState::Mapped);
    }

    #[test]
    fn local_end() {
        let state = SessionState::Mapped
            .transition(SessionEvent::EndSent { error: false })
            .unwrap();
        assert_eq!(state, SessionState::EndSent);
        assert!(!state.drops_inbound());
        assert!(!state.can_send());
        assert_eq!(
            state.transition(SessionEvent::EndReceived).unwrap(),
            SessionState::Unmapped
        );
    }

    #[test]
    fn end_with_error_discards() {
        let state = SessionState::Mapped
            .transition(SessionEvent::EndSent { error: true })
            .unwrap();
        assert_eq!(state, SessionState::Discarding);
        assert!(!state.can_send());
        assert!(state.drops_inbound());
        assert_eq!(
            state.transition(SessionEvent::EndReceived).unwrap(),
            SessionState::Unmapped
        );
    }

    #[test]
    fn remote_end() {
        let state = SessionState::Mapped.transition(SessionEvent::EndReceived).unwrap();
        assert_eq!(state, SessionState::EndReceived);
        assert!(state.can_send());
        assert_eq!(
            state.transition(SessionEvent::EndSent { error: false }).unwrap(),
            SessionState::Unmapped
        );
    }

    #[test]
    fn illegal_transitions() {
        assert!(SessionState::Unmapped.transition(SessionEvent::EndReceived).is_err());
        assert!(SessionState::Mapped.transition(SessionEvent::BeginSent).is_err());
        assert!(SessionState::EndSent
            .transition(SessionEvent::EndSent { error: false })
            .is_err());
    }
}
