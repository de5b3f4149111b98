//! Connection endpoint state

use super::Error;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing has been exchanged
    Start,

    /// The peer's header arrived
    HeaderReceived,

    /// Our header was written
    HeaderSent,

    /// Both headers were exchanged
    HeaderExchange,

    /// Header and open were written before the peer's header arrived
    OpenPipe,

    /// Header, open and close were written before the peer's header arrived
    OpenClosePipe {
        /// Whether the close carries an error
        error: bool,
    },

    /// The peer's open arrived
    OpenReceived,

    /// Our open was written
    OpenSent,

    /// Open and close were written before the peer's open arrived
    ClosePipe {
        /// Whether the close carries an error
        error: bool,
    },

    /// Both opens were exchanged
    Opened,

    /// The peer's close arrived
    CloseReceived,

    /// Our close was written
    CloseSent,

    /// Our close carried an error, inbound frames are dropped until the peer's close
    Discarding,

    /// Both closes were exchanged
    End,
}

/// Inputs of the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Our protocol header was written
    HeaderSent,

    /// The peer's protocol header arrived
    HeaderReceived,

    /// Our open was written
    OpenSent,

    /// The peer's open arrived
    OpenReceived,

    /// Our close was written
    CloseSent {
        /// Whether the close carries an error
        error: bool,
    },

    /// The peer's close arrived
    CloseReceived,
}

impl ConnectionState {
    /// The state after `event`, or `Err(Error::IllegalState)` if the event is not allowed
    pub fn transition(self, event: ConnectionEvent) -> Result<Self, Error> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let next = match (self, event) {
            (S::Start, E::HeaderSent) => S::HeaderSent,
            (S::Start, E::HeaderReceived) => S::HeaderReceived,
            (S::HeaderReceived, E::HeaderSent) | (S::HeaderSent, E::HeaderReceived) => {
                S::HeaderExchange
            }
            (S::HeaderSent, E::OpenSent) => S::OpenPipe,
            (S::OpenPipe, E::HeaderReceived) => S::OpenSent,
            (S::OpenPipe, E::CloseSent { error }) => S::OpenClosePipe { error },
            (S::OpenClosePipe { error }, E::HeaderReceived) => S::ClosePipe { error },
            (S::HeaderExchange, E::OpenSent) => S::OpenSent,
            (S::HeaderExchange, E::OpenReceived) => S::OpenReceived,
            (S::OpenReceived, E::OpenSent) | (S::OpenSent, E::OpenReceived) => S::Opened,
            (S::OpenSent, E::CloseSent { error }) => S::ClosePipe { error },
            (S::ClosePipe { error: false }, E::OpenReceived) => S::CloseSent,
            (S::ClosePipe { error: true }, E::OpenReceived) => S::Discarding,
            (S::Opened, E::CloseSent { error: false }) => S::CloseSent,
            (S::Opened, E::CloseSent { error: true }) => S::Discarding,
            (S::Opened, E::CloseReceived) => S::CloseReceived,
            (S::CloseReceived, E::CloseSent { .. }) => S::End,
            (S::CloseSent | S::Discarding, E::CloseReceived) => S::End,
            _ => return Err(Error::IllegalState),
        };
        Ok(next)
    }

    /// Whether our open has been written
    pub fn open_sent(&self) -> bool {
        matches!(
            self,
            ConnectionState::OpenPipe
                | ConnectionState::OpenClosePipe { .. }
                | ConnectionState::OpenSent
                | ConnectionState::ClosePipe { .. }
                | ConnectionState::Opened
                | ConnectionState::CloseReceived
                | ConnectionState::CloseSent
                | ConnectionState::Discarding
                | ConnectionState::End
        )
    }

    /// Whether our close has been written
    pub fn close_sent(&self) -> bool {
        matches!(
            self,
            ConnectionState::OpenClosePipe { .. }
                | ConnectionState::ClosePipe { .. }
                | ConnectionState::CloseSent
                | ConnectionState::Discarding
                | ConnectionState::End
        )
    }

    /// Whether our header has been written
    pub fn header_sent(&self) -> bool {
        !matches!(
            self,
            ConnectionState::Start | ConnectionState::HeaderReceived
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionEvent as E, ConnectionState as S};

    fn run(events: &[E]) -> Result<S, super::Error> {
        events
            .iter()
            .try_fold(S::Start, |state, event| state.transition(*event))
    }

    #[test]
    fn sequential_handshake() {
        let state = run(&[
            E::HeaderSent,
            E::HeaderReceived,
            E::OpenSent,
            E::OpenReceived,
        ])
        .unwrap();
        assert_eq!(state, S::Opened);

        let state = run(&[
            E::HeaderReceived,
            E::HeaderSent,
            E::OpenReceived,
            E::OpenSent,
        ])
        .unwrap();
        assert_eq!(state, S::Opened);
    }

    #[test]
    fn pipelined_open() {
        let state = run(&[E::HeaderSent, E::OpenSent]).unwrap();
        assert_eq!(state, S::OpenPipe);
        assert_eq!(state.transition(E::HeaderReceived).unwrap(), S::OpenSent);
    }

    #[test]
    fn pipelined_open_and_close() {
        let state = run(&[
            E::HeaderSent,
            E::OpenSent,
            E::CloseSent { error: false },
            E::HeaderReceived,
        ])
        .unwrap();
        assert_eq!(state, S::ClosePipe { error: false });
        let state = state.transition(E::OpenReceived).unwrap();
        assert_eq!(state, S::CloseSent);
        assert_eq!(state.transition(E::CloseReceived).unwrap(), S::End);
    }

    #[test]
    fn pipelined_close_with_error_discards() {
        let state = run(&[
            E::HeaderSent,
            E::OpenSent,
            E::CloseSent { error: true },
            E::HeaderReceived,
        ])
        .unwrap();
        assert_eq!(state, S::ClosePipe { error: true });
        let state = state.transition(E::OpenReceived).unwrap();
        assert_eq!(state, S::Discarding);
        assert_eq!(state.transition(E::CloseReceived).unwrap(), S::End);

        let state = run(&[
            E::HeaderSent,
            E::HeaderReceived,
            E::OpenSent,
            E::CloseSent { error: true },
            E::OpenReceived,
        ])
        .unwrap();
        assert_eq!(state, S::Discarding);
    }

    #[test]
    fn close_with_error_discards() {
        let opened = run(&[
            E::HeaderSent,
            E::HeaderReceived,
            E::OpenSent,
            E::OpenReceived,
        ])
        .unwrap();
        let state = opened.transition(E::CloseSent { error: true }).unwrap();
        assert_eq!(state, S::Discarding);
        assert_eq!(state.transition(E::CloseReceived).unwrap(), S::End);

        let state = opened.transition(E::CloseReceived).unwrap();
        assert_eq!(state, S::CloseReceived);
        assert_eq!(state.transition(E::CloseSent { error: false }).unwrap(), S::End);
    }

    #[test]
    fn illegal_transitions() {
        assert!(S::Start.transition(E::OpenSent).is_err());
        assert!(S::HeaderReceived.transition(E::OpenReceived).is_err());
        assert!(S::End.transition(E::CloseSent { error: false }).is_err());
        assert!(S::Opened.transition(E::OpenReceived).is_err());
    }

    #[test]
    fn sent_markers() {
        assert!(!S::Start.header_sent());
        assert!(S::OpenPipe.open_sent());
        assert!(!S::HeaderExchange.open_sent());
        assert!(S::ClosePipe { error: false }.close_sent());
        assert!(S::OpenClosePipe { error: true }.open_sent());
        assert!(!S::CloseReceived.close_sent());
    }
}
