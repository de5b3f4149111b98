//! Link endpoint state

use super::Error;

/// Link state.
///
/// AMQP 1.0 names no link states, these follow the attach and detach exchange. `Error` is entered
/// when the local endpoint detached the link because the peer violated the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No attach has been exchanged, or both detaches have
    Detached,

    /// An attach frame has been sent
    AttachSent,

    /// An attach frame has been received
    AttachReceived,

    /// The link is attached
    Attached,

    /// The link was detached locally with an error
    Error,
}

/// Inputs of the link state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A local attach was written
    AttachSent,

    /// The peer's attach arrived
    AttachReceived,

    /// A local detach was written
    DetachSent,

    /// The peer's detach arrived
    DetachReceived,

    /// The peer violated the protocol on this link
    Failed,
}

impl LinkState {
    /// The state after `event`, or `Err(Error::IllegalState)` if the event is not allowed
    pub fn transition(self, event: LinkEvent) -> Result<Self, Error> {
        use LinkEvent as E;
        use LinkState as S;

        let next = match (self, event) {
            (_, E::Failed) => S::Error,
            (S::Detached, E::AttachSent) => S::AttachSent,
            (S::Detached, E::AttachReceived) => S::AttachReceived,
            (S::AttachSent, E::AttachReceived) | (S::AttachReceived, E::AttachSent) => S::Attached,
            (
                S::AttachSent | S::AttachReceived | S::Attached | S::Detached,
                E::DetachSent | E::DetachReceived,
            ) => S::Detached,
            (S::Error, E::DetachReceived) => S::Detached,
            (S::Error, E::DetachSent) => S::Error,
            _ => return Err(Error::IllegalState),
        };
        Ok(next)
    }

    /// Whether transfers may flow
    pub fn is_attached(&self) -> bool {
        matches!(self, LinkState::Attached)
    }
}
