//! Implements errors associated with the connection

use ferrum_types::definitions::{self, AmqpError, ConnectionError, ErrorCondition};

use crate::{
    frames,
    link::{self, LinkId},
    session::{self, SessionId},
};

/// Errors returned by [`crate::Connection`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation is not allowed in the current connection state
    #[error("Illegal connection state")]
    IllegalState,

    /// Every channel up to the agreed channel max is in use
    #[error("Channel max reached")]
    ChannelMaxReached,

    /// No session with this id
    #[error("{0} not found")]
    SessionNotFound(SessionId),

    /// No link with this id in the session
    #[error("{0} not found")]
    LinkNotFound(LinkId),

    /// The configuration cannot be used
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),

    /// A session-scope error
    #[error(transparent)]
    Session(session::Error),

    /// A link-scope error
    #[error(transparent)]
    Link(#[from] link::Error),

    /// A frame could not be encoded or decoded
    #[error(transparent)]
    Frame(#[from] frames::Error),

    /// The connection was closed locally with this error
    #[error("Local error {:?}", .0)]
    Local(definitions::Error),

    /// The peer closed the connection with this error
    #[error("Remote error {:?}", .0)]
    Remote(definitions::Error),
}

impl From<session::Error> for Error {
    fn from(err: session::Error) -> Self {
        match err {
            session::Error::Link { error, .. } => Self::Link(error),
            session::Error::LinkNotFound(id) => Self::LinkNotFound(id),
            err => Self::Session(err),
        }
    }
}

impl Error {
    pub(crate) fn amqp_error(condition: AmqpError, description: impl Into<String>) -> definitions::Error {
        definitions::Error::new(
            ErrorCondition::AmqpError(condition),
            Some(description.into()),
            None,
        )
    }

    pub(crate) fn connection_error(
        condition: ConnectionError,
        description: impl Into<String>,
    ) -> definitions::Error {
        definitions::Error::new(
            ErrorCondition::ConnectionError(condition),
            Some(description.into()),
            None,
        )
    }
}
