use ferrum_types::definitions::{self, AmqpError, Handle, SessionError};

use crate::link::{self, LinkId};

/// Session-scope errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The operation is not allowed in the current session state
    #[error("Illegal session state")]
    IllegalState,

    /// The peer sent more transfer payload than the incoming window allows
    #[error("Incoming window violated")]
    WindowViolation,

    /// A frame refers to a handle with no attached link
    #[error("Unattached handle {0:?}")]
    UnattachedHandle(Handle),

    /// An attach uses a handle that is already in use
    #[error("Handle {0:?} is already in use")]
    HandleInUse(Handle),

    /// An attach uses a handle above the local handle max
    #[error("Handle {0:?} exceeds handle max")]
    HandleMaxExceeded(Handle),

    /// No link with this id
    #[error("{0} not found")]
    LinkNotFound(LinkId),

    /// A link-scope error
    #[error("{id}: {error}")]
    Link {
        /// The link
        id: LinkId,
        /// The error
        error: link::Error,
    },
}

impl From<&Error> for definitions::Error {
    fn from(err: &Error) -> Self {
        let condition: definitions::ErrorCondition = match err {
            Error::IllegalState => AmqpError::IllegalState.into(),
            Error::WindowViolation => SessionError::WindowViolation.into(),
            Error::UnattachedHandle(_) => SessionError::UnattachedHandle.into(),
            Error::HandleInUse(_) => SessionError::HandleInUse.into(),
            Error::HandleMaxExceeded(_) => AmqpError::ResourceLimitExceeded.into(),
            Error::LinkNotFound(_) => AmqpError::NotFound.into(),
            Error::Link { error, .. } => return definitions::Error::from(error),
        };
        definitions::Error::new(condition, Some(err.to_string()), None)
    }
}
