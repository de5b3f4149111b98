use std::convert::TryFrom;

use ferrum_codec::{composite::FieldValue, primitives::Symbol, Error as CodecError, Value};

symbol_enum! {
    /// 2.8.15 AMQP Error
    ///
    /// Shared error conditions.
    pub enum AmqpError {
        /// An internal error occurred
        InternalError => "amqp:internal-error",
        /// A peer attempted to work with a remote entity that does not exist
        NotFound => "amqp:not-found",
        /// A peer attempted to work with a remote entity to which it has no access
        UnauthorizedAccess => "amqp:unauthorized-access",
        /// Data could not be decoded
        DecodeError => "amqp:decode-error",
        /// A peer exceeded its resource allocation
        ResourceLimitExceeded => "amqp:resource-limit-exceeded",
        /// The peer tried to use a frame in a manner that is inconsistent with the semantics
        NotAllowed => "amqp:not-allowed",
        /// An invalid field was passed in a frame body
        InvalidField => "amqp:invalid-field",
        /// The peer tried to use functionality that is not implemented
        NotImplemented => "amqp:not-implemented",
        /// The client attempted to work with a server entity to which it has no access
        /// because another client is working with it
        ResourceLocked => "amqp:resource-locked",
        /// The client made a request that was not allowed because some precondition failed
        PreconditionFailed => "amqp:precondition-failed",
        /// A server entity the client is working with has been deleted
        ResourceDeleted => "amqp:resource-deleted",
        /// The peer sent a frame that is not permitted in the current state
        IllegalState => "amqp:illegal-state",
        /// The peer cannot send a frame because the smallest encoding of the performative
        /// with the currently valid values would be too large to fit within a frame
        FrameSizeTooSmall => "amqp:frame-size-too-small",
    }
}

symbol_enum! {
    /// 2.8.16 Connection Error
    pub enum ConnectionError {
        /// An operator intervened to close the connection for some reason
        ConnectionForced => "amqp:connection:forced",
        /// A valid frame header cannot be formed from the incoming byte stream
        FramingError => "amqp:connection:framing-error",
        /// The container is no longer available on the current connection
        Redirect => "amqp:connection:redirect",
    }
}

symbol_enum! {
    /// 2.8.17 Session Error
    pub enum SessionError {
        /// The peer violated incoming window for the session
        WindowViolation => "amqp:session:window-violation",
        /// Input was received for a link that was detached with an error
        ErrantLink => "amqp:session:errant-link",
        /// An attach was received using a handle that is already in use for an attached link
        HandleInUse => "amqp:session:handle-in-use",
        /// A frame (other than attach) was received referencing a handle which is not
        /// currently in use of an attached link
        UnattachedHandle => "amqp:session:unattached-handle",
    }
}

symbol_enum! {
    /// 2.8.18 Link Error
    pub enum LinkError {
        /// An operator intervened to detach for some reason
        DetachForced => "amqp:link:detach-forced",
        /// The peer sent more message transfers than currently allowed on the link
        TransferLimitExceeded => "amqp:link:transfer-limit-exceeded",
        /// The peer sent a larger message than is supported on the link
        MessageSizeExceeded => "amqp:link:message-size-exceeded",
        /// The address provided cannot be resolved to a terminus at the current container
        Redirect => "amqp:link:redirect",
        /// The link has been attached elsewhere, causing the existing attachment to be
        /// forcibly closed
        Stolen => "amqp:link:stolen",
    }
}

/// Condition of an [`Error`](super::Error)
///
/// Symbols outside of the four standard sets are kept as [`ErrorCondition::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorCondition {
    AmqpError(AmqpError),
    ConnectionError(ConnectionError),
    SessionError(SessionError),
    LinkError(LinkError),
    Custom(Symbol),
}

impl ErrorCondition {
    /// The symbol of the condition
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCondition::AmqpError(err) => err.as_str(),
            ErrorCondition::ConnectionError(err) => err.as_str(),
            ErrorCondition::SessionError(err) => err.as_str(),
            ErrorCondition::LinkError(err) => err.as_str(),
            ErrorCondition::Custom(sym) => sym.as_str(),
        }
    }
}

impl From<&str> for ErrorCondition {
    fn from(value: &str) -> Self {
        if let Ok(err) = AmqpError::try_from(value) {
            return ErrorCondition::AmqpError(err);
        }
        if let Ok(err) = ConnectionError::try_from(value) {
            return ErrorCondition::ConnectionError(err);
        }
        if let Ok(err) = SessionError::try_from(value) {
            return ErrorCondition::SessionError(err);
        }
        if let Ok(err) = LinkError::try_from(value) {
            return ErrorCondition::LinkError(err);
        }
        ErrorCondition::Custom(Symbol::from(value))
    }
}

impl From<AmqpError> for ErrorCondition {
    fn from(err: AmqpError) -> Self {
        ErrorCondition::AmqpError(err)
    }
}

impl From<ConnectionError> for ErrorCondition {
    fn from(err: ConnectionError) -> Self {
        ErrorCondition::ConnectionError(err)
    }
}

impl From<SessionError> for ErrorCondition {
    fn from(err: SessionError) -> Self {
        ErrorCondition::SessionError(err)
    }
}

impl From<LinkError> for ErrorCondition {
    fn from(err: LinkError) -> Self {
        ErrorCondition::LinkError(err)
    }
}

impl From<Symbol> for ErrorCondition {
    fn from(sym: Symbol) -> Self {
        ErrorCondition::from(sym.as_str())
    }
}

impl FieldValue for ErrorCondition {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Symbol(sym) => Ok(ErrorCondition::from(sym)),
            _ => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        match self {
            ErrorCondition::Custom(sym) => Value::Symbol(sym),
            other => Value::Symbol(Symbol::from(other.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use ferrum_codec::{composite::FieldValue, primitives::Symbol, Value};

    use super::{AmqpError, ErrorCondition, LinkError, SessionError};

    #[test]
    fn known_symbols_resolve_to_their_set() {
        assert_eq!(
            ErrorCondition::from("amqp:decode-error"),
            ErrorCondition::AmqpError(AmqpError::DecodeError)
        );
        assert_eq!(
            ErrorCondition::from("amqp:session:window-violation"),
            ErrorCondition::SessionError(SessionError::WindowViolation)
        );
        assert_eq!(
            ErrorCondition::from("amqp:link:stolen"),
            ErrorCondition::LinkError(LinkError::Stolen)
        );
    }

    #[test]
    fn unknown_symbols_are_custom() {
        let cond = ErrorCondition::from_value(Value::Symbol(Symbol::from("com:vendor:oops"))).unwrap();
        assert_eq!(cond, ErrorCondition::Custom(Symbol::from("com:vendor:oops")));
        assert_eq!(cond.into_value(), Value::Symbol(Symbol::from("com:vendor:oops")));
    }
}
