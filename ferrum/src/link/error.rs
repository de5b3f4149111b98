use ferrum_types::definitions::{self, AmqpError, DeliveryNumber, LinkError, Role};

/// Link-scope errors
///
/// Errors raised while processing inbound frames are sent to the peer in a closing detach,
/// see the `From<&Error>` conversion into [`definitions::Error`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The operation is not allowed in the current link state
    #[error("Illegal link state")]
    IllegalState,

    /// A dynamic terminus must not carry an address
    #[error("Dynamic terminus must not have an address")]
    DynamicWithAddress,

    /// The peer sent a transfer without link credit
    #[error("Transfer limit exceeded")]
    TransferLimitExceeded,

    /// A message is larger than the link's max message size
    #[error("Message size {size} exceeds max message size {max}")]
    MessageSizeExceeded {
        /// Size of the message so far
        size: u64,
        /// Max message size of the link
        max: u64,
    },

    /// A `received` state outside the first transfer of a resumed delivery
    #[error("Received state is only allowed on the first transfer of a resumed delivery")]
    MisplacedReceived,

    /// A disposition tried to change an outcome that was already recorded
    #[error("Terminal state of delivery {delivery_id} cannot change")]
    TerminalStateChanged {
        /// Delivery id
        delivery_id: DeliveryNumber,
    },

    /// A continuation transfer refers to a different delivery than the one in progress
    #[error("Continuation transfer does not match the delivery in progress")]
    InconsistentTransfer,

    /// A field required in this context is absent
    #[error("Missing field {0}")]
    MissingField(&'static str),

    /// The operation needs the other link role
    #[error("Operation requires a {expected:?} link")]
    RoleMismatch {
        /// Role required by the operation
        expected: Role,
    },

    /// Another link of the session already uses the name
    #[error("Link name must be unique")]
    DuplicatedLinkName,

    /// No handle at or below the negotiated handle max is free
    #[error("Handle max reached")]
    HandleMaxReached,

    /// The delivery is not in the unsettled map
    #[error("Delivery {0} not found")]
    DeliveryNotFound(DeliveryNumber),
}

impl From<&Error> for definitions::Error {
    fn from(err: &Error) -> Self {
        let condition: definitions::ErrorCondition = match err {
            Error::IllegalState | Error::TerminalStateChanged { .. } => AmqpError::IllegalState.into(),
            Error::DynamicWithAddress | Error::MissingField(_) => AmqpError::InvalidField.into(),
            Error::TransferLimitExceeded => LinkError::TransferLimitExceeded.into(),
            Error::MessageSizeExceeded { .. } => LinkError::MessageSizeExceeded.into(),
            Error::MisplacedReceived | Error::InconsistentTransfer | Error::RoleMismatch { .. } => {
                AmqpError::NotAllowed.into()
            }
            Error::DuplicatedLinkName | Error::HandleMaxReached => {
                AmqpError::ResourceLimitExceeded.into()
            }
            Error::DeliveryNotFound(_) => AmqpError::NotFound.into(),
        };
        definitions::Error::new(condition, Some(err.to_string()), None)
    }
}
