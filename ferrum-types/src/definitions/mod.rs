//! Types defined in AMQP 1.0 specification Part 2.8: Definitions

use ferrum_codec::{
    composite::FieldValue,
    primitives::{Binary, OrderedMap, Symbol},
    Error as CodecError, Value,
};
use serde::{Deserialize, Serialize};

mod constants;
pub use constants::*;

/// 2.8.14 Error
mod error;
pub use error::Error;

/// 2.8.15 - 2.8.18 Error conditions
mod error_cond;
pub use error_cond::{AmqpError, ConnectionError, ErrorCondition, LinkError, SessionError};

/// 2.8.1 Role
///
/// Link endpoints are either senders or receivers; encoded as a boolean with `false` for
/// the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// false
    Sender,
    /// true
    Receiver,
}

impl Role {
    /// The role of the peer endpoint of the same link
    pub fn opposite(&self) -> Self {
        match self {
            Role::Sender => Role::Receiver,
            Role::Receiver => Role::Sender,
        }
    }
}

impl FieldValue for Role {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(false) => Ok(Role::Sender),
            Value::Bool(true) => Ok(Role::Receiver),
            _ => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self == Role::Receiver)
    }
}

/// 2.8.2 Sender Settle Mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SenderSettleMode {
    /// <choice name="unsettled" value="0"/>
    ///
    /// The sender will send all deliveries initially unsettled to the receiver.
    Unsettled,

    /// <choice name="settled" value="1"/>
    ///
    /// The sender will send all deliveries settled to the receiver.
    Settled,

    /// <choice name="mixed" value="2"/>
    ///
    /// The sender MAY send a mixture of settled and unsettled deliveries to the receiver.
    #[default]
    Mixed,
}

impl FieldValue for SenderSettleMode {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::UByte(0) => Ok(SenderSettleMode::Unsettled),
            Value::UByte(1) => Ok(SenderSettleMode::Settled),
            Value::UByte(2) => Ok(SenderSettleMode::Mixed),
            _ => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::UByte(self as u8)
    }
}

/// 2.8.3 Receiver Settle Mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiverSettleMode {
    /// <choice name="first" value="0"/>
    ///
    /// The receiver will spontaneously settle all incoming transfers.
    #[default]
    First,

    /// <choice name="second" value="1"/>
    ///
    /// The receiver will only settle after sending the disposition to the sender and
    /// receiving a disposition indicating settlement of the delivery from the sender.
    Second,
}

impl FieldValue for ReceiverSettleMode {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::UByte(0) => Ok(ReceiverSettleMode::First),
            Value::UByte(1) => Ok(ReceiverSettleMode::Second),
            _ => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::UByte(self as u8)
    }
}

/// 2.8.4 Handle
///
/// An alias established by the attach frame and subsequently used by endpoints as a
/// shorthand to refer to the link in all outgoing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u32);

impl From<u32> for Handle {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<Handle> for u32 {
    fn from(val: Handle) -> Self {
        val.0
    }
}

impl FieldValue for Handle {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        u32::from_value(value).map(Handle)
    }

    fn into_value(self) -> Value {
        Value::UInt(self.0)
    }
}

/// 2.8.5 Seconds
pub type Seconds = u32;

/// 2.8.6 Milliseconds
pub type Milliseconds = u32;

/// 2.8.7 Delivery Tag
/// A delivery-tag can be up to 32 octets of binary data
pub type DeliveryTag = Binary;

/// 2.8.8 Delivery Number
pub type DeliveryNumber = SequenceNo;

/// 2.8.9 Transfer Number
pub type TransferNumber = SequenceNo;

/// 2.8.10 Sequence No
///
/// 32-bit RFC-1982 serial number
pub type SequenceNo = u32;

/// 2.8.11 Message Format
pub type MessageFormat = u32;

/// 2.8.12 IETF Language Tag
pub type IetfLanguageTag = Symbol;

/// 2.8.13 Fields
pub type Fields = OrderedMap<Symbol, Value>;

#[cfg(test)]
mod tests {
    use ferrum_codec::{composite::FieldValue, Value};

    use super::{ReceiverSettleMode, Role, SenderSettleMode};

    #[test]
    fn role_is_a_boolean() {
        assert_eq!(Role::Sender.into_value(), Value::Bool(false));
        assert_eq!(Role::from_value(Value::Bool(true)).unwrap(), Role::Receiver);
        assert!(Role::from_value(Value::UByte(1)).is_err());
    }

    #[test]
    fn settle_modes_are_ubytes() {
        assert_eq!(SenderSettleMode::Mixed.into_value(), Value::UByte(2));
        assert_eq!(
            ReceiverSettleMode::from_value(Value::UByte(1)).unwrap(),
            ReceiverSettleMode::Second
        );
        assert!(SenderSettleMode::from_value(Value::UByte(3)).is_err());
    }

    #[test]
    fn settle_modes_in_config_files() {
        let json = serde_json::to_string(&SenderSettleMode::Unsettled).unwrap();
        assert_eq!(json, "\"unsettled\"");
        let mode: ReceiverSettleMode = serde_json::from_str("\"second\"").unwrap();
        assert_eq!(mode, ReceiverSettleMode::Second);
    }
}
