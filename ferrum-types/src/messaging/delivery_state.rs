//! Part 3.4 delivery state

use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Error, Fields},
    registry,
};

/// 3.4 Delivery State
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryState {
    /// 3.4.1 Received
    Received(Received),

    /// 3.4.2 Accepted
    Accepted(Accepted),

    /// 3.4.3 Rejected
    Rejected(Rejected),

    /// 3.4.4 Released
    Released(Released),

    /// 3.4.5 Modified
    Modified(Modified),
}

impl DeliveryState {
    /// Whether a state is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Received(_))
    }

    /// Whether a delivery settled with this state counts as a failed delivery attempt
    ///
    /// A failed attempt increments the `delivery-count` of the message header.
    pub fn increments_delivery_count(&self) -> bool {
        match self {
            DeliveryState::Rejected(_) => true,
            DeliveryState::Modified(modified) => modified.delivery_failed == Some(true),
            DeliveryState::Received(_)
            | DeliveryState::Accepted(_)
            | DeliveryState::Released(_) => false,
        }
    }

    /// Whether the message must not be redelivered to the same link
    pub fn undeliverable_here(&self) -> bool {
        match self {
            DeliveryState::Modified(modified) => modified.undeliverable_here == Some(true),
            _ => false,
        }
    }

    /// The outcome, if the state is terminal
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            DeliveryState::Received(_) => None,
            DeliveryState::Accepted(v) => Some(Outcome::Accepted(v.clone())),
            DeliveryState::Rejected(v) => Some(Outcome::Rejected(v.clone())),
            DeliveryState::Released(v) => Some(Outcome::Released(v.clone())),
            DeliveryState::Modified(v) => Some(Outcome::Modified(v.clone())),
        }
    }

    /// Shorthand for `DeliveryState::Accepted(Accepted {})`
    pub fn accepted() -> Self {
        DeliveryState::Accepted(Accepted {})
    }

    /// Shorthand for `DeliveryState::Released(Released {})`
    pub fn released() -> Self {
        DeliveryState::Released(Released {})
    }

    /// Shorthand for a rejected state carrying an optional error
    pub fn rejected(error: Option<Error>) -> Self {
        DeliveryState::Rejected(Rejected { error })
    }
}

impl FieldValue for DeliveryState {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let def = registry::resolve(&value, &registry::DELIVERY_STATES)?;
        let state = match def.code {
            0x23 => DeliveryState::Received(Received::try_from_value(value)?),
            0x24 => DeliveryState::Accepted(Accepted::try_from_value(value)?),
            0x25 => DeliveryState::Rejected(Rejected::try_from_value(value)?),
            0x26 => DeliveryState::Released(Released::try_from_value(value)?),
            _ => DeliveryState::Modified(Modified::try_from_value(value)?),
        };
        Ok(state)
    }

    fn into_value(self) -> Value {
        match self {
            DeliveryState::Received(v) => v.into_value(),
            DeliveryState::Accepted(v) => v.into_value(),
            DeliveryState::Rejected(v) => v.into_value(),
            DeliveryState::Released(v) => v.into_value(),
            DeliveryState::Modified(v) => v.into_value(),
        }
    }
}

impl From<Outcome> for DeliveryState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Accepted(v) => DeliveryState::Accepted(v),
            Outcome::Rejected(v) => DeliveryState::Rejected(v),
            Outcome::Released(v) => DeliveryState::Released(v),
            Outcome::Modified(v) => DeliveryState::Modified(v),
        }
    }
}

impl From<Received> for DeliveryState {
    fn from(value: Received) -> Self {
        DeliveryState::Received(value)
    }
}

impl From<Modified> for DeliveryState {
    fn from(value: Modified) -> Self {
        DeliveryState::Modified(value)
    }
}

/// A terminal delivery state is also referred to as Outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 3.4.2 Accepted
    Accepted(Accepted),

    /// 3.4.3 Rejected
    Rejected(Rejected),

    /// 3.4.4 Released
    Released(Released),

    /// 3.4.5 Modified
    Modified(Modified),
}

impl FieldValue for Outcome {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        registry::resolve(&value, &registry::OUTCOMES)?;
        match DeliveryState::from_value(value)?.outcome() {
            Some(outcome) => Ok(outcome),
            None => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        DeliveryState::from(self).into_value()
    }
}

/// 3.4.1 Received
///
/// <type name="received" class="composite" source="list" provides="delivery-state">
/// <descriptor name="amqp:received:list" code="0x00000000:0x00000023"/>
/// </type>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// <field name="section-number" type="uint" mandatory="true"/>
    ///
    /// When sent by the sender this indicates the first section of the message
    /// (with section-number 0 being the first section) for which data can be resent.
    pub section_number: u32,

    /// <field name="section-offset" type="ulong" mandatory="true"/>
    ///
    /// When sent by the sender this indicates the first byte of the encoded section
    /// data of the section given by section-number for which data can be resent.
    pub section_offset: u64,
}

/// 3.4.2 Accepted
/// The accepted outcome
///
/// <type name="accepted" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:accepted:list" code="0x00000000:0x00000024"/>
/// </type>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {}

/// 3.4.3 Rejected
/// The rejected outcome.
///
/// <type name="rejected" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:rejected:list" code="0x00000000:0x00000025"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// <field name="error" type="error"/>
    pub error: Option<Error>,
}

/// 3.4.4 Released
/// The released outcome.
///
/// <type name="released" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:released:list" code="0x00000000:0x00000026"/>
/// </type>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {}

/// 3.4.5 Modified
/// The modified outcome.
///
/// <type name="modified" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:modified:list" code="0x00000000:0x00000027"/>
/// </type>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Modified {
    /// <field name="delivery-failed" type="boolean"/>
    ///
    /// If the delivery-failed flag is set, any messages modified MUST have their
    /// delivery-count incremented.
    pub delivery_failed: Option<bool>,

    /// <field name="undeliverable-here" type="boolean"/>
    ///
    /// If the undeliverable-here is set, then any messages released MUST NOT be redelivered
    /// to the modifying link endpoint.
    pub undeliverable_here: Option<bool>,

    /// <field name="message-annotations" type="fields"/>
    pub message_annotations: Option<Fields>,
}

impl Composite for Received {
    fn definition() -> &'static CompositeDef {
        &registry::RECEIVED
    }

    fn into_fields(self) -> Vec<Value> {
        vec![Value::UInt(self.section_number), Value::ULong(self.section_offset)]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            section_number: reader.next()?,
            section_offset: reader.next()?,
        })
    }
}

impl Composite for Accepted {
    fn definition() -> &'static CompositeDef {
        &registry::ACCEPTED
    }

    fn into_fields(self) -> Vec<Value> {
        Vec::new()
    }

    fn from_fields(_: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {})
    }
}

impl Composite for Rejected {
    fn definition() -> &'static CompositeDef {
        &registry::REJECTED
    }

    fn into_fields(self) -> Vec<Value> {
        vec![self.error.into_value()]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            error: reader.next()?,
        })
    }
}

impl Composite for Released {
    fn definition() -> &'static CompositeDef {
        &registry::RELEASED
    }

    fn into_fields(self) -> Vec<Value> {
        Vec::new()
    }

    fn from_fields(_: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {})
    }
}

impl Composite for Modified {
    fn definition() -> &'static CompositeDef {
        &registry::MODIFIED
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.delivery_failed.into_value(),
            self.undeliverable_here.into_value(),
            self.message_annotations.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            delivery_failed: reader.next()?,
            undeliverable_here: reader.next()?,
            message_annotations: reader.next()?,
        })
    }
}

composite_field_value!(Received, Accepted, Rejected, Released, Modified);

#[cfg(test)]
mod tests {
    use ferrum_codec::{composite::FieldValue, from_slice, to_vec, Value};

    use super::{Accepted, DeliveryState, Modified, Outcome, Received, Rejected};
    use crate::definitions::{AmqpError, Error};

    #[test]
    fn accepted_is_an_empty_described_list() {
        let bytes = to_vec(&DeliveryState::accepted().into_value()).unwrap();
        assert_eq!(bytes, [0x00, 0x53, 0x24, 0x45]);
        let state = DeliveryState::from_value(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(state, DeliveryState::Accepted(Accepted {}));
    }

    #[test]
    fn delivery_count_rules() {
        assert!(!DeliveryState::accepted().increments_delivery_count());
        assert!(!DeliveryState::released().increments_delivery_count());
        assert!(DeliveryState::rejected(None).increments_delivery_count());

        let failed = DeliveryState::Modified(Modified {
            delivery_failed: Some(true),
            ..Default::default()
        });
        assert!(failed.increments_delivery_count());
        assert!(!failed.undeliverable_here());

        let not_here = DeliveryState::Modified(Modified {
            undeliverable_here: Some(true),
            ..Default::default()
        });
        assert!(!not_here.increments_delivery_count());
        assert!(not_here.undeliverable_here());
    }

    #[test]
    fn received_is_not_terminal() {
        let received = DeliveryState::Received(Received {
            section_number: 0,
            section_offset: 10,
        });
        assert!(!received.is_terminal());
        assert!(received.outcome().is_none());
        assert!(DeliveryState::released().is_terminal());
    }

    #[test]
    fn rejected_with_error() {
        let state = DeliveryState::rejected(Some(Error::from(AmqpError::DecodeError)));
        let bytes = to_vec(&state.clone().into_value()).unwrap();
        let decoded = DeliveryState::from_value(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(
            decoded,
            DeliveryState::Rejected(Rejected {
                error: Some(Error::from(AmqpError::DecodeError))
            })
        );
    }

    #[test]
    fn received_is_not_an_outcome() {
        let value = Received {
            section_number: 1,
            section_offset: 0,
        }
        .into_value();
        assert!(Outcome::from_value(value.clone()).is_err());
        assert!(DeliveryState::from_value(value).is_ok());
    }

    #[test]
    fn non_described_value_is_rejected() {
        assert!(DeliveryState::from_value(Value::UInt(1)).is_err());
    }
}
