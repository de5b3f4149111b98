use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    primitives::{OrderedMap, Symbol},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Fields, Handle, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo},
    messaging::{Source, Target},
    registry,
};

/// 2.7.3 Attach
/// Attach a link to a session.
/// <type name="attach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:attach:list" code="0x00000000:0x00000012"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Attach {
    /// <field name="name" type="string" mandatory="true"/>
    ///
    /// This name uniquely identifies the link from the container of the source to the
    /// container of the target node.
    pub name: String,

    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="role" type="role" mandatory="true"/>
    pub role: Role,

    /// <field name="snd-settle-mode" type="sender-settle-mode" default="mixed"/>
    pub snd_settle_mode: SenderSettleMode,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode" default="first"/>
    pub rcv_settle_mode: ReceiverSettleMode,

    /// <field name="source" type="*" requires="source"/>
    pub source: Option<Box<Source>>,

    /// <field name="target" type="*" requires="target"/>
    pub target: Option<Box<Target>>,

    /// <field name="unsettled" type="map"/>
    ///
    /// Unsettled delivery state keyed by delivery-tag. Only carried, resumption is not
    /// performed.
    pub unsettled: Option<OrderedMap<Value, Value>>,

    /// <field name="incomplete-unsettled" type="boolean" default="false"/>
    pub incomplete_unsettled: bool,

    /// <field name="initial-delivery-count" type="sequence-no"/>
    ///
    /// This MUST NOT be null if role is sender, and it is ignored if the role is receiver.
    pub initial_delivery_count: Option<SequenceNo>,

    /// <field name="max-message-size" type="ulong"/>
    pub max_message_size: Option<u64>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Attach {
    /// Whether either terminus requests a dynamic node while also naming an address
    pub fn is_dynamic_with_address(&self) -> bool {
        self.source.as_ref().map_or(false, |s| s.is_dynamic_with_address())
            || self.target.as_ref().map_or(false, |t| t.is_dynamic_with_address())
    }
}

impl Composite for Attach {
    fn definition() -> &'static CompositeDef {
        &registry::ATTACH
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.name.into_value(),
            self.handle.into_value(),
            self.role.into_value(),
            self.snd_settle_mode.into_value(),
            self.rcv_settle_mode.into_value(),
            self.source.map(|s| *s).into_value(),
            self.target.map(|t| *t).into_value(),
            self.unsettled.map(Value::Map).into_value(),
            self.incomplete_unsettled.into_value(),
            self.initial_delivery_count.into_value(),
            self.max_message_size.into_value(),
            self.offered_capabilities.into_value(),
            self.desired_capabilities.into_value(),
            self.properties.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            name: reader.next()?,
            handle: reader.next()?,
            role: reader.next()?,
            snd_settle_mode: reader.next()?,
            rcv_settle_mode: reader.next()?,
            source: reader.next::<Option<Source>>()?.map(Box::new),
            target: reader.next::<Option<Target>>()?.map(Box::new),
            unsettled: match reader.next::<Value>()? {
                Value::Map(map) => Some(map),
                _ => None,
            },
            incomplete_unsettled: reader.next()?,
            initial_delivery_count: reader.next()?,
            max_message_size: reader.next()?,
            offered_capabilities: reader.next()?,
            desired_capabilities: reader.next()?,
            properties: reader.next()?,
        })
    }
}

composite_field_value!(Attach);

#[cfg(test)]
mod tests {
    use ferrum_codec::{from_slice, to_vec};

    use super::Attach;
    use crate::{
        composite::Composite,
        definitions::{Handle, ReceiverSettleMode, Role, SenderSettleMode},
        messaging::{Source, Target},
    };

    fn attach() -> Attach {
        Attach {
            name: "sender-link-1".to_string(),
            handle: Handle(0),
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::Mixed,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: Some(Box::new(Source::from("q1"))),
            target: Some(Box::new(Target::from("q1"))),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: Some(0),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }

    #[test]
    fn attach_round_trip() {
        let attach = attach();
        let bytes = to_vec(&attach.clone().try_into_value().unwrap()).unwrap();
        let decoded = Attach::try_from_value(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, attach);
    }

    #[test]
    fn dynamic_with_address() {
        let mut attach = attach();
        assert!(!attach.is_dynamic_with_address());
        attach.target = Some(Box::new(Target::builder().address("q1").dynamic(true).build()));
        assert!(attach.is_dynamic_with_address());
    }
}
