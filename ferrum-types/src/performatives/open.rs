use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    primitives::Symbol,
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Fields, IetfLanguageTag, Milliseconds},
    registry,
};

/// 2.7.1 Open
/// Negotiate connection parameters.
/// <type name="open" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:open:list" code="0x00000000:0x00000010"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Open {
    /// <field name="container-id" type="string" mandatory="true"/>
    pub container_id: String,

    /// <field name="hostname" type="string"/>
    ///
    /// The name of the host (either fully qualified or relative) to which the sending peer
    /// is connecting.
    pub hostname: Option<String>,

    /// <field name="max-frame-size" type="uint" default="4294967295"/>
    ///
    /// The largest frame size that the sending peer is able to accept on this connection.
    pub max_frame_size: u32,

    /// <field name="channel-max" type="ushort" default="65535"/>
    ///
    /// The channel-max value is the highest channel number that can be used on the
    /// connection.
    pub channel_max: u16,

    /// <field name="idle-time-out" type="milliseconds"/>
    pub idle_time_out: Option<Milliseconds>,

    /// <field name="outgoing-locales" type="ietf-language-tag" multiple="true"/>
    pub outgoing_locales: Option<Vec<IetfLanguageTag>>,

    /// <field name="incoming-locales" type="ietf-language-tag" multiple="true"/>
    pub incoming_locales: Option<Vec<IetfLanguageTag>>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Open {
    /// An open with the given container id and every other field at its default
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            hostname: None,
            max_frame_size: u32::MAX,
            channel_max: u16::MAX,
            idle_time_out: None,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }
}

impl Composite for Open {
    fn definition() -> &'static CompositeDef {
        &registry::OPEN
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.container_id.into_value(),
            self.hostname.into_value(),
            self.max_frame_size.into_value(),
            self.channel_max.into_value(),
            self.idle_time_out.into_value(),
            self.outgoing_locales.into_value(),
            self.incoming_locales.into_value(),
            self.offered_capabilities.into_value(),
            self.desired_capabilities.into_value(),
            self.properties.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            container_id: reader.next()?,
            hostname: reader.next()?,
            max_frame_size: reader.next()?,
            channel_max: reader.next()?,
            idle_time_out: reader.next()?,
            outgoing_locales: reader.next()?,
            incoming_locales: reader.next()?,
            offered_capabilities: reader.next()?,
            desired_capabilities: reader.next()?,
            properties: reader.next()?,
        })
    }
}

composite_field_value!(Open);

#[cfg(test)]
mod tests {
    use ferrum_codec::{described::Descriptor, Value};

    use super::Open;
    use crate::composite::Composite;

    #[test]
    fn absent_fields_take_defaults() {
        let value = Value::described(
            Descriptor::code(0x10),
            Value::List(vec![Value::from("c1")]),
        );
        let open = Open::try_from_value(value).unwrap();
        assert_eq!(open, Open::new("c1"));
        assert_eq!(open.max_frame_size, u32::MAX);
        assert_eq!(open.channel_max, u16::MAX);
    }

    #[test]
    fn container_id_is_mandatory() {
        let value = Value::described(Descriptor::code(0x10), Value::List(vec![]));
        assert!(Open::try_from_value(value).is_err());
    }

    #[test]
    fn symbolic_descriptor_decodes() {
        let value = Value::described(
            Descriptor::name("amqp:open:list"),
            Value::List(vec![Value::from("c1"), Value::Null, Value::UInt(512)]),
        );
        let open = Open::try_from_value(value).unwrap();
        assert_eq!(open.max_frame_size, 512);
    }
}
