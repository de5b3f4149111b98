use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    primitives::Symbol,
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Fields, Handle, TransferNumber},
    registry,
};

/// 2.7.2 Begin
/// Begin a session on a channel.
/// <type name="begin" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:begin:list" code="0x00000000:0x00000011"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Begin {
    /// <field name="remote-channel" type="ushort"/>
    ///
    /// If a session is locally initiated, the remote-channel MUST NOT be set. When an endpoint
    /// responds to a remotely initiated session, the remote-channel MUST be set to the channel
    /// on which the remote session sent the begin.
    pub remote_channel: Option<u16>,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    pub next_outgoing_id: TransferNumber,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    pub incoming_window: u32,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: u32,

    /// <field name="handle-max" type="handle" default="4294967295"/>
    pub handle_max: Handle,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Composite for Begin {
    fn definition() -> &'static CompositeDef {
        &registry::BEGIN
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.remote_channel.into_value(),
            self.next_outgoing_id.into_value(),
            self.incoming_window.into_value(),
            self.outgoing_window.into_value(),
            self.handle_max.into_value(),
            self.offered_capabilities.into_value(),
            self.desired_capabilities.into_value(),
            self.properties.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            remote_channel: reader.next()?,
            next_outgoing_id: reader.next()?,
            incoming_window: reader.next()?,
            outgoing_window: reader.next()?,
            handle_max: reader.next()?,
            offered_capabilities: reader.next()?,
            desired_capabilities: reader.next()?,
            properties: reader.next()?,
        })
    }
}

composite_field_value!(Begin);
