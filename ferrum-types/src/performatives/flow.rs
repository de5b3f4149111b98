use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Fields, Handle, SequenceNo, TransferNumber},
    registry,
};

/// 2.7.4 Flow
/// Update link state.
/// <type name="flow" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:flow:list" code="0x00000000:0x00000013"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// <field name="next-incoming-id" type="transfer-number"/>
    ///
    /// This value MUST be set if the peer has received the begin frame for the session, and
    /// MUST NOT be set if it has not.
    pub next_incoming_id: Option<TransferNumber>,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    pub incoming_window: u32,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    pub next_outgoing_id: TransferNumber,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: u32,

    /// <field name="handle" type="handle"/>
    ///
    /// If not set, the flow frame is carrying only information pertaining to the session
    /// endpoint.
    pub handle: Option<Handle>,

    /// <field name="delivery-count" type="sequence-no"/>
    ///
    /// When the handle field is not set, this field MUST NOT be set.
    pub delivery_count: Option<SequenceNo>,

    /// <field name="link-credit" type="uint"/>
    ///
    /// The current maximum number of messages that can be handled at the receiver endpoint
    /// of the link.
    pub link_credit: Option<u32>,

    /// <field name="available" type="uint"/>
    pub available: Option<u32>,

    /// <field name="drain" type="boolean" default="false"/>
    ///
    /// When flow state is sent from the receiver to the sender, this field contains the
    /// desired drain mode of the receiver.
    pub drain: bool,

    /// <field name="echo" type="boolean" default="false"/>
    pub echo: bool,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Composite for Flow {
    fn definition() -> &'static CompositeDef {
        &registry::FLOW
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.next_incoming_id.into_value(),
            self.incoming_window.into_value(),
            self.next_outgoing_id.into_value(),
            self.outgoing_window.into_value(),
            self.handle.into_value(),
            self.delivery_count.into_value(),
            self.link_credit.into_value(),
            self.available.into_value(),
            self.drain.into_value(),
            self.echo.into_value(),
            self.properties.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            next_incoming_id: reader.next()?,
            incoming_window: reader.next()?,
            next_outgoing_id: reader.next()?,
            outgoing_window: reader.next()?,
            handle: reader.next()?,
            delivery_count: reader.next()?,
            link_credit: reader.next()?,
            available: reader.next()?,
            drain: reader.next()?,
            echo: reader.next()?,
            properties: reader.next()?,
        })
    }
}

composite_field_value!(Flow);
