use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{DeliveryNumber, DeliveryTag, Handle, MessageFormat, ReceiverSettleMode},
    messaging::DeliveryState,
    registry,
};

/// 2.7.5 Transfer
/// Transfer a message.
/// <type name="transfer" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:transfer:list" code="0x00000000:0x00000014"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// <field name="handle" type="handle" mandatory="true"/>
    ///
    /// Specifies the link on which the message is transferred.
    pub handle: Handle,

    /// <field name="delivery-id" type="delivery-number"/>
    ///
    /// The delivery-id MUST be supplied on the first transfer of a multi-transfer delivery.
    /// On continuation transfers the delivery-id MAY be omitted.
    pub delivery_id: Option<DeliveryNumber>,

    /// <field name="delivery-tag" type="delivery-tag"/>
    pub delivery_tag: Option<DeliveryTag>,

    /// <field name="message-format" type="message-format"/>
    pub message_format: Option<MessageFormat>,

    /// <field name="settled" type="boolean"/>
    ///
    /// For subsequent transfers in a multi-transfer delivery if the settled flag is left
    /// unset then it MUST be interpreted as true if and only if the value of the settled flag
    /// on any of the preceding transfers was true.
    pub settled: Option<bool>,

    /// <field name="more" type="boolean" default="false"/>
    pub more: bool,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode"/>
    pub rcv_settle_mode: Option<ReceiverSettleMode>,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="resume" type="boolean" default="false"/>
    ///
    /// The resume flag MUST be set to true on the first transfer of a resumed delivery.
    pub resume: bool,

    /// <field name="aborted" type="boolean" default="false"/>
    ///
    /// Aborted messages SHOULD be discarded by the recipient. An aborted message is
    /// implicitly settled.
    pub aborted: bool,

    /// <field name="batchable" type="boolean" default="false"/>
    pub batchable: bool,
}

impl Transfer {
    /// A transfer on the given handle with every optional field unset
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            delivery_id: None,
            delivery_tag: None,
            message_format: None,
            settled: None,
            more: false,
            rcv_settle_mode: None,
            state: None,
            resume: false,
            aborted: false,
            batchable: false,
        }
    }
}

impl Composite for Transfer {
    fn definition() -> &'static CompositeDef {
        &registry::TRANSFER
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.handle.into_value(),
            self.delivery_id.into_value(),
            self.delivery_tag.into_value(),
            self.message_format.into_value(),
            self.settled.into_value(),
            self.more.into_value(),
            self.rcv_settle_mode.into_value(),
            self.state.into_value(),
            self.resume.into_value(),
            self.aborted.into_value(),
            self.batchable.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            handle: reader.next()?,
            delivery_id: reader.next()?,
            delivery_tag: reader.next()?,
            message_format: reader.next()?,
            settled: reader.next()?,
            more: reader.next()?,
            rcv_settle_mode: reader.next()?,
            state: reader.next()?,
            resume: reader.next()?,
            aborted: reader.next()?,
            batchable: reader.next()?,
        })
    }
}

composite_field_value!(Transfer);

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use ferrum_codec::{from_slice, to_vec};

    use super::Transfer;
    use crate::{composite::Composite, definitions::Handle, messaging::DeliveryState};

    #[test]
    fn transfer_round_trip() {
        let mut transfer = Transfer::new(Handle(1));
        transfer.delivery_id = Some(7);
        transfer.delivery_tag = Some(Bytes::from_static(b"tag-7"));
        transfer.message_format = Some(0);
        transfer.state = Some(DeliveryState::accepted());
        transfer.more = true;

        let bytes = to_vec(&transfer.clone().try_into_value().unwrap()).unwrap();
        let decoded = Transfer::try_from_value(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, transfer);
    }

    #[test]
    fn non_delivery_state_is_rejected_in_state_field() {
        let mut fields = Transfer::new(Handle(0)).into_fields();
        fields[7] = crate::definitions::Error::from(crate::definitions::AmqpError::NotFound)
            .try_into_value()
            .unwrap();
        assert!(Transfer::definition().encode_fields(fields).is_err());
    }
}
