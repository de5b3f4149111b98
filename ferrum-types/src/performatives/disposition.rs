use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{DeliveryNumber, Role},
    messaging::DeliveryState,
    registry,
};

/// 2.7.6 Disposition
/// Inform remote peer of delivery state changes.
/// <type name="disposition" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:disposition:list" code="0x00000000:0x00000015"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Disposition {
    /// <field name="role" type="role" mandatory="true"/>
    ///
    /// The role identifies whether the disposition frame contains information about sending
    /// link endpoints or receiving link endpoints.
    pub role: Role,

    /// <field name="first" type="delivery-number" mandatory="true"/>
    pub first: DeliveryNumber,

    /// <field name="last" type="delivery-number"/>
    ///
    /// If not set, this is taken to be the same as first.
    pub last: Option<DeliveryNumber>,

    /// <field name="settled" type="boolean" default="false"/>
    pub settled: bool,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="batchable" type="boolean" default="false"/>
    pub batchable: bool,
}

impl Disposition {
    /// Inclusive range of delivery ids covered by the disposition
    pub fn range(&self) -> (DeliveryNumber, DeliveryNumber) {
        (self.first, self.last.unwrap_or(self.first))
    }
}

impl Composite for Disposition {
    fn definition() -> &'static CompositeDef {
        &registry::DISPOSITION
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.role.into_value(),
            self.first.into_value(),
            self.last.into_value(),
            self.settled.into_value(),
            self.state.into_value(),
            self.batchable.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            role: reader.next()?,
            first: reader.next()?,
            last: reader.next()?,
            settled: reader.next()?,
            state: reader.next()?,
            batchable: reader.next()?,
        })
    }
}

composite_field_value!(Disposition);
