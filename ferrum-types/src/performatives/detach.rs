use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Error, Handle},
    registry,
};

/// 2.7.7 Detach
/// Detach the link endpoint from the session.
/// <type name="detach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:detach:list" code="0x00000000:0x00000016"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Detach {
    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="closed" type="boolean" default="false"/>
    ///
    /// If true then the sender has closed the link.
    pub closed: bool,

    /// <field name="error" type="error"/>
    ///
    /// If set, this field indicates that the link is being detached due to an error
    /// condition.
    pub error: Option<Error>,
}

impl Composite for Detach {
    fn definition() -> &'static CompositeDef {
        &registry::DETACH
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.handle.into_value(),
            self.closed.into_value(),
            self.error.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            handle: reader.next()?,
            closed: reader.next()?,
            error: reader.next()?,
        })
    }
}

composite_field_value!(Detach);
