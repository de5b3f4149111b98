use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{composite::Composite, definitions::Error, registry};

/// 2.7.9 Close
/// Signal a connection close.
/// <type name="close" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:close:list" code="0x00000000:0x00000018"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Close {
    /// <field name="error" type="error"/>
    pub error: Option<Error>,
}

impl Composite for Close {
    fn definition() -> &'static CompositeDef {
        &registry::CLOSE
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

composite_field_value!(Close);
