use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{composite::Composite, definitions::Error, registry};

/// 2.7.8 End
/// End the session.
/// <type name="end" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:end:list" code="0x00000000:0x00000017"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct End {
    /// <field name="error" type="error"/>
    pub error: Option<Error>,
}

impl Composite for End {
    fn definition() -> &'static CompositeDef {
        &registry::END
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

composite_field_value!(End);
