use std::fmt::Display;

use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    Error as CodecError, Value,
};

use crate::{composite::Composite, registry};

use super::{ErrorCondition, Fields};

/// <type name="error" class="composite" source="list">
/// <descriptor name="amqp:error:list" code="0x00000000:0x0000001d"/>
/// </type>
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// <field name="condition" type="symbol" requires="error-condition" mandatory="true"/>
    pub condition: ErrorCondition,

    /// <field name="description" type="string"/>
    pub description: Option<String>,

    /// <field name="info" type="fields"/>
    pub info: Option<Fields>,
}

impl Error {
    /// Creates a new error
    pub fn new(
        condition: impl Into<ErrorCondition>,
        description: Option<String>,
        info: Option<Fields>,
    ) -> Self {
        Self {
            condition: condition.into(),
            description,
            info,
        }
    }
}

impl<T> From<T> for Error
where
    T: Into<ErrorCondition>,
{
    fn from(condition: T) -> Self {
        Self {
            condition: condition.into(),
            description: None,
            info: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.condition.as_str(), description),
            None => f.write_str(self.condition.as_str()),
        }
    }
}

impl Composite for Error {
    fn definition() -> &'static CompositeDef {
        &registry::ERROR
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.condition.into_value(),
            self.description.into_value(),
            self.info.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            condition: reader.next()?,
            description: reader.next()?,
            info: reader.next()?,
        })
    }
}

composite_field_value!(Error);
