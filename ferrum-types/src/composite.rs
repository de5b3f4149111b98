//! Typed view over composite definitions

use bytes::BytesMut;
use ferrum_codec::{
    composite::{CompositeDef, FieldReader},
    Error, Value,
};

/// A Rust type that maps to an AMQP composite
///
/// Implementors only list their fields in schema order. Validation against the static
/// definition happens in the provided methods.
pub trait Composite: Sized {
    /// The static definition of the composite
    fn definition() -> &'static CompositeDef;

    /// Field values in schema order, `Value::Null` for absent fields
    fn into_fields(self) -> Vec<Value>;

    /// Read the fields in schema order
    fn from_fields(reader: &mut FieldReader) -> Result<Self, Error>;

    /// Encode into a described value, checking mandatory fields and field types
    fn try_into_value(self) -> Result<Value, Error> {
        Self::definition().encode_fields(self.into_fields())
    }

    /// Decode from a described value
    fn try_from_value(value: Value) -> Result<Self, Error> {
        let mut reader = Self::definition().reader(value)?;
        Self::from_fields(&mut reader)
    }

    /// Encode and append to the buffer
    fn encode(self, buf: &mut BytesMut) -> Result<(), Error> {
        ferrum_codec::encode(&self.try_into_value()?, buf)
    }

    /// Decode from the front of the slice, returning the number of bytes consumed
    fn decode(bytes: &[u8]) -> Result<(Self, usize), Error> {
        let (value, _, consumed) = ferrum_codec::decode(bytes)?;
        Ok((Self::try_from_value(value)?, consumed))
    }
}
