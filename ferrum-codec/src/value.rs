//! The dynamic value model of the AMQP 1.0 type system

use ordered_float::OrderedFloat;

use crate::{
    described::{Described, Descriptor},
    format_code::EncodingCodes,
    primitives::{Array, Binary, Dec128, Dec32, Dec64, OrderedMap, Symbol, Timestamp, Uuid},
};

/// Primitive type definitions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Described type
    ///
    /// Box is used to reduce the memory size of the Value type.
    Described(Box<Described>),

    /// Indicates an empty value
    ///
    /// encoding code = 0x40,
    /// category = fixed, width = 0,
    /// label = "the null value"
    Null,

    /// Represents a true or false value
    ///
    /// encoding code = 0x56 / 0x41 / 0x42
    Bool(bool),

    /// Integer in the range 0 to 2^8-1 inclusive
    ///
    /// encoding code = 0x50,
    /// category = fixed, width = 1
    UByte(u8),

    /// Integer in the range 0 to 2^16-1 inclusive
    ///
    /// encoding code = 0x60,
    /// category = fixed, width = 2
    UShort(u16),

    /// Integer in the range 0 to 2^32-1 inclusive
    ///
    /// encoding code = 0x70 / smalluint 0x52 / uint0 0x43
    UInt(u32),

    /// Integer in the range 0 to 2^64-1 inclusive
    ///
    /// encoding code = 0x80 / smallulong 0x53 / ulong0 0x44
    ULong(u64),

    /// Integer in the range -(2^7) to 2^7-1 inclusive
    ///
    /// encoding code = 0x51,
    /// category = fixed, width = 1
    Byte(i8),

    /// Integer in the range -(2^15) to 2^15-1 inclusive
    ///
    /// encoding code = 0x61,
    /// category = fixed, width = 2
    Short(i16),

    /// Integer in the range -(2^31) to 2^31-1 inclusive
    ///
    /// encoding code = 0x71 / smallint 0x54
    Int(i32),

    /// Integer in the range -(2^63) to 2^63-1 inclusive
    ///
    /// encoding code = 0x81 / smalllong 0x55
    Long(i64),

    /// 32-bit floating point number (IEEE 754-2008 binary32)
    ///
    /// encoding code = 0x72
    Float(OrderedFloat<f32>),

    /// 64-bit floating point number (IEEE 754-2008 binary64).
    ///
    /// encoding code = 0x82
    Double(OrderedFloat<f64>),

    /// encoding code = 0x74
    Decimal32(Dec32),

    /// encoding code = 0x84
    Decimal64(Dec64),

    /// encoding code = 0x94
    Decimal128(Dec128),

    /// A single Unicode character
    ///
    /// encoding code = 0x73,
    /// category = fixed, width = 4
    Char(char),

    /// An absolute point in time
    ///
    /// encoding code = 0x83
    Timestamp(Timestamp),

    /// encoding code = 0x98
    Uuid(Uuid),

    /// A sequence of octets
    ///
    /// encoding code = 0xa0 / 0xb0
    Binary(Binary),

    /// A sequence of Unicode characters
    ///
    /// encoding code = 0xa1 / 0xb1
    String(String),

    /// Symbolic values from a constrained domain
    ///
    /// encoding code = 0xa3 / 0xb3
    Symbol(Symbol),

    /// A sequence of polymorphic values
    ///
    /// encoding code = 0x45 / 0xc0 / 0xd0
    List(Vec<Value>),

    /// A polymorphic mapping from distinct keys to values
    ///
    /// encoding code = 0xc1 / 0xd1
    Map(OrderedMap<Value, Value>),

    /// A sequence of values of a single type
    ///
    /// encoding code = 0xe0 / 0xf0
    Array(Array),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Get the format code of the compact encoding the value will be written with
    pub fn format_code(&self) -> EncodingCodes {
        crate::ser::compact_code(self)
    }

    /// Creates a described value
    pub fn described(descriptor: Descriptor, value: impl Into<Value>) -> Self {
        Value::Described(Box::new(Described::new(descriptor, value)))
    }

    /// Whether the value is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean if the value is a [`Value::Bool`]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the unsigned integer if the value is a [`Value::UInt`]
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Value::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the unsigned integer if the value is a [`Value::ULong`]
    pub fn as_ulong(&self) -> Option<u64> {
        match self {
            Value::ULong(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string if the value is a [`Value::String`]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the symbol if the value is a [`Value::Symbol`]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the described value if the value is a [`Value::Described`]
    pub fn as_described(&self) -> Option<&Described> {
        match self {
            Value::Described(d) => Some(d),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($variant:ident: $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::$variant(val)
                }
            }
        )*
    };
}

impl_from_for_value! {
    Bool: bool,
    UByte: u8,
    UShort: u16,
    UInt: u32,
    ULong: u64,
    Byte: i8,
    Short: i16,
    Int: i32,
    Long: i64,
    Decimal32: Dec32,
    Decimal64: Dec64,
    Decimal128: Dec128,
    Char: char,
    Timestamp: Timestamp,
    Uuid: Uuid,
    Binary: Binary,
    String: String,
    Symbol: Symbol,
    List: Vec<Value>,
    Map: OrderedMap<Value, Value>,
    Array: Array,
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::Float(OrderedFloat(val))
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Double(OrderedFloat(val))
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<Described> for Value {
    fn from(val: Described) -> Self {
        Value::Described(Box::new(val))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        match val {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::format_code::EncodingCodes;

    #[test]
    fn compact_format_codes() {
        assert_eq!(Value::UInt(0).format_code(), EncodingCodes::Uint0);
        assert_eq!(Value::UInt(255).format_code(), EncodingCodes::SmallUint);
        assert_eq!(Value::UInt(256).format_code(), EncodingCodes::UInt);
        assert_eq!(Value::Long(-128).format_code(), EncodingCodes::SmallLong);
        assert_eq!(Value::Long(-129).format_code(), EncodingCodes::Long);
        assert_eq!(Value::Bool(true).format_code(), EncodingCodes::BooleanTrue);
        assert_eq!(Value::List(vec![]).format_code(), EncodingCodes::List0);
        assert_eq!(Value::from("a".repeat(256)).format_code(), EncodingCodes::Str32);
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<u32>), Value::Null);
        assert_eq!(Value::from(Some(7u32)), Value::UInt(7));
    }
}
