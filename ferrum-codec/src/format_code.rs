//! Encoding codes of AMQP types

use std::{convert::TryFrom, fmt::Display};

use crate::error::Error;

macro_rules! encoding_codes {
    ($($(#[$meta:meta])* $variant:ident = $code:literal),* $(,)?) => {
        /// Encoding code for different types
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum EncodingCodes {
            $(
                $(#[$meta])*
                $variant = $code,
            )*
        }

        impl TryFrom<u8> for EncodingCodes {
            type Error = Error;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($code => Ok(EncodingCodes::$variant),)*
                    _ => Err(Error::InvalidFormatCode(value)),
                }
            }
        }
    };
}

encoding_codes! {
    /// Constructor prefix of a described type
    DescribedType = 0x00,

    /// Null
    Null = 0x40,

    /// Boolean carried in one payload byte
    Boolean = 0x56,
    /// Boolean true with no payload
    BooleanTrue = 0x41,
    /// Boolean false with no payload
    BooleanFalse = 0x42,

    /// u8
    UByte = 0x50,

    /// u16
    UShort = 0x60,

    /// u32
    UInt = 0x70,
    /// u32 in the range 0..=255
    SmallUint = 0x52,
    /// u32 zero
    Uint0 = 0x43,

    /// u64
    ULong = 0x80,
    /// u64 in the range 0..=255
    SmallUlong = 0x53,
    /// u64 zero
    Ulong0 = 0x44,

    /// i8
    Byte = 0x51,

    /// i16
    Short = 0x61,

    /// i32
    Int = 0x71,
    /// i32 in the range -128..=127
    SmallInt = 0x54,

    /// i64
    Long = 0x81,
    /// i64 in the range -128..=127
    SmallLong = 0x55,

    /// f32
    Float = 0x72,

    /// f64
    Double = 0x82,

    /// IEEE 754-2008 decimal32
    Decimal32 = 0x74,
    /// IEEE 754-2008 decimal64
    Decimal64 = 0x84,
    /// IEEE 754-2008 decimal128
    Decimal128 = 0x94,

    /// UTF-32BE code point
    Char = 0x73,

    /// Milliseconds since the unix epoch
    Timestamp = 0x83,

    /// RFC-4122 UUID
    Uuid = 0x98,

    /// Binary up to 2^8 - 1 octets
    VBin8 = 0xa0,
    /// Binary up to 2^32 - 1 octets
    VBin32 = 0xb0,

    /// UTF-8 string up to 2^8 - 1 octets
    Str8 = 0xa1,
    /// UTF-8 string up to 2^32 - 1 octets
    Str32 = 0xb1,

    /// ASCII symbol up to 2^8 - 1 octets
    Sym8 = 0xa3,
    /// ASCII symbol up to 2^32 - 1 octets
    Sym32 = 0xb3,

    /// Empty list
    List0 = 0x45,
    /// List with one-octet size and count
    List8 = 0xc0,
    /// List with four-octet size and count
    List32 = 0xd0,

    /// Map with one-octet size and count
    Map8 = 0xc1,
    /// Map with four-octet size and count
    Map32 = 0xd1,

    /// Array with one-octet size and count
    Array8 = 0xe0,
    /// Array with four-octet size and count
    Array32 = 0xf0,
}

/// Width of the payload that follows a constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Fixed number of octets
    Fixed(usize),
    /// A one-octet size prefix followed by that many octets
    Variable8,
    /// A four-octet size prefix followed by that many octets
    Variable32,
}

impl EncodingCodes {
    /// Payload width of values encoded with this constructor
    ///
    /// [`EncodingCodes::DescribedType`] has no width of its own and reports `Fixed(0)`.
    pub fn width(&self) -> Width {
        use EncodingCodes::*;
        match self {
            DescribedType | Null | BooleanTrue | BooleanFalse | Uint0 | Ulong0 | List0 => {
                Width::Fixed(0)
            }
            Boolean | UByte | Byte | SmallUint | SmallUlong | SmallInt | SmallLong => {
                Width::Fixed(1)
            }
            UShort | Short => Width::Fixed(2),
            UInt | Int | Float | Char | Decimal32 => Width::Fixed(4),
            ULong | Long | Double | Decimal64 | Timestamp => Width::Fixed(8),
            Decimal128 | Uuid => Width::Fixed(16),
            VBin8 | Str8 | Sym8 | List8 | Map8 | Array8 => Width::Variable8,
            VBin32 | Str32 | Sym32 | List32 | Map32 | Array32 => Width::Variable32,
        }
    }
}

impl Display for EncodingCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:0x{:02x}", self, *self as u8)
    }
}
