//! Definition of the primitive types

mod array;
mod decimal;
mod map;
mod symbol;
mod timestamp;
mod uuid;

pub use self::array::*;
pub use self::decimal::*;
pub use self::map::*;
pub use self::symbol::*;
pub use self::timestamp::*;
pub use self::uuid::*;

/// A sequence of octets
///
/// encoding name = "vbin8", encoding code = 0xa0
/// category = variable, width = 1
/// label = "up to 2^8 - 1 octets of binary data"
///
/// encoding name = "vbin32", encoding code = 0xb0,
/// category = variable, width = 4
/// label = "up to 2^32 - 1 octets of binary data"
pub type Binary = bytes::Bytes;
