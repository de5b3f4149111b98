#![deny(missing_docs, missing_debug_implementations)]

//! Encoder and decoder for the AMQP 1.0 type system
//!
//! The codec works on the dynamic [`Value`] model. Composite types are described by static
//! field tables in [`composite`], which the encoder and decoder consult to validate mandatory
//! fields, fill in defaults and normalise multiple-valued fields.

pub mod composite;
pub mod de;
pub mod described;
pub mod error;
pub mod format_code;
pub mod primitives;
pub mod read;
pub mod ser;
pub mod value;

pub use de::{decode, from_slice, value_len, MAX_NESTING_DEPTH};
pub use described::{Described, Descriptor};
pub use error::Error;
pub use format_code::EncodingCodes;
pub use ser::{encode, encode_as, to_vec};
pub use value::Value;

/// Commonly used items
pub mod prelude {
    pub use super::composite::{CompositeDef, DefaultValue, FieldDef, FieldReader, FieldType, FieldValue};
    pub use super::primitives::{Array, Binary, OrderedMap, Symbol, Timestamp};
    pub use super::{decode, encode, from_slice, to_vec, Described, Descriptor, Error, Value};
}
