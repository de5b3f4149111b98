//! Described types

use std::fmt::Display;

use crate::{primitives::Symbol, value::Value};

/// Descriptor of a described type
///
/// Peers may use either the symbolic name or the numeric code. A numeric code is the domain
/// id in the upper 32 bits and the descriptor id in the lower 32 bits.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Descriptor {
    /// Symbolic descriptor, eg. `amqp:open:list`
    Name(Symbol),
    /// Numeric descriptor, eg. `0x0000_0000_0000_0010`
    Code(u64),
}

impl Descriptor {
    /// Creates a symbolic descriptor
    pub fn name(name: impl Into<Symbol>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a numeric descriptor
    pub fn code(code: u64) -> Self {
        Self::Code(code)
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::Name(name) => write!(f, "{}", name),
            Descriptor::Code(code) => write!(f, "0x{:08x}:0x{:08x}", code >> 32, code & 0xffff_ffff),
        }
    }
}

/// A value annotated with a descriptor
///
/// encoding code = 0x00 followed by the descriptor and the described value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Described {
    /// Descriptor of the value
    pub descriptor: Descriptor,
    /// The described value, a list for every composite
    pub value: Value,
}

impl Described {
    /// Creates a new described value
    pub fn new(descriptor: Descriptor, value: impl Into<Value>) -> Self {
        Self {
            descriptor,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Descriptor;

    #[test]
    fn display_descriptors() {
        assert_eq!(Descriptor::code(0x10).to_string(), "0x00000000:0x00000010");
        assert_eq!(Descriptor::name("amqp:open:list").to_string(), "amqp:open:list");
    }
}
