//! Performatives defined in AMQP 1.0 specification Part 2.7

use bytes::BytesMut;
use ferrum_codec::{composite::FieldValue, Error as CodecError, Value};

use crate::{composite::Composite, registry};

mod attach;
mod begin;
mod close;
mod detach;
mod disposition;
mod end;
mod flow;
mod open;
mod transfer;

pub use attach::*;
pub use begin::*;
pub use close::*;
pub use detach::*;
pub use disposition::*;
pub use end::*;
pub use flow::*;
pub use open::*;
pub use transfer::*;

/// AMQP 1.0 Performatives
#[derive(Debug, Clone, PartialEq)]
pub enum Performative {
    /// Open
    Open(Open),

    /// Begin
    Begin(Begin),

    /// Attach
    Attach(Attach),

    /// Flow
    Flow(Flow),

    /// Transfer
    Transfer(Transfer),

    /// Disposition
    Disposition(Disposition),

    /// Detach
    Detach(Detach),

    /// End
    End(End),

    /// Close
    Close(Close),
}

impl Performative {
    /// Numeric descriptor of the performative
    pub fn code(&self) -> u64 {
        self.definition().code
    }

    /// Symbolic descriptor of the performative
    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    fn definition(&self) -> &'static ferrum_codec::composite::CompositeDef {
        match self {
            Performative::Open(_) => Open::definition(),
            Performative::Begin(_) => Begin::definition(),
            Performative::Attach(_) => Attach::definition(),
            Performative::Flow(_) => Flow::definition(),
            Performative::Transfer(_) => Transfer::definition(),
            Performative::Disposition(_) => Disposition::definition(),
            Performative::Detach(_) => Detach::definition(),
            Performative::End(_) => End::definition(),
            Performative::Close(_) => Close::definition(),
        }
    }

    /// Encode into a described value, checking mandatory fields and field types
    pub fn try_into_value(self) -> Result<Value, CodecError> {
        match self {
            Performative::Open(p) => p.try_into_value(),
            Performative::Begin(p) => p.try_into_value(),
            Performative::Attach(p) => p.try_into_value(),
            Performative::Flow(p) => p.try_into_value(),
            Performative::Transfer(p) => p.try_into_value(),
            Performative::Disposition(p) => p.try_into_value(),
            Performative::Detach(p) => p.try_into_value(),
            Performative::End(p) => p.try_into_value(),
            Performative::Close(p) => p.try_into_value(),
        }
    }

    /// Decode a described value whose descriptor names one of the nine performatives
    pub fn try_from_value(value: Value) -> Result<Self, CodecError> {
        let def = registry::resolve(&value, &registry::PERFORMATIVES)?;
        let performative = match def.code {
            0x10 => Performative::Open(Open::try_from_value(value)?),
            0x11 => Performative::Begin(Begin::try_from_value(value)?),
            0x12 => Performative::Attach(Attach::try_from_value(value)?),
            0x13 => Performative::Flow(Flow::try_from_value(value)?),
            0x14 => Performative::Transfer(Transfer::try_from_value(value)?),
            0x15 => Performative::Disposition(Disposition::try_from_value(value)?),
            0x16 => Performative::Detach(Detach::try_from_value(value)?),
            0x17 => Performative::End(End::try_from_value(value)?),
            _ => Performative::Close(Close::try_from_value(value)?),
        };
        Ok(performative)
    }

    /// Encode and append to the buffer
    pub fn encode(self, buf: &mut BytesMut) -> Result<(), CodecError> {
        ferrum_codec::encode(&self.try_into_value()?, buf)
    }

    /// Decode from the front of the slice, returning the number of bytes consumed
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), CodecError> {
        let (value, _, consumed) = ferrum_codec::decode(bytes)?;
        Ok((Self::try_from_value(value)?, consumed))
    }
}

impl FieldValue for Performative {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Self::try_from_value(value)
    }

    fn into_value(self) -> Value {
        match self {
            Performative::Open(p) => p.into_value(),
            Performative::Begin(p) => p.into_value(),
            Performative::Attach(p) => p.into_value(),
            Performative::Flow(p) => p.into_value(),
            Performative::Transfer(p) => p.into_value(),
            Performative::Disposition(p) => p.into_value(),
            Performative::Detach(p) => p.into_value(),
            Performative::End(p) => p.into_value(),
            Performative::Close(p) => p.into_value(),
        }
    }
}

macro_rules! impl_from_performative {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Performative {
                fn from(p: $variant) -> Self {
                    Performative::$variant(p)
                }
            }
        )*
    };
}

impl_from_performative!(Open, Begin, Attach, Flow, Transfer, Disposition, Detach, End, Close);
