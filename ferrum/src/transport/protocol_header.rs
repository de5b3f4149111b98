//! Implements the protocol headers

use std::{convert::TryFrom, io};

use bytes::{Buf, BufMut, BytesMut};
use ferrum_types::definitions::{
    MAJOR, MINOR, REVISION, SASL_MAJOR, SASL_MINOR, SASL_REVISION, TLS_MAJOR, TLS_MINOR,
    TLS_REVISION,
};
use tokio_util::codec::{Decoder, Encoder};

use super::Error;

const PROTOCOL_HEADER_PREFIX: &[u8; 4] = b"AMQP";

/// Size of a protocol header
pub const PROTOCOL_HEADER_SIZE: usize = 8;

/// Protocol header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolHeader {
    /// Protocol ID
    pub id: ProtocolId,

    /// Major number
    pub major: u8,

    /// Minor number
    pub minor: u8,

    /// Revision number
    pub revision: u8,
}

impl Default for ProtocolHeader {
    fn default() -> Self {
        Self::amqp()
    }
}

impl ProtocolHeader {
    /// Creates a new protocol header
    pub fn new(id: ProtocolId, major: u8, minor: u8, revision: u8) -> Self {
        Self {
            id,
            major,
            minor,
            revision,
        }
    }

    /// Creates an AMQP 1.0.0 protocol header
    pub fn amqp() -> Self {
        Self::new(ProtocolId::Amqp, MAJOR, MINOR, REVISION)
    }

    /// Creates a TLS 1.0.0 protocol header
    pub fn tls() -> Self {
        Self::new(ProtocolId::Tls, TLS_MAJOR, TLS_MINOR, TLS_REVISION)
    }

    /// Creates a SASL 1.0.0 protocol header
    pub fn sasl() -> Self {
        Self::new(ProtocolId::Sasl, SASL_MAJOR, SASL_MINOR, SASL_REVISION)
    }

    /// Returns whether the protocol id is AMQP
    pub fn is_amqp(&self) -> bool {
        self.id == ProtocolId::Amqp
    }

    /// Returns whether the protocol id is TLS
    pub fn is_tls(&self) -> bool {
        self.id == ProtocolId::Tls
    }

    /// Returns whether the protocol id is SASL
    pub fn is_sasl(&self) -> bool {
        self.id == ProtocolId::Sasl
    }
}

impl From<ProtocolHeader> for [u8; 8] {
    fn from(value: ProtocolHeader) -> Self {
        [
            PROTOCOL_HEADER_PREFIX[0], // b'A'
            PROTOCOL_HEADER_PREFIX[1], // b'M'
            PROTOCOL_HEADER_PREFIX[2], // b'Q'
            PROTOCOL_HEADER_PREFIX[3], // b'P'
            value.id as u8,
            value.major,
            value.minor,
            value.revision,
        ]
    }
}

impl TryFrom<[u8; 8]> for ProtocolHeader {
    type Error = [u8; 8];

    fn try_from(v: [u8; 8]) -> Result<Self, Self::Error> {
        if &v[..4] != PROTOCOL_HEADER_PREFIX {
            return Err(v);
        }
        let id = ProtocolId::try_from(v[4]).map_err(|_| v)?;
        Ok(Self::new(id, v[5], v[6], v[7]))
    }
}

impl<'a> TryFrom<&'a [u8]> for ProtocolHeader {
    type Error = &'a [u8];

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 8] = value.try_into().map_err(|_| value)?;
        ProtocolHeader::try_from(bytes).map_err(|_| value)
    }
}

/// Protocol ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolId {
    /// AMQP
    Amqp = 0x0,

    /// TLS
    Tls = 0x2,

    /// SASL
    Sasl = 0x3,
}

impl TryFrom<u8> for ProtocolId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let val = match value {
            0x0 => Self::Amqp,
            0x2 => Self::Tls,
            0x3 => Self::Sasl,
            _ => return Err(value),
        };
        Ok(val)
    }
}

/// Encoder and Decoder for protocol headers
#[derive(Debug, Clone, Default)]
pub struct ProtocolHeaderCodec {}

impl ProtocolHeaderCodec {
    /// Creates a new protocol header codec
    pub fn new() -> Self {
        Self {}
    }
}

impl Encoder<ProtocolHeader> for ProtocolHeaderCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ProtocolHeader, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let buf: [u8; 8] = item.into();
        dst.put(&buf[..]);
        Ok(())
    }
}

impl Decoder for ProtocolHeaderCodec {
    type Item = ProtocolHeader;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.remaining() < PROTOCOL_HEADER_SIZE {
            return Ok(None);
        }

        let mut bytes = [0u8; PROTOCOL_HEADER_SIZE];
        src.copy_to_slice(&mut bytes);
        ProtocolHeader::try_from(bytes)
            .map(Some)
            .map_err(Error::ProtocolHeaderMismatch)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use bytes::BytesMut;
    use tokio_util::codec::{Decoder, Encoder};

    use super::{ProtocolHeader, ProtocolHeaderCodec, ProtocolId};
    use crate::transport::Error;

    #[test]
    fn amqp_header_bytes() {
        let bytes: [u8; 8] = ProtocolHeader::amqp().into();
        assert_eq!(&bytes, b"AMQP\x00\x01\x00\x00");
        let bytes: [u8; 8] = ProtocolHeader::sasl().into();
        assert_eq!(&bytes, b"AMQP\x03\x01\x00\x00");
    }

    #[test]
    fn header_from_slice() {
        let header = ProtocolHeader::try_from(&b"AMQP\x02\x01\x00\x00"[..]).unwrap();
        assert_eq!(header.id, ProtocolId::Tls);
        assert!(header.is_tls());
        assert!(ProtocolHeader::try_from(&b"AMQP\x01\x01\x00\x00"[..]).is_err());
        assert!(ProtocolHeader::try_from(&b"HTTP/1.1"[..]).is_err());
        assert!(ProtocolHeader::try_from(&b"AMQP"[..]).is_err());
    }

    #[test]
    fn codec_waits_for_eight_bytes() {
        let mut codec = ProtocolHeaderCodec::new();
        let mut src = BytesMut::from(&b"AMQP\x00"[..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"\x01\x00\x00");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(ProtocolHeader::amqp()));
        assert!(src.is_empty());
    }

    #[test]
    fn codec_rejects_garbage() {
        let mut codec = ProtocolHeaderCodec::new();
        let mut src = BytesMut::from(&b"GET / HTTP/1.1"[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(Error::ProtocolHeaderMismatch(_))
        ));

        let mut dst = BytesMut::new();
        codec.encode(ProtocolHeader::amqp(), &mut dst).unwrap();
        assert_eq!(&dst[..], b"AMQP\x00\x01\x00\x00");
    }
}
