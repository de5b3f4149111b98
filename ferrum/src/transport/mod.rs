//! Byte-level pieces shared by the connection engine and the driver

pub mod protocol_header;

pub use protocol_header::{ProtocolHeader, ProtocolHeaderCodec, ProtocolId};

/// Errors raised while negotiating the protocol header
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The peer sent a header that is not a known AMQP protocol header
    #[error("Protocol header mismatch {0:x?}")]
    ProtocolHeaderMismatch([u8; 8]),
}
