use std::io;

use ferrum_types::definitions::{self, AmqpError, ConnectionError};

/// Frame encoding and decoding errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The performative could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] ferrum_codec::Error),

    /// A valid frame header cannot be formed from the incoming byte stream
    #[error("Framing error: {0}")]
    FramingError(&'static str),

    /// The frame is larger than the negotiated max frame size
    #[error("Frame size {size} exceeds the max frame size {max}")]
    MaxFrameSizeExceeded {
        /// Size of the frame
        size: usize,
        /// Negotiated max frame size
        max: usize,
    },

    /// Frame type or extended header that is not supported
    #[error("Not implemented")]
    NotImplemented,
}

impl From<&Error> for definitions::Error {
    fn from(err: &Error) -> Self {
        match err {
            Error::Io(e) => definitions::Error::new(
                AmqpError::InternalError,
                Some(e.to_string()),
                None,
            ),
            Error::Codec(e) => {
                definitions::Error::new(AmqpError::DecodeError, Some(e.to_string()), None)
            }
            Error::FramingError(description) => definitions::Error::new(
                ConnectionError::FramingError,
                Some(description.to_string()),
                None,
            ),
            Error::MaxFrameSizeExceeded { .. } => definitions::Error::new(
                ConnectionError::FramingError,
                Some(err.to_string()),
                None,
            ),
            Error::NotImplemented => definitions::Error::new(AmqpError::NotImplemented, None, None),
        }
    }
}
