//! Frame layer
//!
//! ```text
//! +0       +4     +5     +6        +8
//! | SIZE   | DOFF | TYPE | CHANNEL | extended header | performative | payload |
//! ```
//!
//! `SIZE` counts the whole frame including the header. `DOFF` is the offset of the frame
//! body in 4-byte words and is never below 2.

use bytes::{BufMut, Bytes, BytesMut};

pub mod amqp;
mod error;

pub use amqp::{split_transfer, Frame, FrameBody, FrameCodec};
pub use error::Error;

/// Frame type of AMQP frames
pub const FRAME_TYPE_AMQP: u8 = 0x00;

/// Frame type of SASL frames
pub const FRAME_TYPE_SASL: u8 = 0x01;

/// Size of the fixed frame header
pub const FRAME_HEADER_SIZE: usize = 8;

/// Data offset of a frame without extended header
const DOFF: u8 = 2;

/// A frame split into its parts, borrowing from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Frame type
    pub frame_type: u8,

    /// Channel the frame was sent on
    pub channel: u16,

    /// Encoded performative, empty for heartbeat frames
    pub performative: &'a [u8],

    /// Bytes following the performative
    pub payload: &'a [u8],

    /// Length of the whole frame
    pub frame_len: usize,
}

/// Result of [`unwrap_frame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unwrapped<'a> {
    /// The input does not hold a whole frame yet
    Incomplete {
        /// Number of bytes missing to complete the frame, or the header if the size is unknown
        needed: usize,
    },

    /// A whole frame
    Frame(RawFrame<'a>),
}

/// Write the frame header followed by the performative and the payload
pub(crate) fn write_frame(
    dst: &mut BytesMut,
    frame_type: u8,
    channel: u16,
    performative: &[u8],
    payload: &[u8],
) -> Result<(), Error> {
    let size = FRAME_HEADER_SIZE + performative.len() + payload.len();
    let size = u32::try_from(size).map_err(|_| Error::FramingError("frame larger than 4 GiB"))?;
    dst.reserve(size as usize);
    dst.put_u32(size);
    dst.put_u8(DOFF);
    dst.put_u8(frame_type);
    dst.put_u16(channel);
    dst.put_slice(performative);
    dst.put_slice(payload);
    Ok(())
}

/// Prefix the encoded performative and optional payload with the frame header
pub fn wrap_frame(
    frame_type: u8,
    channel: u16,
    performative: &[u8],
    payload: Option<&[u8]>,
) -> Result<Bytes, Error> {
    let mut dst = BytesMut::new();
    write_frame(
        &mut dst,
        frame_type,
        channel,
        performative,
        payload.unwrap_or_default(),
    )?;
    Ok(dst.freeze())
}

/// Split the frame at the front of `src`
///
/// A frame that is not completely available is [`Unwrapped::Incomplete`], not an error. The
/// boundary between performative and payload is found by skipping one encoded value.
pub fn unwrap_frame(src: &[u8]) -> Result<Unwrapped<'_>, Error> {
    if src.len() < FRAME_HEADER_SIZE {
        return Ok(Unwrapped::Incomplete {
            needed: FRAME_HEADER_SIZE - src.len(),
        });
    }

    let size = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    let doff = src[4] as usize;
    let frame_type = src[5];
    let channel = u16::from_be_bytes([src[6], src[7]]);

    if size < FRAME_HEADER_SIZE {
        return Err(Error::FramingError("frame size smaller than the frame header"));
    }
    if doff < DOFF as usize {
        return Err(Error::FramingError("data offset below 2"));
    }
    if doff * 4 > size {
        return Err(Error::FramingError("data offset beyond the end of the frame"));
    }
    if src.len() < size {
        return Ok(Unwrapped::Incomplete {
            needed: size - src.len(),
        });
    }

    let body = &src[doff * 4..size];
    let (performative, payload) = if body.is_empty() {
        (body, body)
    } else {
        let len = ferrum_codec::value_len(body)?;
        body.split_at(len)
    };

    Ok(Unwrapped::Frame(RawFrame {
        frame_type,
        channel,
        performative,
        payload,
        frame_len: size,
    }))
}
