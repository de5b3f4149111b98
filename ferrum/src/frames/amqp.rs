//! AMQP frame type and corresponding encoder and decoder

use bytes::{Buf, Bytes, BytesMut};
use ferrum_types::{
    definitions::MIN_MAX_FRAME_SIZE,
    performatives::{
        Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
    },
    Composite,
};
use tokio_util::codec::{Decoder, Encoder};

use super::{unwrap_frame, write_frame, Error, Unwrapped, FRAME_HEADER_SIZE, FRAME_TYPE_AMQP};

/// AMQP frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// AMQP frame channel
    pub channel: u16,

    /// AMQP frame body
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new AMQP frame
    pub fn new(channel: impl Into<u16>, body: impl Into<FrameBody>) -> Self {
        Self {
            channel: channel.into(),
            body: body.into(),
        }
    }

    /// Get the channel of the frame
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Get the body of the frame
    pub fn body(&self) -> &FrameBody {
        &self.body
    }

    /// Consume the frame to get the frame body
    pub fn into_body(self) -> FrameBody {
        self.body
    }

    /// Creates an empty frame. The empty frame is only used to reset
    /// the remote idle timeout
    pub fn empty() -> Self {
        Self {
            channel: 0,
            body: FrameBody::Empty,
        }
    }
}

/// AMQP frame body
#[derive(Clone, PartialEq)]
pub enum FrameBody {
    // Frames handled by Link
    /// Attach performative
    Attach(Attach),

    /// Flow performative
    Flow(Flow),

    /// Transfer performative and payload
    Transfer {
        /// Transfer performative
        performative: Transfer,

        /// Binary payload
        payload: Bytes,
    },

    /// Disposition performative
    Disposition(Disposition),

    /// Detach performative
    Detach(Detach),

    // Frames handled by Session
    /// Begin performative
    Begin(Begin),

    /// End performative
    End(End),

    // Frames handled by Connection
    /// Open performative
    Open(Open),

    /// Close performative
    Close(Close),

    /// An empty frame used only for resetting idle timeout
    Empty,
}

impl FrameBody {
    /// Build the body from a decoded performative and the bytes following it
    pub fn from_performative(performative: Performative, payload: Bytes) -> Self {
        match performative {
            Performative::Open(p) => FrameBody::Open(p),
            Performative::Begin(p) => FrameBody::Begin(p),
            Performative::Attach(p) => FrameBody::Attach(p),
            Performative::Flow(p) => FrameBody::Flow(p),
            Performative::Transfer(performative) => FrameBody::Transfer {
                performative,
                payload,
            },
            Performative::Disposition(p) => FrameBody::Disposition(p),
            Performative::Detach(p) => FrameBody::Detach(p),
            Performative::End(p) => FrameBody::End(p),
            Performative::Close(p) => FrameBody::Close(p),
        }
    }

    /// Split the body into its performative and payload. `None` for the empty frame
    pub fn into_parts(self) -> Option<(Performative, Bytes)> {
        let parts = match self {
            FrameBody::Open(p) => (p.into(), Bytes::new()),
            FrameBody::Begin(p) => (p.into(), Bytes::new()),
            FrameBody::Attach(p) => (p.into(), Bytes::new()),
            FrameBody::Flow(p) => (p.into(), Bytes::new()),
            FrameBody::Transfer {
                performative,
                payload,
            } => (performative.into(), payload),
            FrameBody::Disposition(p) => (p.into(), Bytes::new()),
            FrameBody::Detach(p) => (p.into(), Bytes::new()),
            FrameBody::End(p) => (p.into(), Bytes::new()),
            FrameBody::Close(p) => (p.into(), Bytes::new()),
            FrameBody::Empty => return None,
        };
        Some(parts)
    }
}

macro_rules! impl_from_for_frame_body {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for FrameBody {
                fn from(p: $variant) -> Self {
                    FrameBody::$variant(p)
                }
            }
        )*
    };
}

impl_from_for_frame_body!(Open, Begin, Attach, Flow, Disposition, Detach, End, Close);

impl std::fmt::Debug for FrameBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attach(arg0) => f.debug_tuple("Attach").field(arg0).finish(),
            Self::Flow(arg0) => f.debug_tuple("Flow").field(arg0).finish(),
            Self::Transfer {
                performative,
                payload,
            } => f
                .debug_struct("Transfer")
                .field("performative", performative)
                .field("payload.len", &payload.len())
                .finish(),
            Self::Disposition(arg0) => f.debug_tuple("Disposition").field(arg0).finish(),
            Self::Detach(arg0) => f.debug_tuple("Detach").field(arg0).finish(),
            Self::Begin(arg0) => f.debug_tuple("Begin").field(arg0).finish(),
            Self::End(arg0) => f.debug_tuple("End").field(arg0).finish(),
            Self::Open(arg0) => f.debug_tuple("Open").field(arg0).finish(),
            Self::Close(arg0) => f.debug_tuple("Close").field(arg0).finish(),
            Self::Empty => write!(f, "Empty"),
        }
    }
}

fn encoded_len(transfer: &Transfer) -> Result<usize, Error> {
    let mut buf = BytesMut::new();
    transfer.clone().encode(&mut buf)?;
    Ok(buf.len())
}

/// Split a transfer whose frame would exceed `max_frame_size` into several `more=true`
/// transfers
///
/// The first frame keeps every field. Continuation frames only carry the handle, `more`
/// and the abort/batchable flags. The last frame restores the original `more`.
pub fn split_transfer(
    transfer: Transfer,
    mut payload: Bytes,
    max_frame_size: usize,
) -> Result<Vec<(Transfer, Bytes)>, Error> {
    let whole = encoded_len(&transfer)?;
    if FRAME_HEADER_SIZE + whole + payload.len() <= max_frame_size {
        return Ok(vec![(transfer, payload)]);
    }

    let orig_more = transfer.more;
    let mut first = transfer;
    first.more = true;
    let first_len = encoded_len(&first)?;
    let room = max_frame_size
        .checked_sub(FRAME_HEADER_SIZE + first_len)
        .filter(|room| *room > 0)
        .ok_or(Error::FramingError("frame size too small for transfer"))?;

    let mut middle = first.clone();
    middle.delivery_id = None;
    middle.delivery_tag = None;
    middle.message_format = None;
    middle.settled = None;
    middle.rcv_settle_mode = None;
    middle.state = None;
    middle.resume = false;
    let mut last = middle.clone();
    last.more = orig_more;

    let mid_len = encoded_len(&middle)?.max(encoded_len(&last)?);
    let mid_room = max_frame_size
        .checked_sub(FRAME_HEADER_SIZE + mid_len)
        .filter(|room| *room > 0)
        .ok_or(Error::FramingError("frame size too small for transfer"))?;

    let mut frames = Vec::new();
    let partial = payload.split_to(room.min(payload.len()));
    frames.push((first, partial));

    while payload.len() > mid_room {
        let partial = payload.split_to(mid_room);
        frames.push((middle.clone(), partial));
    }
    frames.push((last, payload));

    Ok(frames)
}

/// Encoder and decoder of the AMQP frames
///
/// Inbound frames are bounded by the locally advertised max frame size, outbound frames by
/// the one the peer advertised.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_inbound: usize,
    max_outbound: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MIN_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    /// Creates a codec with the same limit in both directions
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_inbound: max_frame_size,
            max_outbound: max_frame_size,
        }
    }

    /// Largest frame accepted from the peer
    pub fn max_inbound(&self) -> usize {
        self.max_inbound
    }

    /// Largest frame written to the peer
    pub fn max_outbound(&self) -> usize {
        self.max_outbound
    }

    /// Set the largest frame accepted from the peer
    pub fn set_max_inbound(&mut self, max_frame_size: usize) {
        self.max_inbound = max_frame_size;
    }

    /// Set the largest frame written to the peer
    pub fn set_max_outbound(&mut self, max_frame_size: usize) {
        self.max_outbound = max_frame_size;
    }

    fn encode_body(
        &self,
        dst: &mut BytesMut,
        channel: u16,
        performative: Performative,
        payload: &[u8],
    ) -> Result<(), Error> {
        let mut buf = BytesMut::new();
        performative.encode(&mut buf)?;
        let size = FRAME_HEADER_SIZE + buf.len() + payload.len();
        if size > self.max_outbound {
            return Err(Error::MaxFrameSizeExceeded {
                size,
                max: self.max_outbound,
            });
        }
        write_frame(dst, FRAME_TYPE_AMQP, channel, &buf, payload)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item.body {
            FrameBody::Transfer {
                performative,
                payload,
            } => {
                for (transfer, partial) in split_transfer(performative, payload, self.max_outbound)? {
                    self.encode_body(dst, item.channel, transfer.into(), &partial)?;
                }
                Ok(())
            }
            FrameBody::Empty => write_frame(dst, FRAME_TYPE_AMQP, item.channel, &[], &[]),
            body => match body.into_parts() {
                Some((performative, payload)) => {
                    self.encode_body(dst, item.channel, performative, &payload)
                }
                None => Ok(()),
            },
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (frame, frame_len) = match unwrap_frame(src)? {
            Unwrapped::Incomplete { .. } => {
                if src.len() >= 4 {
                    let size = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
                    if size > self.max_inbound {
                        return Err(Error::MaxFrameSizeExceeded {
                            size,
                            max: self.max_inbound,
                        });
                    }
                }
                return Ok(None);
            }
            Unwrapped::Frame(raw) => {
                if raw.frame_len > self.max_inbound {
                    return Err(Error::MaxFrameSizeExceeded {
                        size: raw.frame_len,
                        max: self.max_inbound,
                    });
                }
                if raw.frame_type != FRAME_TYPE_AMQP {
                    return Err(Error::NotImplemented);
                }

                let body = if raw.performative.is_empty() {
                    FrameBody::Empty
                } else {
                    let (performative, _) = Performative::decode(raw.performative)?;
                    FrameBody::from_performative(performative, Bytes::copy_from_slice(raw.payload))
                };
                (Frame::new(raw.channel, body), raw.frame_len)
            }
        };

        src.advance(frame_len);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use ferrum_types::{
        definitions::Handle,
        performatives::{Close, Transfer},
    };
    use tokio_util::codec::{Decoder, Encoder};

    use super::{split_transfer, Frame, FrameBody, FrameCodec};
    use crate::frames::Error;

    #[test]
    fn test_encoding_empty_frame() {
        let mut codec = FrameCodec::new(512);
        let mut dst = BytesMut::new();
        codec.encode(Frame::empty(), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0, 0, 0, 8, 2, 0, 0, 0]);
    }

    #[test]
    fn test_decode_empty_frame() {
        let mut codec = FrameCodec::new(512);
        let mut src = BytesMut::from(&[0, 0, 0, 8, 0x02, 0x00, 0x00, 0x00][..]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame, Frame::empty());
        assert!(src.is_empty());
    }

    #[test]
    fn partial_frame_is_kept() {
        let mut codec = FrameCodec::new(512);
        let mut full = BytesMut::new();
        codec.encode(Frame::new(1u16, Close { error: None }), &mut full).unwrap();

        let mut src = BytesMut::from(&full[..full.len() - 1]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert_eq!(src.len(), full.len() - 1);

        src.extend_from_slice(&full[full.len() - 1..]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.channel, 1);
        assert_eq!(frame.body, FrameBody::Close(Close { error: None }));
    }

    #[test]
    fn oversized_inbound_frame_is_rejected() {
        let mut codec = FrameCodec::new(512);
        let mut src = BytesMut::from(&[0, 0, 0x10, 0, 2, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(Error::MaxFrameSizeExceeded { size: 4096, max: 512 })
        ));
    }

    #[test]
    fn sasl_frames_are_not_implemented() {
        let mut codec = FrameCodec::new(512);
        let mut src = BytesMut::from(&[0, 0, 0, 8, 2, 1, 0, 0][..]);
        assert!(matches!(codec.decode(&mut src), Err(Error::NotImplemented)));
    }

    #[test]
    fn large_transfer_is_split() {
        let mut transfer = Transfer::new(Handle(0));
        transfer.delivery_id = Some(3);
        transfer.delivery_tag = Some(Bytes::from_static(b"t"));
        transfer.settled = Some(false);
        let payload = Bytes::from(vec![7u8; 2000]);

        let frames = split_transfer(transfer.clone(), payload.clone(), 512).unwrap();
        assert!(frames.len() > 1);
        let (head, tail) = frames.split_at(frames.len() - 1);
        assert!(head.iter().all(|(t, _)| t.more));
        assert!(!tail[0].0.more);
        assert_eq!(frames[0].0.delivery_id, Some(3));
        assert!(frames[1..].iter().all(|(t, _)| t.delivery_id.is_none()));

        let joined: Vec<u8> = frames.iter().flat_map(|(_, p)| p.iter().copied()).collect();
        assert_eq!(joined, payload.to_vec());

        let mut codec = FrameCodec::new(512);
        let mut dst = BytesMut::new();
        codec
            .encode(
                Frame::new(0u16, FrameBody::Transfer { performative: transfer, payload }),
                &mut dst,
            )
            .unwrap();

        let mut count = 0;
        while let Some(frame) = codec.decode(&mut dst).unwrap() {
            assert!(matches!(frame.body, FrameBody::Transfer { .. }));
            count += 1;
        }
        assert_eq!(count, frames.len());
    }

    #[test]
    fn small_transfer_is_not_split() {
        let transfer = Transfer::new(Handle(2));
        let frames = split_transfer(transfer.clone(), Bytes::from_static(b"abc"), 512).unwrap();
        assert_eq!(frames, vec![(transfer, Bytes::from_static(b"abc"))]);
    }
}
