//! Shared outbound byte buffer of a connection

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio_util::codec::Encoder;

use crate::frames::{self, Frame, FrameCodec};

/// Bytes waiting to be written to the transport
///
/// Every clone refers to the same buffer. Frames are encoded and appended while the lock is
/// held, so concurrent writers never interleave partial frames.
#[derive(Debug, Clone, Default)]
pub struct OutgoingBuffer {
    inner: Arc<Mutex<BytesMut>>,
}

impl OutgoingBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes such as a protocol header
    pub fn put_slice(&self, bytes: &[u8]) {
        self.inner.lock().extend_from_slice(bytes);
    }

    /// Encode a frame and append it
    ///
    /// On error nothing of the frame is left in the buffer.
    pub(crate) fn put_frame(&self, codec: &mut FrameCodec, frame: Frame) -> Result<(), frames::Error> {
        let mut buf = self.inner.lock();
        let mark = buf.len();
        codec.encode(frame, &mut buf).map_err(|err| {
            buf.truncate(mark);
            err
        })
    }

    /// Take everything buffered so far
    pub fn take(&self) -> Bytes {
        self.inner.lock().split().freeze()
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ferrum_types::performatives::Close;

    use super::OutgoingBuffer;
    use crate::frames::{Error, Frame, FrameCodec};

    #[test]
    fn clones_share_the_buffer() {
        let buffer = OutgoingBuffer::new();
        let writer = buffer.clone();
        writer.put_slice(b"AMQP\x00\x01\x00\x00");
        assert_eq!(buffer.len(), 8);
        assert_eq!(&buffer.take()[..], b"AMQP\x00\x01\x00\x00");
        assert!(writer.is_empty());
    }

    #[test]
    fn failed_encode_leaves_no_partial_frame() {
        let buffer = OutgoingBuffer::new();
        let mut codec = FrameCodec::new(8);
        let result = buffer.put_frame(&mut codec, Frame::new(0u16, Close { error: None }));
        assert!(matches!(result, Err(Error::MaxFrameSizeExceeded { .. })));
        assert!(buffer.is_empty());
    }
}
