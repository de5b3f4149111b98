//! Reader over encoded bytes

use crate::error::Error;

/// A cursor over a slice of bytes
#[derive(Debug, Clone)]
pub struct SliceReader<'s> {
    slice: &'s [u8],
    position: usize,
}

impl<'s> SliceReader<'s> {
    /// Creates a new slice reader
    pub fn new(slice: &'s [u8]) -> Self {
        Self { slice, position: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left
    pub fn remaining(&self) -> usize {
        self.slice.len() - self.position
    }

    /// Peek the next byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.slice.get(self.position).copied()
    }

    /// Consume the next byte
    pub fn next(&mut self) -> Result<u8, Error> {
        let byte = self.peek().ok_or(Error::UnexpectedEof)?;
        self.position += 1;
        Ok(byte)
    }

    /// Return a slice of the given length. If the internal slice doesn't have
    /// enough bytes, an `Err(_)` will be returned.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'s [u8], Error> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof);
        }
        let start = self.position;
        self.position += n;
        Ok(&self.slice[start..self.position])
    }

    /// Read exactly `N` bytes into an array
    pub fn read_const_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    /// Read a size or count field of one or four octets
    pub(crate) fn read_len(&mut self, four_octets: bool) -> Result<usize, Error> {
        if four_octets {
            Ok(u32::from_be_bytes(self.read_const_bytes()?) as usize)
        } else {
            Ok(self.next()? as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SliceReader;
    use crate::Error;

    const SHORT_BUFFER: &[u8] = &[0, 1, 2];

    #[test]
    fn test_peek_does_not_advance() {
        let reader = SliceReader::new(SHORT_BUFFER);
        assert_eq!(reader.peek(), Some(0));
        assert_eq!(reader.peek(), Some(0));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_next_until_eof() {
        let mut reader = SliceReader::new(SHORT_BUFFER);
        for expected in SHORT_BUFFER {
            assert_eq!(reader.next().unwrap(), *expected);
        }
        assert_eq!(reader.next(), Err(Error::UnexpectedEof));
        assert_eq!(reader.peek(), None);
    }

    #[test]
    fn test_read_const_bytes() {
        let mut reader = SliceReader::new(SHORT_BUFFER);
        let bytes: [u8; 2] = reader.read_const_bytes().unwrap();
        assert_eq!(bytes, [0, 1]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.read_const_bytes::<2>().is_err());
    }

    #[test]
    fn test_read_len() {
        let mut reader = SliceReader::new(&[0x05, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(reader.read_len(false).unwrap(), 5);
        assert_eq!(reader.read_len(true).unwrap(), 256);
    }
}
