use crate::error::DecodeError;
use crate::OpenRgbResult;

/// Deserialize an object from a byte buffer.
pub(crate) trait DeserFromBuf {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self>
    where
        Self: Sized;
}

/// Byte buffer being read, tagged with the protocol version the sender used.
///
/// Reads never run past the end of the view: a `ReceivedMessage` obtained
/// through [`ReceivedMessage::sub_message`] is bounded by its length prefix,
/// so surplus bytes inside a prefixed region are skipped rather than parsed.
pub(crate) struct ReceivedMessage<'a> {
    protocol_version: u32,
    buf: &'a [u8],
    idx: usize,
}

impl std::fmt::Display for ReceivedMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Received (protocol: {}, offset: {}): {:?}",
            self.protocol_version,
            self.idx,
            self.available_buf()
        )
    }
}

impl<'a> ReceivedMessage<'a> {
    pub fn new(buf: &'a [u8], protocol_version: u32) -> Self {
        Self {
            protocol_version,
            buf,
            idx: 0,
        }
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.idx
    }

    fn available_buf(&self) -> &[u8] {
        &self.buf[self.idx..]
    }

    fn truncated(&self, size: usize) -> DecodeError {
        DecodeError::Truncated {
            offset: self.idx,
            needed: size - self.remaining(),
        }
    }

    /// Takes the next `len` bytes as raw data.
    pub fn read_bytes(&mut self, len: usize) -> OpenRgbResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.truncated(len).into());
        }
        let bytes = &self.buf[self.idx..self.idx + len];
        self.idx += len;
        Ok(bytes)
    }

    #[inline]
    pub fn read_u8(&mut self) -> OpenRgbResult<u8> {
        let b = self.read_bytes(size_of::<u8>())?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self) -> OpenRgbResult<u16> {
        let b = self.read_bytes(size_of::<u16>())?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> OpenRgbResult<u32> {
        let b = self.read_bytes(size_of::<u32>())?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_value<T: DeserFromBuf>(&mut self) -> OpenRgbResult<T> {
        T::deserialize(self)
    }

    /// Reads the next `n` values as type `T` from the buffer.
    ///
    /// If there's a `[len, [..data]]` format, use `read_value::<Vec<T>>()` instead.
    pub fn read_n_values<T: DeserFromBuf>(&mut self, n: usize) -> OpenRgbResult<Vec<T>> {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(T::deserialize(self)?);
        }
        Ok(values)
    }

    /// Splits off the next `len` bytes as an independent bounded message.
    ///
    /// The parent advances past the whole region, so anything the caller does
    /// not read from the sub-message is skipped. This is how length-prefixed
    /// descriptions stay forward compatible.
    pub fn sub_message(&mut self, len: usize) -> OpenRgbResult<ReceivedMessage<'a>> {
        if self.remaining() < len {
            return Err(DecodeError::BadLengthPrefix {
                declared: len as u32,
                available: self.remaining(),
            }
            .into());
        }
        let bytes = self.read_bytes(len)?;
        Ok(ReceivedMessage::new(bytes, self.protocol_version))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::PROTOCOL_VERSION;
    use crate::error::{DecodeError, OpenRgbError};

    use super::ReceivedMessage;

    #[test]
    fn test_read_primitives() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[0, 1, 2, 3, 4, 5, 6], PROTOCOL_VERSION);
        assert_eq!(msg.read_u8()?, 0);
        assert_eq!(msg.read_u16()?, u16::from_le_bytes([1, 2]));
        assert_eq!(msg.read_u32()?, u32::from_le_bytes([3, 4, 5, 6]));
        assert_eq!(msg.remaining(), 0);
        assert!(msg.read_u8().is_err());
        Ok(())
    }

    #[test]
    fn test_truncated_read_reports_missing_bytes() {
        let mut msg = ReceivedMessage::new(&[1, 2], PROTOCOL_VERSION);
        match msg.read_u32() {
            Err(OpenRgbError::Decode(DecodeError::Truncated { offset, needed })) => {
                assert_eq!(offset, 0);
                assert_eq!(needed, 2);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[test]
    fn test_sub_message_bounds_reads() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[1, 0, 0, 0, 2, 0, 0, 0, 9], PROTOCOL_VERSION);
        let mut sub = msg.sub_message(8)?;
        assert_eq!(sub.read_u32()?, 1);
        // second u32 of the region left unread: parent already skipped it
        assert_eq!(msg.read_u8()?, 9);
        assert!(sub.read_u32().is_ok());
        assert!(sub.read_u8().is_err());
        Ok(())
    }

    #[test]
    fn test_sub_message_rejects_overlong_prefix() {
        let mut msg = ReceivedMessage::new(&[1, 2, 3], PROTOCOL_VERSION);
        assert!(matches!(
            msg.sub_message(4),
            Err(OpenRgbError::Decode(DecodeError::BadLengthPrefix {
                declared: 4,
                available: 3
            }))
        ));
    }
}
