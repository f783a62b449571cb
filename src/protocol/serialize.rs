use crate::OpenRgbResult;
#[cfg(test)]
use crate::protocol::ReceivedMessage;

/// Serialize an object to a byte buffer.
pub(crate) trait SerToBuf {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()>;
}

impl<T: SerToBuf> SerToBuf for &T {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        (*self).serialize(buf)
    }
}

/// Byte buffer being written, tagged with the protocol version the recipient
/// negotiated. Codec impls consult the version to project away fields the
/// recipient does not understand.
pub(crate) struct WriteMessage {
    protocol_version: u32,
    buf: Vec<u8>,
}

impl std::fmt::Display for WriteMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WriteMessage (protocol: {}, len: {}): {:?}",
            self.protocol_version,
            self.buf.len(),
            &self.buf[..]
        )
    }
}

impl WriteMessage {
    pub fn new(protocol_version: u32) -> Self {
        Self::with_capacity(protocol_version, 8)
    }

    pub fn with_capacity(protocol_version: u32, capacity: usize) -> Self {
        Self {
            protocol_version,
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_slice(&mut self, slice: &[u8]) {
        self.buf.extend_from_slice(slice);
    }

    pub fn write_value<T: SerToBuf>(&mut self, value: &T) -> OpenRgbResult<()> {
        value.serialize(self)
    }

    /// Writes `value` preceded by a `u32` counting the bytes that follow the
    /// prefix. Decoders use the prefix to skip fields they do not know.
    pub fn write_len_prefixed<T: SerToBuf>(&mut self, value: &T) -> OpenRgbResult<()> {
        let mut inner = WriteMessage::with_capacity(self.protocol_version, 64);
        value.serialize(&mut inner)?;
        self.write_u32(inner.len() as u32);
        self.write_slice(inner.bytes());
        Ok(())
    }

    pub fn push_value<T: SerToBuf>(&mut self, value: &T) -> OpenRgbResult<&mut Self> {
        self.write_value(value)?;
        Ok(self)
    }

    #[cfg(test)]
    pub fn to_received_msg(&self) -> ReceivedMessage<'_> {
        ReceivedMessage::new(&self.buf, self.protocol_version)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::WriteMessage;

    #[test]
    fn test_len_prefix_excludes_itself() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_len_prefixed(&(1_u32, 2_u32))?;

        let mut msg = buf.to_received_msg();
        assert_eq!(msg.read_u32()?, 8);
        assert_eq!(msg.read_u32()?, 1);
        assert_eq!(msg.read_u32()?, 2);
        Ok(())
    }
}
