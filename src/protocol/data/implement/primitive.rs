use crate::OpenRgbResult;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

impl DeserFromBuf for () {
    fn deserialize(_buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        Ok(())
    }
}

impl SerToBuf for () {
    fn serialize(&self, _buf: &mut WriteMessage) -> OpenRgbResult<()> {
        Ok(())
    }
}

impl DeserFromBuf for u8 {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        buf.read_u8()
    }
}

impl SerToBuf for u8 {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u8(*self);
        Ok(())
    }
}

impl DeserFromBuf for u16 {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        buf.read_u16()
    }
}

impl SerToBuf for u16 {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u16(*self);
        Ok(())
    }
}

impl DeserFromBuf for u32 {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        buf.read_u32()
    }
}

impl SerToBuf for u32 {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u32(*self);
        Ok(())
    }
}

impl DeserFromBuf for i32 {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let x = buf.read_u32()?;
        Ok(x as i32)
    }
}

impl SerToBuf for i32 {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u32(*self as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::PROTOCOL_VERSION;
    use crate::protocol::{ReceivedMessage, WriteMessage};

    #[test]
    fn test_read_void() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[0, 1, 2, 3, 4], PROTOCOL_VERSION);
        let _: () = msg.read_value()?;
        assert_eq!(msg.remaining(), 5);
        Ok(())
    }

    #[test]
    fn test_read_u8() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[0, 1, 2, 3, 4], PROTOCOL_VERSION);
        assert_eq!(msg.read_u8()?, 0);
        assert_eq!(msg.read_value::<u8>()?, 1);
        Ok(())
    }

    #[test]
    fn test_read_u16() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[0, 1, 2, 3, 4], PROTOCOL_VERSION);
        assert_eq!(msg.read_u16()?, u16::from_le_bytes([0, 1]));
        assert_eq!(msg.read_value::<u16>()?, u16::from_le_bytes([2, 3]));
        assert!(msg.read_value::<u16>().is_err()); // not enough data
        Ok(())
    }

    #[test]
    fn test_read_u32() -> Result<(), Box<dyn Error>> {
        let mut msg = ReceivedMessage::new(&[0, 1, 2, 3, 4], PROTOCOL_VERSION);
        assert_eq!(msg.read_u32()?, u32::from_le_bytes([0, 1, 2, 3]));
        assert!(msg.read_value::<u32>().is_err()); // not enough data
        Ok(())
    }

    #[test]
    fn test_i32_roundtrip() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(PROTOCOL_VERSION);
        buf.write_value(&-1337_i32)?;
        let mut msg = buf.to_received_msg();
        assert_eq!(msg.read_value::<i32>()?, -1337);
        Ok(())
    }
}
