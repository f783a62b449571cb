use crate::protocol::{SerToBuf, WriteMessage};

impl<T: SerToBuf> SerToBuf for &[T] {
    fn serialize(&self, buf: &mut WriteMessage) -> crate::OpenRgbResult<()> {
        let len = u16::try_from(self.len()).map_err(|e| {
            crate::OpenRgbError::Protocol(format!("slice is too large to encode: {e}"))
        })?;
        buf.write_u16(len);
        for item in self.iter() {
            item.serialize(buf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::protocol::WriteMessage;

    #[test]
    fn test_write_slice() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        let values: &[u8] = &[1, 2, 3];
        buf.write_value(&values)?;
        let mut msg = buf.to_received_msg();

        assert_eq!(msg.read_value::<Vec<u8>>()?, vec![1, 2, 3]);
        Ok(())
    }
}
