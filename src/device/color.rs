use rgb::RGB8;

use crate::OpenRgbResult;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

/// RGB controller color, aliased to [rgb] crate's [RGB8] type.
///
/// On the wire a color is 4 bytes: R, G, B and one padding byte. The packed
/// in-memory form used by profiles is `0x00BBGGRR`.
pub type Color = RGB8;

/// Packs a color into its `0x00BBGGRR` integer form.
pub fn color_to_packed(color: Color) -> u32 {
    (color.b as u32) << 16 | (color.g as u32) << 8 | color.r as u32
}

/// Unpacks a `0x00BBGGRR` integer into a color.
pub fn color_from_packed(raw: u32) -> Color {
    Color {
        r: (raw & 0xFF) as u8,
        g: ((raw >> 8) & 0xFF) as u8,
        b: ((raw >> 16) & 0xFF) as u8,
    }
}

impl DeserFromBuf for Color {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let r = buf.read_u8()?;
        let g = buf.read_u8()?;
        let b = buf.read_u8()?;
        let _ = buf.read_u8()?; // padding byte
        Ok(Color { r, g, b })
    }
}

impl SerToBuf for Color {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u8(self.r);
        buf.write_u8(self.g);
        buf.write_u8(self.b);
        buf.write_u8(0u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenRgbResult;
    use crate::protocol::WriteMessage;

    #[test]
    fn test_read_001() -> OpenRgbResult<()> {
        let mut buf = WriteMessage::new(0);
        buf.write_slice(&[37_u8, 54_u8, 126_u8, 0_u8]);
        let mut msg = buf.to_received_msg();

        assert_eq!(
            msg.read_value::<Color>()?,
            Color {
                r: 37,
                g: 54,
                b: 126
            }
        );

        Ok(())
    }

    #[test]
    fn test_write_001() -> OpenRgbResult<()> {
        let mut buf = WriteMessage::new(0);
        let c = Color {
            r: 37,
            g: 54,
            b: 126,
        };
        buf.write_value(&c)?;
        let mut msg = buf.to_received_msg();

        assert_eq!(&msg.read_n_values::<u8>(4)?, &[37_u8, 54_u8, 126_u8, 0_u8]);

        Ok(())
    }

    #[test]
    fn test_packed_roundtrip() {
        let c = Color {
            r: 0x11,
            g: 0x22,
            b: 0x33,
        };
        assert_eq!(color_to_packed(c), 0x0033_2211);
        assert_eq!(color_from_packed(0x0033_2211), c);
    }
}
