use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};
use crate::OpenRgbResult;

impl DeserFromBuf for String {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self>
    where
        Self: Sized,
    {
        let len = buf.read_u16()? as usize;
        let bytes = buf.read_bytes(len)?;
        // declared length includes the NUL terminator
        let Some((&0, chars)) = bytes.split_last() else {
            return Err(DecodeError::BadString(format!(
                "string of {len} bytes is not NUL terminated"
            ))
            .into());
        };
        String::from_utf8(chars.to_vec()).map_err(|e| {
            DecodeError::BadString(format!("failed decoding string as UTF-8: {e}")).into()
        })
    }
}

impl SerToBuf for String {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        self.as_str().serialize(buf)
    }
}

impl SerToBuf for &str {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u16(self.len() as u16 + 1); // +1 for null terminator
        buf.write_value(&RawString(self))?;
        Ok(())
    }
}

/// A raw string that does not include the length in its serialized form.
///
/// If the length is needed, serialize a `&str` or `String` instead.
#[doc(hidden)]
pub struct RawString<'a>(pub &'a str);

impl SerToBuf for RawString<'_> {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_slice(self.0.as_bytes());
        buf.write_u8(b'\0');
        Ok(())
    }
}

/// Parses an unprefixed NUL-terminated payload (client name, profile name).
///
/// Tolerates a missing terminator: everything up to the first NUL, or the
/// whole payload, is taken.
pub(crate) fn parse_raw_string(data: &[u8]) -> OpenRgbResult<String> {
    let chars = match data.iter().position(|b| *b == 0) {
        Some(idx) => &data[..idx],
        None => data,
    };
    String::from_utf8(chars.to_vec())
        .map_err(|e| DecodeError::BadString(format!("failed decoding string as UTF-8: {e}")).into())
}
