use serde_json::{Value, json};

use crate::OpenRgbResult;
use crate::device::json::{json_i32, json_str, json_u32};
use crate::device::zone::ZoneType;
use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

/// A named contiguous sub-range of a zone, used for user-defined sub-zones.
///
/// Segments are flat; they do not nest. `start_idx` is relative to the
/// containing zone.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SegmentData {
    name: String,
    /// Segment type matches its parent's zone type in practice.
    seg_type: ZoneType,
    start_idx: u32,
    leds_count: u32,
}

impl SegmentData {
    /// Creates a linear segment covering `[start_idx, start_idx + leds_count)`
    /// of its zone.
    pub fn new(name: impl Into<String>, start_idx: u32, leds_count: u32) -> Self {
        Self {
            name: name.into(),
            seg_type: ZoneType::Linear,
            start_idx,
            leds_count,
        }
    }

    /// Returns the name of this segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of LEDs in this segment.
    pub fn leds_count(&self) -> u32 {
        self.leds_count
    }

    /// Returns the offset of this segment in the zone. This is its starting index.
    pub fn start_idx(&self) -> u32 {
        self.start_idx
    }

    /// Returns the type of this segment.
    pub fn seg_type(&self) -> ZoneType {
        self.seg_type
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "type": u32::from(self.seg_type) as i32,
            "start_idx": self.start_idx,
            "leds_count": self.leds_count,
        })
    }

    pub(crate) fn from_json(value: &Value) -> OpenRgbResult<Self> {
        Ok(Self {
            name: json_str(value, "name")?,
            seg_type: ZoneType::try_from(json_i32(value, "type")? as u32)?,
            start_idx: json_u32(value, "start_idx")?,
            leds_count: json_u32(value, "leds_count")?,
        })
    }
}

impl DeserFromBuf for SegmentData {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        if buf.protocol_version() < 4 {
            return Err(DecodeError::InvalidValue(
                "segments are not carried before protocol version 4".to_string(),
            )
            .into());
        }

        let name = buf.read_value()?;
        let seg_type = buf.read_value()?;
        let start_idx = buf.read_value()?;
        let leds_count = buf.read_value()?;

        Ok(Self {
            name,
            seg_type,
            start_idx,
            leds_count,
        })
    }
}

impl SerToBuf for SegmentData {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        if buf.protocol_version() < 4 {
            return Err(crate::OpenRgbError::Protocol(
                "segments are not carried before protocol version 4".to_string(),
            ));
        }
        buf.write_value(&self.name)?;
        buf.write_value(&self.seg_type)?;
        buf.write_value(&self.start_idx)?;
        buf.write_value(&self.leds_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::SegmentData;
    use crate::protocol::WriteMessage;

    #[test]
    fn test_roundtrip_v4() -> Result<(), Box<dyn Error>> {
        let segment = SegmentData::new("Top half", 0, 10);
        let mut buf = WriteMessage::new(4);
        buf.write_value(&segment)?;
        let mut msg = buf.to_received_msg();
        assert_eq!(msg.read_value::<SegmentData>()?, segment);
        Ok(())
    }

    #[test]
    fn test_rejected_before_v4() {
        let segment = SegmentData::new("Top half", 0, 10);
        let mut buf = WriteMessage::new(3);
        assert!(buf.write_value(&segment).is_err());
    }

    #[test]
    fn test_json_roundtrip() -> Result<(), Box<dyn Error>> {
        let segment = SegmentData::new("Bottom half", 10, 10);
        assert_eq!(SegmentData::from_json(&segment.to_json())?, segment);
        Ok(())
    }
}
