use serde_json::{Value, json};

use crate::OpenRgbResult;
use crate::device::json::{json_str, json_u32};
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

/// A single LED.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Led {
    /// LED name.
    name: String,

    /// Device-specific LED value, opaque to the framework.
    value: u32,
}

impl Led {
    /// Creates an LED with a device-specific value.
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Returns the name of this LED.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device-specific value of this LED.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "value": self.value,
        })
    }

    pub(crate) fn from_json(value: &Value) -> OpenRgbResult<Self> {
        Ok(Self {
            name: json_str(value, "name")?,
            value: json_u32(value, "value")?,
        })
    }
}

impl DeserFromBuf for Led {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self>
    where
        Self: Sized,
    {
        Ok(Led {
            name: buf.read_value()?,
            value: buf.read_value()?,
        })
    }
}

impl SerToBuf for Led {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_value(&self.name)?;
        buf.write_u32(self.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::Led;
    use crate::protocol::WriteMessage;

    #[test]
    fn test_roundtrip() -> Result<(), Box<dyn Error>> {
        let led = Led::new("Key: A", 45);
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_value(&led)?;
        let mut msg = buf.to_received_msg();
        assert_eq!(msg.read_value::<Led>()?, led);
        Ok(())
    }

    #[test]
    fn test_json_roundtrip() -> Result<(), Box<dyn Error>> {
        let led = Led::new("Key: B", 7);
        assert_eq!(Led::from_json(&led.to_json())?, led);
        Ok(())
    }
}
