use crate::OpenRgbResult;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

/// RGB controller device type.
///
/// The discriminant order is part of the API; new device types get inserted
/// before `Unknown`, so an unrecognized value decodes to [`DeviceType::Unknown`]
/// instead of failing.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub enum DeviceType {
    /// Motherboard.
    Motherboard = 0,
    /// DRAM
    DRam = 1,
    /// GPU
    Gpu = 2,
    /// Cooler
    Cooler = 3,
    /// LED strip
    LEDStrip = 4,
    /// Keyboard
    Keyboard = 5,
    /// Mouse
    Mouse = 6,
    /// Mouse mat
    MouseMat = 7,
    /// Headset
    Headset = 8,
    /// Headset stand
    HeadsetStand = 9,
    /// Gamepad
    Gamepad = 10,
    /// Light
    Light = 11,
    /// Speaker
    Speaker = 12,
    /// Virtual
    Virtual = 13,
    /// Storage
    Storage = 14,
    /// Case
    Case = 15,
    /// Microphone
    Microphone = 16,
    /// Accessory
    Accessory = 17,
    /// Keypad
    Keypad = 18,
    /// Laptop
    Laptop = 19,
    /// Monitor
    Monitor = 20,
    /// Unknown
    Unknown = 21,
}

impl From<u32> for DeviceType {
    fn from(value: u32) -> Self {
        match value {
            0 => DeviceType::Motherboard,
            1 => DeviceType::DRam,
            2 => DeviceType::Gpu,
            3 => DeviceType::Cooler,
            4 => DeviceType::LEDStrip,
            5 => DeviceType::Keyboard,
            6 => DeviceType::Mouse,
            7 => DeviceType::MouseMat,
            8 => DeviceType::Headset,
            9 => DeviceType::HeadsetStand,
            10 => DeviceType::Gamepad,
            11 => DeviceType::Light,
            12 => DeviceType::Speaker,
            13 => DeviceType::Virtual,
            14 => DeviceType::Storage,
            15 => DeviceType::Case,
            16 => DeviceType::Microphone,
            17 => DeviceType::Accessory,
            18 => DeviceType::Keypad,
            19 => DeviceType::Laptop,
            20 => DeviceType::Monitor,
            _ => DeviceType::Unknown,
        }
    }
}

impl From<DeviceType> for u32 {
    fn from(value: DeviceType) -> Self {
        value as u32
    }
}

impl DeserFromBuf for DeviceType {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let raw = buf.read_u32()?;
        Ok(DeviceType::from(raw))
    }
}

impl SerToBuf for DeviceType {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_u32(*self as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::DeviceType;
    use crate::protocol::WriteMessage;

    #[test]
    fn test_read_001() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        let mut msg = buf.push_value(&3_u32)?.to_received_msg();

        assert_eq!(msg.read_value::<DeviceType>()?, DeviceType::Cooler);
        Ok(())
    }

    #[test]
    fn test_write_001() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        let mut msg = buf.push_value(&DeviceType::Cooler)?.to_received_msg();
        assert_eq!(msg.read_value::<u32>()?, 3);
        Ok(())
    }

    #[test]
    fn test_unrecognized_value_decodes_to_unknown() -> Result<(), Box<dyn Error>> {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        let mut msg = buf.push_value(&999_u32)?.to_received_msg();
        assert_eq!(msg.read_value::<DeviceType>()?, DeviceType::Unknown);
        Ok(())
    }
}
