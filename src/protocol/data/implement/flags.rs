use flagset::FlagSet;

use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, SerToBuf};

impl<T> DeserFromBuf for FlagSet<T>
where
    T: flagset::Flags<Type = u32>,
{
    fn deserialize(buf: &mut crate::protocol::ReceivedMessage<'_>) -> crate::OpenRgbResult<Self> {
        let value = buf.read_u32()?;
        FlagSet::<T>::new(value).map_err(|e| {
            DecodeError::InvalidValue(format!(
                "received invalid flag: {value:#032b} ({e}) (for {})",
                std::any::type_name::<T>()
            ))
            .into()
        })
    }
}

impl<T> SerToBuf for FlagSet<T>
where
    T: flagset::Flags<Type = u32>,
{
    fn serialize(&self, buf: &mut crate::protocol::WriteMessage) -> crate::OpenRgbResult<()> {
        buf.write_u32(self.bits());
        Ok(())
    }
}
