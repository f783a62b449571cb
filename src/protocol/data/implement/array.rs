use std::mem::MaybeUninit;

use crate::OpenRgbResult;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};

impl<T: SerToBuf, const N: usize> SerToBuf for [T; N] {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        for item in self {
            item.serialize(buf)?;
        }
        Ok(())
    }
}

impl<T: DeserFromBuf, const N: usize> DeserFromBuf for [T; N] {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let mut arr = [const { MaybeUninit::<T>::uninit() }; N];

        for item in arr.iter_mut() {
            let d = T::deserialize(buf)?;
            item.write(d);
        }

        // the for loop either writes to every element of the array or returns an error
        unsafe { Ok(std::mem::transmute_copy(&arr)) }
    }
}

#[cfg(test)]
mod tests {
    use crate::PROTOCOL_VERSION;

    use super::*;

    #[test]
    fn test_read_array() {
        let mut message = ReceivedMessage::new(&[0, 1, 2, 3, 4, 5], PROTOCOL_VERSION);
        let arr: [u8; 3] = message.read_value().unwrap();
        assert_eq!(arr, [0, 1, 2]);
        let arr2: [u8; 3] = message.read_value().unwrap();
        assert_eq!(arr2, [3, 4, 5]);
    }

    #[test]
    fn test_write_array() {
        let mut buf = WriteMessage::new(PROTOCOL_VERSION);
        buf.write_value(&[9_u8, 8, 7]).unwrap();
        assert_eq!(buf.bytes(), &[9, 8, 7]);
    }
}
