//! Codec implementations for core/std types.

mod implement;

pub(crate) use implement::*;

/// Implements traits for C-style enums with discriminants. Following traits are implemented:
///
/// * `TryFrom<u32>` using given arguments
/// * `From<$enum> for u32` using given arguments
/// * `DeserFromBuf`
/// * `SerToBuf`
#[macro_export]
#[doc(hidden)]
macro_rules! impl_enum_discriminant {
    ($enum: tt, $($var:ident: $value:expr),+) => {
        impl TryFrom<u32> for $enum {
            type Error = $crate::OpenRgbError;

            fn try_from(value: u32) -> core::result::Result<Self, Self::Error> {
                match value {
                    $(
                        $value => Ok($enum::$var),
                    )+
                    _ => Err($crate::DecodeError::InvalidValue(format!(
                        "Unknown discriminant value {} for {}", value, stringify!($enum)
                    )).into())
                }
            }
        }

        impl From<$enum> for u32 {
            #[inline(always)]
            fn from(value: $enum) -> Self {
                u32::from(&value)
            }
        }

        impl<'a> From<&'a $enum> for u32 {
            #[inline(always)]
            fn from(value: &'a $enum) -> Self {
                match value {
                    $(
                        $enum::$var => $value,
                    )+
                }
            }
        }

        impl $crate::protocol::DeserFromBuf for $enum {
            fn deserialize(buf: &mut $crate::protocol::ReceivedMessage<'_>) -> $crate::OpenRgbResult<Self> {
                let raw = buf.read_u32()?;
                $enum::try_from(raw)
            }
        }

        impl $crate::protocol::SerToBuf for $enum {
            fn serialize(&self, buf: &mut $crate::protocol::WriteMessage) -> $crate::OpenRgbResult<()> {
                let num = u32::from(self);
                buf.write_u32(num);
                Ok(())
            }
        }
    }
}
