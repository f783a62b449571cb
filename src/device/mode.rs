use flagset::{FlagSet, flags};
use serde_json::{Value, json};

use crate::device::color::{Color, color_from_packed, color_to_packed};
use crate::device::json::{json_array, json_i32, json_str, json_u32};
use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};
use crate::{OpenRgbError, OpenRgbResult, impl_enum_discriminant};

flags! {
    /// RGB controller mode flags.
    ///
    /// See [Open SDK documentation](https://gitlab.com/CalcProgrammer1/OpenRGB/-/wikis/OpenRGB-SDK-Documentation) for more information.
    pub enum ModeFlag: u32 {
        /// Mode has speed parameter.
        HasSpeed = 1 << 0,

        /// Mode has left/right parameter.
        HasDirectionLR = 1 << 1,

        /// Mode has up/down parameter.
        HasDirectionUD = 1 << 2,

        /// Mode has horiz/vert parameter.
        HasDirectionHV = 1 << 3,

        /// Mode has direction parameter.
        HasDirection = (ModeFlag::HasDirectionLR | ModeFlag::HasDirectionUD | ModeFlag::HasDirectionHV).bits(),

        /// Mode has brightness parameter.
        HasBrightness = 1 << 4,

        /// Mode has per-LED colors.
        HasPerLEDColor = 1 << 5,

        /// Mode has mode specific colors.
        HasModeSpecificColor = 1 << 6,

        /// Mode has random color option.
        HasRandomColor = 1 << 7,

        /// Mode can manually be saved.
        ManualSave = 1 << 8,

        /// Mode automatically saves.
        AutomaticSave = 1 << 9,
    }
}

/// Direction for [ModeData].
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub enum Direction {
    /// Left direction.
    #[default]
    Left = 0,

    /// Right direction.
    Right = 1,

    /// Up direction.
    Up = 2,

    /// Down direction.
    Down = 3,

    /// Horizontal direction.
    Horizontal = 4,

    /// Vertical direction.
    Vertical = 5,
}

impl_enum_discriminant!(
    Direction,
    Left: 0,
    Right: 1,
    Up: 2,
    Down: 3,
    Horizontal: 4,
    Vertical: 5
);

/// RGB controller color mode.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub enum ColorMode {
    /// No color mode.
    #[default]
    None = 0,

    /// Per LED colors.
    PerLED = 1,

    /// Mode specific colors.
    ModeSpecific = 2,

    /// Random colors.
    Random = 3,
}

impl_enum_discriminant!(ColorMode, None: 0, PerLED: 1, ModeSpecific: 2, Random: 3);

impl ColorMode {
    /// The mode flag that has to be set for this color mode to be selectable.
    fn required_flag(self) -> Option<ModeFlag> {
        match self {
            ColorMode::None => None,
            ColorMode::PerLED => Some(ModeFlag::HasPerLEDColor),
            ColorMode::ModeSpecific => Some(ModeFlag::HasModeSpecificColor),
            ColorMode::Random => Some(ModeFlag::HasRandomColor),
        }
    }
}

/// A lighting program (static, breathing, rainbow, ...) with its parameters.
///
/// Speed, brightness and direction are meaningful only when the matching
/// [`ModeFlag`] is set; setters reject writes the flags do not allow.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ModeData {
    /// Mode name.
    name: String,

    /// Device specific mode value.
    value: i32,

    /// Mode flags set.
    flags: FlagSet<ModeFlag>,

    /// Mode minimum speed.
    speed_min: u32,

    /// Mode maximum speed.
    speed_max: u32,

    /// Mode speed.
    speed: u32,

    /// Mode minimum brightness. Carried on the wire from protocol version 3.
    brightness_min: u32,

    /// Mode maximum brightness. Carried on the wire from protocol version 3.
    brightness_max: u32,

    /// Mode brightness. Carried on the wire from protocol version 3.
    brightness: u32,

    /// Minimum number of mode colors. Carried on the wire from protocol version 3.
    colors_min: u32,

    /// Maximum number of mode colors. Carried on the wire from protocol version 3.
    colors_max: u32,

    /// Mode direction.
    direction: Direction,

    /// Mode color mode.
    color_mode: ColorMode,

    /// Mode-specific colors.
    colors: Vec<Color>,
}

impl ModeData {
    /// Creates a mode. Parameter ranges come in through the `with_*` builders.
    pub fn new(name: impl Into<String>, value: i32, flags: impl Into<FlagSet<ModeFlag>>) -> Self {
        Self {
            name: name.into(),
            value,
            flags: flags.into(),
            speed_min: 0,
            speed_max: 0,
            speed: 0,
            brightness_min: 0,
            brightness_max: 0,
            brightness: 0,
            colors_min: 0,
            colors_max: 0,
            direction: Direction::default(),
            color_mode: ColorMode::default(),
            colors: Vec::new(),
        }
    }

    /// Sets the speed range and current speed.
    pub fn with_speed(mut self, min: u32, max: u32, speed: u32) -> Self {
        self.speed_min = min;
        self.speed_max = max;
        self.speed = speed;
        self
    }

    /// Sets the brightness range and current brightness.
    pub fn with_brightness(mut self, min: u32, max: u32, brightness: u32) -> Self {
        self.brightness_min = min;
        self.brightness_max = max;
        self.brightness = brightness;
        self
    }

    /// Sets the mode color bounds and current colors.
    pub fn with_colors(mut self, min: u32, max: u32, colors: Vec<Color>) -> Self {
        self.colors_min = min;
        self.colors_max = max;
        self.colors = colors;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the color mode.
    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    /// Returns the name of this mode.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device-specific value of this mode.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Returns the flags of this mode.
    pub fn flags(&self) -> FlagSet<ModeFlag> {
        self.flags
    }

    /// Returns the speed setting of this mode.
    ///
    /// If `ModeFlag::HasSpeed` is not set, returns `None`.
    pub fn speed(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasSpeed)
            .then_some(self.speed)
    }

    /// Returns the minimum speed setting of this mode.
    pub fn speed_min(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasSpeed)
            .then_some(self.speed_min)
    }

    /// Returns the maximum speed setting of this mode.
    pub fn speed_max(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasSpeed)
            .then_some(self.speed_max)
    }

    /// Sets the speed of this mode.
    ///
    /// Rejected if the mode has no speed parameter or the value is outside
    /// `[speed_min, speed_max]`; the mode is left unchanged.
    pub fn set_speed(&mut self, speed: u32) -> OpenRgbResult<()> {
        if !self.flags.contains(ModeFlag::HasSpeed) {
            return Err(OpenRgbError::Invariant(format!(
                "mode '{}' has no speed parameter",
                self.name
            )));
        }
        if !(self.speed_min <= speed && speed <= self.speed_max) {
            return Err(OpenRgbError::Invariant(format!(
                "speed {speed} outside [{}, {}]",
                self.speed_min, self.speed_max
            )));
        }
        self.speed = speed;
        Ok(())
    }

    /// Returns the brightness setting of this mode.
    ///
    /// If `ModeFlag::HasBrightness` is not set, returns `None`.
    pub fn brightness(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasBrightness)
            .then_some(self.brightness)
    }

    /// Returns the minimum brightness setting of this mode.
    pub fn brightness_min(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasBrightness)
            .then_some(self.brightness_min)
    }

    /// Returns the maximum brightness setting of this mode.
    pub fn brightness_max(&self) -> Option<u32> {
        self.flags
            .contains(ModeFlag::HasBrightness)
            .then_some(self.brightness_max)
    }

    /// Sets the brightness of this mode, bounds-checked like [`Self::set_speed`].
    pub fn set_brightness(&mut self, brightness: u32) -> OpenRgbResult<()> {
        if !self.flags.contains(ModeFlag::HasBrightness) {
            return Err(OpenRgbError::Invariant(format!(
                "mode '{}' has no brightness parameter",
                self.name
            )));
        }
        if !(self.brightness_min <= brightness && brightness <= self.brightness_max) {
            return Err(OpenRgbError::Invariant(format!(
                "brightness {brightness} outside [{}, {}]",
                self.brightness_min, self.brightness_max
            )));
        }
        self.brightness = brightness;
        Ok(())
    }

    /// Returns the direction of this mode.
    ///
    /// If no direction flag is set, returns `None`.
    pub fn direction(&self) -> Option<Direction> {
        self.flags
            .contains(ModeFlag::HasDirection)
            .then_some(self.direction)
    }

    /// Sets the direction of this mode. Rejected if the mode carries no
    /// direction flag.
    pub fn set_direction(&mut self, direction: Direction) -> OpenRgbResult<()> {
        if (self.flags & ModeFlag::HasDirection).is_empty() {
            return Err(OpenRgbError::Invariant(format!(
                "mode '{}' has no direction parameter",
                self.name
            )));
        }
        self.direction = direction;
        Ok(())
    }

    /// Returns the color mode of this mode.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Sets the color mode. Rejected unless the matching flag is set.
    pub fn set_color_mode(&mut self, color_mode: ColorMode) -> OpenRgbResult<()> {
        if let Some(flag) = color_mode.required_flag() {
            if !self.flags.contains(flag) {
                return Err(OpenRgbError::Invariant(format!(
                    "mode '{}' does not support color mode {color_mode:?}",
                    self.name
                )));
            }
        }
        self.color_mode = color_mode;
        Ok(())
    }

    /// Returns the colors of this mode.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Returns the minimum number of colors for this mode.
    pub fn colors_min(&self) -> u32 {
        self.colors_min
    }

    /// Returns the maximum number of colors for this mode.
    pub fn colors_max(&self) -> u32 {
        self.colors_max
    }

    /// Replaces the mode colors. The new count must stay within
    /// `[colors_min, colors_max]`.
    pub fn set_colors(&mut self, colors: Vec<Color>) -> OpenRgbResult<()> {
        let count = colors.len() as u32;
        if !(self.colors_min <= count && count <= self.colors_max) {
            return Err(OpenRgbError::Invariant(format!(
                "{count} mode colors outside [{}, {}]",
                self.colors_min, self.colors_max
            )));
        }
        self.colors = colors;
        Ok(())
    }

    /// Checks the mode invariants.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let count = self.colors.len() as u32;
        if !(self.colors_min <= count && count <= self.colors_max) {
            return Err(format!(
                "mode '{}' holds {count} colors outside [{}, {}]",
                self.name, self.colors_min, self.colors_max
            ));
        }
        if let Some(flag) = self.color_mode.required_flag() {
            if !self.flags.contains(flag) {
                return Err(format!(
                    "mode '{}' selects color mode {:?} without flag {flag:?}",
                    self.name, self.color_mode
                ));
            }
        }
        Ok(())
    }

    /// Projects away the fields a peer at `version` never sees, replacing
    /// them with the defaults the decoder assumes.
    pub(crate) fn project_to_version(&self, version: u32) -> Self {
        let mut mode = self.clone();
        if version < 3 {
            mode.brightness_min = 0;
            mode.brightness_max = 0;
            mode.brightness = 0;
            mode.colors_min = 0;
            mode.colors_max = mode.colors.len() as u32;
        }
        mode
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "value": self.value,
            "flags": self.flags.bits(),
            "speed_min": self.speed_min,
            "speed_max": self.speed_max,
            "speed": self.speed,
            "brightness_min": self.brightness_min,
            "brightness_max": self.brightness_max,
            "brightness": self.brightness,
            "colors_min": self.colors_min,
            "colors_max": self.colors_max,
            "direction": u32::from(self.direction),
            "color_mode": u32::from(self.color_mode),
            "colors": self.colors.iter().map(|c| color_to_packed(*c)).collect::<Vec<u32>>(),
        })
    }

    pub(crate) fn from_json(value: &Value) -> OpenRgbResult<Self> {
        let colors = json_array(value, "colors")?
            .iter()
            .map(|c| {
                c.as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .map(color_from_packed)
                    .ok_or_else(|| {
                        DecodeError::InvalidValue("mode color is not a packed u32".to_string())
                    })
            })
            .collect::<Result<Vec<Color>, _>>()?;
        let flags = FlagSet::new(json_u32(value, "flags")?)
            .map_err(|e| DecodeError::InvalidValue(format!("invalid mode flags: {e}")))?;
        Ok(Self {
            name: json_str(value, "name")?,
            value: json_i32(value, "value")?,
            flags,
            speed_min: json_u32(value, "speed_min")?,
            speed_max: json_u32(value, "speed_max")?,
            speed: json_u32(value, "speed")?,
            brightness_min: json_u32(value, "brightness_min")?,
            brightness_max: json_u32(value, "brightness_max")?,
            brightness: json_u32(value, "brightness")?,
            colors_min: json_u32(value, "colors_min")?,
            colors_max: json_u32(value, "colors_max")?,
            direction: Direction::try_from(json_u32(value, "direction")?)?,
            color_mode: ColorMode::try_from(json_u32(value, "color_mode")?)?,
            colors,
        })
    }
}

impl DeserFromBuf for ModeData {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let v3 = buf.protocol_version() >= 3;
        let name = buf.read_value()?;
        let value = buf.read_value()?;
        let flags = buf.read_value()?;
        let speed_min = buf.read_value()?;
        let speed_max = buf.read_value()?;
        let colors_min = if v3 { buf.read_u32()? } else { 0 };
        let colors_max = if v3 { buf.read_u32()? } else { 0 };
        let speed = buf.read_value()?;
        let brightness_min = if v3 { buf.read_u32()? } else { 0 };
        let brightness_max = if v3 { buf.read_u32()? } else { 0 };
        let brightness = if v3 { buf.read_u32()? } else { 0 };
        let direction = buf.read_value::<Direction>()?;
        let color_mode = buf.read_value()?;
        let colors = buf.read_value::<Vec<Color>>()?;

        Ok(ModeData {
            name,
            value,
            flags,
            speed_min,
            speed_max,
            speed,
            brightness_min,
            brightness_max,
            brightness,
            colors_min,
            colors_max: if v3 { colors_max } else { colors.len() as u32 },
            direction,
            color_mode,
            colors,
        })
    }
}

impl SerToBuf for ModeData {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        let v3 = buf.protocol_version() >= 3;
        buf.write_value(&self.name)?;
        buf.write_value(&self.value)?;
        buf.write_value(&self.flags)?;
        buf.write_u32(self.speed_min);
        buf.write_u32(self.speed_max);
        if v3 {
            buf.write_u32(self.colors_min);
            buf.write_u32(self.colors_max);
        }
        buf.write_u32(self.speed);
        if v3 {
            buf.write_u32(self.brightness_min);
            buf.write_u32(self.brightness_max);
            buf.write_u32(self.brightness);
        }
        buf.write_value(&self.direction)?;
        buf.write_value(&self.color_mode)?;
        buf.write_value(&self.colors)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::protocol::WriteMessage;
    use ModeFlag::*;

    fn breathing_mode() -> ModeData {
        ModeData::new("Breathing", 2, HasSpeed | HasBrightness | HasModeSpecificColor)
            .with_speed(10, 1000, 500)
            .with_brightness(0, 255, 128)
            .with_colors(1, 2, vec![Color { r: 255, g: 0, b: 0 }])
            .with_color_mode(ColorMode::ModeSpecific)
    }

    #[test]
    fn test_roundtrip_v4() -> Result<(), Box<dyn Error>> {
        let mode = breathing_mode();
        let mut buf = WriteMessage::new(4);
        buf.write_value(&mode)?;
        let mut msg = buf.to_received_msg();
        assert_eq!(msg.read_value::<ModeData>()?, mode);
        Ok(())
    }

    #[test]
    fn test_roundtrip_v0_projects_brightness_away() -> Result<(), Box<dyn Error>> {
        let mode = breathing_mode();
        let mut buf = WriteMessage::new(0);
        buf.write_value(&mode)?;
        let mut msg = buf.to_received_msg();
        let decoded = msg.read_value::<ModeData>()?;

        assert_eq!(decoded, mode.project_to_version(0));
        assert_eq!(decoded.brightness(), Some(0));
        assert_eq!(decoded.speed(), Some(500));
        Ok(())
    }

    #[test]
    fn test_set_speed_bounds() {
        let mut mode = breathing_mode();
        assert!(mode.set_speed(9).is_err());
        assert!(mode.set_speed(1001).is_err());
        assert!(mode.set_speed(10).is_ok());
        assert_eq!(mode.speed(), Some(10));
    }

    #[test]
    fn test_set_speed_requires_flag() {
        let mut mode = ModeData::new("Static", 0, FlagSet::default());
        assert!(mode.set_speed(1).is_err());
        assert_eq!(mode.speed(), None);
    }

    #[test]
    fn test_set_color_mode_requires_flag() {
        let mut mode = breathing_mode();
        assert!(mode.set_color_mode(ColorMode::PerLED).is_err());
        assert!(mode.set_color_mode(ColorMode::None).is_ok());
        assert!(mode.set_color_mode(ColorMode::ModeSpecific).is_ok());
    }

    #[test]
    fn test_set_colors_bounds() {
        let mut mode = breathing_mode();
        assert!(mode.set_colors(vec![]).is_err());
        assert!(
            mode.set_colors(vec![Color { r: 0, g: 255, b: 0 }, Color { r: 0, g: 0, b: 255 }])
                .is_ok()
        );
        assert!(
            mode.set_colors(vec![Color { r: 1, g: 1, b: 1 }; 3])
                .is_err()
        );
        assert_eq!(mode.colors().len(), 2);
    }

    #[test]
    fn test_validate_rejects_unbacked_color_mode() {
        let mut mode = breathing_mode();
        assert!(mode.validate().is_ok());
        mode.color_mode = ColorMode::Random;
        assert!(mode.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() -> Result<(), Box<dyn Error>> {
        let mode = breathing_mode().with_direction(Direction::Horizontal);
        assert_eq!(ModeData::from_json(&mode.to_json())?, mode);
        Ok(())
    }
}
