use flagset::{FlagSet, flags};
use serde_json::{Value, json};

use crate::device::color::{Color, color_from_packed, color_to_packed};
use crate::device::json::{json_array, json_i32, json_str, json_u32};
use crate::device::led::Led;
use crate::device::mode::ModeData;
use crate::device::segment::SegmentData;
use crate::device::zone::{ZoneData, ZoneFlags};
use crate::device::DeviceType;
use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};
use crate::{OpenRgbError, OpenRgbResult};

flags! {
    /// RGB controller flags.
    pub enum ControllerFlags: u32 {
        /// Controller is local to this instance.
        Local = 1 << 0,

        /// Controller is on a remote instance.
        Remote = 1 << 1,

        /// Controller is a virtual device.
        Virtual = 1 << 2,

        /// Controller is hidden.
        Hidden = 1 << 3,

        /// The worker clears the pending-update marker before calling the
        /// hardware update, so writes racing an in-flight update are never
        /// coalesced away.
        ResetBeforeUpdate = 1 << 8,
    }
}

const BLACK: Color = Color { r: 0, g: 0, b: 0 };

/// Data model of one RGB controller: metadata, modes, zones, LEDs and the
/// color buffer.
///
/// The controller owns a single contiguous color buffer; zones address it
/// through `(start_idx, leds_count)` views. All operations here are
/// in-memory; hardware is only touched through the runtime
/// [`Controller`](crate::Controller).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ControllerData {
    /// Controller name.
    name: String,

    /// Controller vendor.
    vendor: String,

    /// Controller description.
    description: String,

    /// Controller version.
    version: String,

    /// Controller serial.
    serial: String,

    /// Controller location.
    location: String,

    /// Controller type.
    device_type: DeviceType,

    /// Controller flags. Carried on the wire from protocol version 3.
    flags: FlagSet<ControllerFlags>,

    /// Index of the active mode. Carried on the wire from protocol version 1.
    active_mode: i32,

    /// Controller modes.
    modes: Vec<ModeData>,

    /// Controller zones.
    zones: Vec<ZoneData>,

    /// Controller LEDs.
    leds: Vec<Led>,

    /// Controller color buffer, one entry per LED.
    colors: Vec<Color>,
}

impl ControllerData {
    /// Creates an empty controller; drivers add modes, zones and LEDs and
    /// finish with [`Self::setup_colors`].
    pub fn new(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            vendor: String::new(),
            description: String::new(),
            version: String::new(),
            serial: String::new(),
            location: String::new(),
            device_type,
            flags: FlagSet::default(),
            active_mode: 0,
            modes: Vec::new(),
            zones: Vec::new(),
            leds: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Sets the vendor string.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Sets the description string.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the serial string.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    /// Sets the location string.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the controller flags.
    pub fn with_flags(mut self, flags: impl Into<FlagSet<ControllerFlags>>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Appends a mode.
    pub fn add_mode(&mut self, mode: ModeData) {
        self.modes.push(mode);
    }

    /// Appends a zone.
    pub fn add_zone(&mut self, zone: ZoneData) {
        self.zones.push(zone);
    }

    /// Appends an explicitly named LED.
    pub fn add_led(&mut self, led: Led) {
        self.leds.push(led);
    }

    /// Sizes the LED list and color buffer to the declared zones and rebases
    /// every zone's start index. Drivers call this once their zones are set
    /// up; LEDs not declared explicitly get generated names.
    pub fn setup_colors(&mut self) {
        let total: usize = self.zones.iter().map(ZoneData::leds_count).sum();
        if self.leds.len() != total {
            self.leds = self
                .zones
                .iter()
                .flat_map(|zone| {
                    (0..zone.leds_count())
                        .map(|i| Led::new(format!("{} LED {}", zone.name(), i + 1), 0))
                })
                .collect();
        }
        self.colors.resize(total, BLACK);
        self.rebase_zones();
    }

    fn rebase_zones(&mut self) {
        let mut start = 0;
        for zone in &mut self.zones {
            zone.set_start_idx(start);
            start += zone.leds_count();
        }
    }

    /// Returns the name of this controller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the vendor of this controller.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Returns a description for this controller.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the version of this controller.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the serial number of this controller.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the location of this controller.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the type of this controller.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Returns the flags of this controller.
    pub fn flags(&self) -> FlagSet<ControllerFlags> {
        self.flags
    }

    /// Whether this controller is hidden.
    pub fn hidden(&self) -> bool {
        self.flags.contains(ControllerFlags::Hidden)
    }

    /// Sets or clears the hidden flag. Returns whether the flag changed.
    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        if self.hidden() == hidden {
            return false;
        }
        if hidden {
            self.flags |= ControllerFlags::Hidden;
        } else {
            self.flags -= ControllerFlags::Hidden;
        }
        true
    }

    /// Returns the index of the active mode.
    pub fn active_mode(&self) -> i32 {
        self.active_mode
    }

    /// Returns the active mode, if the controller has modes.
    pub fn active_mode_data(&self) -> Option<&ModeData> {
        self.modes.get(self.active_mode as usize)
    }

    /// Returns the modes of this controller.
    pub fn modes(&self) -> &[ModeData] {
        &self.modes
    }

    /// Mutable access to one mode, for the parameter setters.
    pub fn mode_mut(&mut self, mode_idx: usize) -> Option<&mut ModeData> {
        self.modes.get_mut(mode_idx)
    }

    /// Returns the zones of this controller.
    pub fn zones(&self) -> &[ZoneData] {
        &self.zones
    }

    /// Returns the LEDs of this controller.
    pub fn leds(&self) -> &[Led] {
        &self.leds
    }

    /// Returns the color buffer of this controller.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Number of LEDs over all zones.
    pub fn num_leds(&self) -> usize {
        self.zones.iter().map(ZoneData::leds_count).sum()
    }

    fn zone(&self, zone_idx: usize) -> OpenRgbResult<&ZoneData> {
        self.zones.get(zone_idx).ok_or_else(|| {
            OpenRgbError::Invariant(format!(
                "controller '{}' has no zone {zone_idx}",
                self.name
            ))
        })
    }

    /// Returns the color of one LED.
    pub fn color(&self, led_idx: usize) -> OpenRgbResult<Color> {
        self.colors.get(led_idx).copied().ok_or_else(|| {
            OpenRgbError::Invariant(format!("controller '{}' has no LED {led_idx}", self.name))
        })
    }

    /// Sets the color of one LED.
    pub fn set_color(&mut self, led_idx: usize, color: Color) -> OpenRgbResult<()> {
        let slot = self.colors.get_mut(led_idx).ok_or_else(|| {
            OpenRgbError::Invariant(format!("controller '{}' has no LED {led_idx}", self.name))
        })?;
        *slot = color;
        Ok(())
    }

    /// Copies `colors` over the start of the color buffer. Extra input colors
    /// are ignored; LEDs past the input keep their color.
    pub fn set_colors(&mut self, colors: &[Color]) {
        let n = colors.len().min(self.colors.len());
        self.colors[..n].copy_from_slice(&colors[..n]);
    }

    /// Paints every LED of the controller.
    pub fn set_all_colors(&mut self, color: Color) {
        self.colors.fill(color);
    }

    /// Returns the colors of one zone.
    pub fn zone_colors(&self, zone_idx: usize) -> OpenRgbResult<&[Color]> {
        let zone = self.zone(zone_idx)?;
        Ok(&self.colors[zone.led_range()])
    }

    /// Copies `colors` into a zone's slice of the color buffer.
    ///
    /// A zone flagged `ResizeEffectsOnly` is a single logical LED for direct
    /// color writes: the first input color floods the whole zone.
    pub fn set_zone_colors(&mut self, zone_idx: usize, colors: &[Color]) -> OpenRgbResult<()> {
        let zone = self.zone(zone_idx)?;
        let range = zone.led_range();
        if zone.flags().contains(ZoneFlags::ResizeEffectsOnly) {
            if let Some(color) = colors.first() {
                self.colors[range].fill(*color);
            }
            return Ok(());
        }
        let n = colors.len().min(range.len());
        self.colors[range.start..range.start + n].copy_from_slice(&colors[..n]);
        Ok(())
    }

    /// Paints every physical LED of one zone.
    pub fn set_all_zone_colors(&mut self, zone_idx: usize, color: Color) -> OpenRgbResult<()> {
        let range = self.zone(zone_idx)?.led_range();
        self.colors[range].fill(color);
        Ok(())
    }

    /// Sets the active mode index.
    pub fn set_active_mode(&mut self, mode_idx: usize) -> OpenRgbResult<()> {
        if mode_idx >= self.modes.len() {
            return Err(OpenRgbError::Invariant(format!(
                "controller '{}' has no mode {mode_idx}",
                self.name
            )));
        }
        self.active_mode = mode_idx as i32;
        Ok(())
    }

    /// Switches to the device's directly controllable mode: "Direct" if it
    /// exists, else "Custom". Without either the call is a no-op and the
    /// current mode is kept. Returns the selected index.
    pub fn set_custom_mode(&mut self) -> Option<usize> {
        let idx = self.find_mode("Direct").or_else(|| self.find_mode("Custom"))?;
        self.active_mode = idx as i32;
        Some(idx)
    }

    fn find_mode(&self, name: &str) -> Option<usize> {
        self.modes
            .iter()
            .position(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Replaces mode `mode_idx` with an incoming description and makes it the
    /// active mode. The incoming mode must satisfy the mode invariants.
    pub fn apply_mode(&mut self, mode_idx: usize, mode: ModeData) -> OpenRgbResult<()> {
        if mode_idx >= self.modes.len() {
            return Err(OpenRgbError::Invariant(format!(
                "controller '{}' has no mode {mode_idx}",
                self.name
            )));
        }
        mode.validate().map_err(OpenRgbError::Invariant)?;
        self.modes[mode_idx] = mode;
        self.active_mode = mode_idx as i32;
        Ok(())
    }

    /// Resizes a zone within its `[leds_min, leds_max]` bounds.
    ///
    /// Rebuilds the LED list and color buffer (surviving LEDs keep name and
    /// color, new ones start black), re-bases every subsequent zone's start
    /// index, prunes segments that no longer partition the zone, and drops
    /// the matrix map of `ResizeEffectsOnly` zones.
    pub fn resize_zone(&mut self, zone_idx: usize, new_size: usize) -> OpenRgbResult<()> {
        let zone = self.zone(zone_idx)?;
        if !(zone.leds_min() <= new_size && new_size <= zone.leds_max()) {
            return Err(OpenRgbError::Invariant(format!(
                "zone '{}' cannot be resized to {new_size}, bounds are [{}, {}]",
                zone.name(),
                zone.leds_min(),
                zone.leds_max()
            )));
        }

        let old_ranges: Vec<_> = self.zones.iter().map(ZoneData::led_range).collect();
        {
            let zone = &mut self.zones[zone_idx];
            zone.set_leds_count(new_size);
            if zone.flags().contains(ZoneFlags::ResizeEffectsOnly) {
                zone.drop_matrix();
            }
            zone.prune_segments();
        }

        let total: usize = self.zones.iter().map(ZoneData::leds_count).sum();
        let mut leds = Vec::with_capacity(total);
        let mut colors = Vec::with_capacity(total);
        for (zone, old) in self.zones.iter().zip(&old_ranges) {
            for i in 0..zone.leds_count() {
                if i < old.len() {
                    leds.push(self.leds[old.start + i].clone());
                    colors.push(self.colors[old.start + i]);
                } else {
                    leds.push(Led::new(format!("{} LED {}", zone.name(), i + 1), 0));
                    colors.push(BLACK);
                }
            }
        }
        self.leds = leds;
        self.colors = colors;
        self.rebase_zones();
        Ok(())
    }

    /// Appends a user-defined segment to a zone.
    pub fn add_segment(&mut self, zone_idx: usize, segment: SegmentData) -> OpenRgbResult<()> {
        self.zone(zone_idx)?;
        self.zones[zone_idx].push_segment(segment)
    }

    /// Removes every segment of a zone.
    pub fn clear_segments(&mut self, zone_idx: usize) -> OpenRgbResult<()> {
        self.zone(zone_idx)?;
        self.zones[zone_idx].clear_segments();
        Ok(())
    }

    /// Checks the controller invariants.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for zone in &self.zones {
            zone.validate()?;
        }
        for mode in &self.modes {
            mode.validate()?;
        }
        let total = self.num_leds();
        if self.leds.len() != total || self.colors.len() != total {
            return Err(format!(
                "controller '{}' holds {} LEDs and {} colors for {} zone LEDs",
                self.name,
                self.leds.len(),
                self.colors.len(),
                total
            ));
        }
        let mut start = 0;
        for zone in &self.zones {
            if zone.start_idx() != start {
                return Err(format!(
                    "zone '{}' starts at {} instead of {start}",
                    zone.name(),
                    zone.start_idx()
                ));
            }
            start += zone.leds_count();
        }
        let in_range = self.active_mode >= 0
            && ((self.active_mode as usize) < self.modes.len()
                || (self.modes.is_empty() && self.active_mode == 0));
        if !in_range {
            return Err(format!(
                "active mode {} outside the {} modes",
                self.active_mode,
                self.modes.len()
            ));
        }
        Ok(())
    }

    /// Projects away everything a peer at `version` never sees, replacing it
    /// with the defaults the decoder assumes. `encode` then `decode` at any
    /// version yields exactly this projection.
    pub fn project_to_version(&self, version: u32) -> Self {
        let mut c = self.clone();
        c.modes = c
            .modes
            .iter()
            .map(|m| m.project_to_version(version))
            .collect();
        if version < 1 {
            c.active_mode = 0;
            c.vendor.clear();
        }
        if version < 3 {
            c.flags = FlagSet::default();
        }
        for zone in &mut c.zones {
            if version < 4 {
                zone.clear_segments();
            }
            // zone flags are not carried at any supported version
            *zone = zone.clone().with_flags(FlagSet::default());
        }
        c
    }

    /// Full JSON description, independent of protocol version.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "vendor": self.vendor,
            "description": self.description,
            "version": self.version,
            "serial": self.serial,
            "location": self.location,
            "type": u32::from(self.device_type) as i32,
            "flags": self.flags.bits(),
            "active_mode": self.active_mode,
            "modes": self.modes.iter().map(ModeData::to_json).collect::<Vec<Value>>(),
            "zones": self.zones.iter().map(ZoneData::to_json).collect::<Vec<Value>>(),
            "leds": self.leds.iter().map(Led::to_json).collect::<Vec<Value>>(),
            "colors": self.colors.iter().map(|c| color_to_packed(*c)).collect::<Vec<u32>>(),
        })
    }

    /// Rebuilds a controller from its JSON description.
    pub fn from_json(value: &Value) -> OpenRgbResult<Self> {
        let modes = json_array(value, "modes")?
            .iter()
            .map(ModeData::from_json)
            .collect::<OpenRgbResult<Vec<_>>>()?;
        let zones = json_array(value, "zones")?
            .iter()
            .map(ZoneData::from_json)
            .collect::<OpenRgbResult<Vec<_>>>()?;
        let leds = json_array(value, "leds")?
            .iter()
            .map(Led::from_json)
            .collect::<OpenRgbResult<Vec<_>>>()?;
        let colors = json_array(value, "colors")?
            .iter()
            .map(|c| {
                c.as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .map(color_from_packed)
                    .ok_or_else(|| {
                        DecodeError::InvalidValue("color is not a packed u32".to_string())
                    })
            })
            .collect::<Result<Vec<Color>, _>>()?;
        let flags = FlagSet::new(json_u32(value, "flags")?)
            .map_err(|e| DecodeError::InvalidValue(format!("invalid controller flags: {e}")))?;

        let controller = Self {
            name: json_str(value, "name")?,
            vendor: json_str(value, "vendor")?,
            description: json_str(value, "description")?,
            version: json_str(value, "version")?,
            serial: json_str(value, "serial")?,
            location: json_str(value, "location")?,
            device_type: DeviceType::from(json_i32(value, "type")? as u32),
            flags,
            active_mode: json_i32(value, "active_mode")?,
            modes,
            zones,
            leds,
            colors,
        };
        controller
            .validate()
            .map_err(|e| DecodeError::InvariantViolation(e).into())
            .map(|_| controller)
    }
}

impl SerToBuf for ControllerData {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        let v = buf.protocol_version();
        let mut inner = WriteMessage::with_capacity(v, 256);
        if v >= 3 {
            inner.write_value(&self.flags)?;
        }
        inner.write_value(&self.device_type)?;
        if v >= 1 {
            inner.write_u32(self.active_mode as u32);
        }
        inner.write_value(&self.name)?;
        if v >= 1 {
            inner.write_value(&self.vendor)?;
        }
        inner.write_value(&self.description)?;
        inner.write_value(&self.version)?;
        inner.write_value(&self.serial)?;
        inner.write_value(&self.location)?;
        inner.write_value(&self.modes)?;
        inner.write_value(&self.zones)?;
        inner.write_value(&self.leds)?;
        inner.write_value(&self.colors)?;

        buf.write_u32(inner.len() as u32);
        buf.write_slice(inner.bytes());
        Ok(())
    }
}

impl DeserFromBuf for ControllerData {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let len = buf.read_u32()? as usize;
        let mut sub = buf.sub_message(len)?;
        let v = sub.protocol_version();

        let flags = match v >= 3 {
            true => sub.read_value()?,
            false => FlagSet::default(),
        };
        let device_type = sub.read_value()?;
        let active_mode = match v >= 1 {
            true => sub.read_u32()? as i32,
            false => 0,
        };
        let name = sub.read_value()?;
        let vendor = match v >= 1 {
            true => sub.read_value()?,
            false => String::new(),
        };
        let description = sub.read_value()?;
        let version = sub.read_value()?;
        let serial = sub.read_value()?;
        let location = sub.read_value()?;
        let modes = sub.read_value::<Vec<ModeData>>()?;
        let zones = sub.read_value::<Vec<ZoneData>>()?;
        let leds = sub.read_value::<Vec<Led>>()?;
        let colors = sub.read_value::<Vec<Color>>()?;
        // anything left in `sub` is a newer field this version does not know

        let mut controller = Self {
            name,
            vendor,
            description,
            version,
            serial,
            location,
            device_type,
            flags,
            active_mode,
            modes,
            zones,
            leds,
            colors,
        };
        controller.rebase_zones();
        controller
            .validate()
            .map_err(|e| DecodeError::InvariantViolation(e).into())
            .map(|_| controller)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use array2d::Array2D;
    use flagset::FlagSet;

    use super::{ControllerData, ControllerFlags};
    use crate::device::color::Color;
    use crate::device::mode::{ColorMode, ModeData, ModeFlag};
    use crate::device::segment::SegmentData;
    use crate::device::zone::{NO_LED, ZoneData, ZoneFlags, ZoneType};
    use crate::device::DeviceType;
    use crate::error::{DecodeError, OpenRgbError};
    use crate::protocol::WriteMessage;

    fn test_controller() -> ControllerData {
        let mut c = ControllerData::new("Riing Quad", DeviceType::Cooler)
            .with_vendor("Thermaltake")
            .with_description("Thermaltake Riing Device")
            .with_version("1.0")
            .with_serial("A1B2C3")
            .with_location("HID: /dev/hidraw3")
            .with_flags(ControllerFlags::Local);
        c.add_mode(
            ModeData::new("Direct", 0, ModeFlag::HasPerLEDColor)
                .with_color_mode(ColorMode::PerLED),
        );
        c.add_mode(
            ModeData::new("Breathing", 2, ModeFlag::HasSpeed | ModeFlag::HasModeSpecificColor)
                .with_speed(0, 100, 50)
                .with_colors(1, 2, vec![Color { r: 255, g: 0, b: 0 }])
                .with_color_mode(ColorMode::ModeSpecific),
        );
        c.add_zone(ZoneData::new("Fan 1", ZoneType::Linear, 0, 30, 12));
        c.add_zone(
            ZoneData::new("Pad", ZoneType::Matrix, 4, 4, 4).with_matrix(
                Array2D::from_row_major(&[0, 1, NO_LED, 2, 3, NO_LED], 2, 3)
                    .expect("valid dimensions"),
            ),
        );
        c.setup_colors();
        c.add_segment(0, SegmentData::new("Front", 0, 6)).unwrap();
        c.add_segment(0, SegmentData::new("Back", 6, 6)).unwrap();
        c
    }

    #[test]
    fn test_setup_colors_partitions_zones() {
        let c = test_controller();
        assert_eq!(c.num_leds(), 16);
        assert_eq!(c.leds().len(), 16);
        assert_eq!(c.colors().len(), 16);
        assert_eq!(c.zones()[0].start_idx(), 0);
        assert_eq!(c.zones()[1].start_idx(), 12);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_all_versions() -> Result<(), Box<dyn Error>> {
        let c = test_controller();
        for version in 0..=crate::PROTOCOL_VERSION {
            let mut buf = WriteMessage::new(version);
            buf.write_value(&c)?;
            let mut msg = buf.to_received_msg();
            let decoded = msg.read_value::<ControllerData>()?;
            assert_eq!(decoded, c.project_to_version(version), "version {version}");
        }
        Ok(())
    }

    #[test]
    fn test_reencode_is_byte_identical() -> Result<(), Box<dyn Error>> {
        let c = test_controller();
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_value(&c)?;
        let first = buf.bytes().to_vec();

        let mut msg = buf.to_received_msg();
        let decoded = msg.read_value::<ControllerData>()?;
        let mut buf2 = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf2.write_value(&decoded)?;
        assert_eq!(buf2.bytes(), &first[..]);
        Ok(())
    }

    #[test]
    fn test_length_prefix_counts_following_bytes() -> Result<(), Box<dyn Error>> {
        let c = test_controller();
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_value(&c)?;
        let mut msg = buf.to_received_msg();
        let declared = msg.read_u32()? as usize;
        assert_eq!(declared, msg.remaining());
        Ok(())
    }

    #[test]
    fn test_surplus_inside_length_prefix_is_skipped() -> Result<(), Box<dyn Error>> {
        let c = test_controller();
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_value(&c)?;
        let mut bytes = buf.bytes().to_vec();
        // splice four unknown trailing bytes into the description and patch
        // the length prefix, as a newer peer with an extra field would
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let new_len = (bytes.len() - 4) as u32;
        bytes[..4].copy_from_slice(&new_len.to_le_bytes());

        let mut msg = crate::protocol::ReceivedMessage::new(&bytes, crate::PROTOCOL_VERSION);
        let decoded = msg.read_value::<ControllerData>()?;
        assert_eq!(decoded, c.project_to_version(crate::PROTOCOL_VERSION));
        assert_eq!(msg.remaining(), 0);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_led_count_mismatch() -> Result<(), Box<dyn Error>> {
        let mut c = test_controller();
        c.leds.pop();
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_value(&c)?;
        let mut msg = buf.to_received_msg();
        assert!(matches!(
            msg.read_value::<ControllerData>(),
            Err(OpenRgbError::Decode(DecodeError::InvariantViolation(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_resize_rebuilds_buffers() -> Result<(), Box<dyn Error>> {
        let mut c = test_controller();
        c.set_all_colors(Color { r: 9, g: 9, b: 9 });
        c.resize_zone(0, 20)?;

        assert_eq!(c.zones()[0].leds_count(), 20);
        assert_eq!(c.num_leds(), 24);
        assert_eq!(c.leds().len(), 24);
        assert_eq!(c.colors().len(), 24);
        assert_eq!(c.zones()[1].start_idx(), 20);
        // surviving LEDs keep their color, new ones start black
        assert_eq!(c.color(0)?, Color { r: 9, g: 9, b: 9 });
        assert_eq!(c.color(19)?, Color { r: 0, g: 0, b: 0 });
        assert_eq!(c.color(20)?, Color { r: 9, g: 9, b: 9 });
        assert!(c.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_resize_out_of_bounds_is_rejected() {
        let mut c = test_controller();
        let before = c.clone();
        assert!(c.resize_zone(0, 31).is_err());
        assert!(c.resize_zone(1, 3).is_err());
        assert_eq!(c, before);
    }

    #[test]
    fn test_resize_drops_stale_segments() -> Result<(), Box<dyn Error>> {
        let mut c = test_controller();
        c.resize_zone(0, 9)?;
        // 6+6 segments no longer partition 9 LEDs
        assert!(c.zones()[0].segments().is_empty());
        c.resize_zone(0, 12)?;
        c.add_segment(0, SegmentData::new("All", 0, 12))?;
        c.resize_zone(0, 12)?;
        assert_eq!(c.zones()[0].segments().len(), 1);
        Ok(())
    }

    #[test]
    fn test_resize_effects_only_zone_floods_on_direct_write() -> Result<(), Box<dyn Error>> {
        let mut c = ControllerData::new("Strimer", DeviceType::LEDStrip);
        c.add_zone(
            ZoneData::new("Cable", ZoneType::Linear, 1, 120, 27)
                .with_flags(ZoneFlags::ResizeEffectsOnly),
        );
        c.setup_colors();

        let red = Color { r: 255, g: 0, b: 0 };
        c.set_zone_colors(0, &[red])?;
        assert!(c.zone_colors(0)?.iter().all(|c| *c == red));
        Ok(())
    }

    #[test]
    fn test_set_all_colors() {
        let mut c = test_controller();
        let green = Color { r: 0, g: 255, b: 0 };
        c.set_all_colors(green);
        assert!(c.colors().iter().all(|c| *c == green));
    }

    #[test]
    fn test_set_color_is_idempotent() -> Result<(), Box<dyn Error>> {
        let mut c = test_controller();
        let blue = Color { r: 0, g: 0, b: 255 };
        c.set_color(3, blue)?;
        let snapshot = c.colors().to_vec();
        c.set_color(3, blue)?;
        assert_eq!(c.colors(), &snapshot[..]);
        Ok(())
    }

    #[test]
    fn test_set_custom_mode_prefers_direct() {
        let mut c = test_controller();
        c.set_active_mode(1).unwrap();
        assert_eq!(c.set_custom_mode(), Some(0));
        assert_eq!(c.active_mode(), 0);
    }

    #[test]
    fn test_mode_mut_setters_respect_flags() {
        let mut c = test_controller();
        let mode = c.mode_mut(1).unwrap();
        assert!(mode.set_speed(75).is_ok());
        assert!(mode.set_brightness(10).is_err());
        assert_eq!(c.modes()[1].speed(), Some(75));
        assert!(c.mode_mut(9).is_none());
    }

    #[test]
    fn test_set_custom_mode_without_candidate_keeps_mode() {
        let mut c = ControllerData::new("Lamp", DeviceType::Light);
        c.add_mode(ModeData::new("Rainbow", 1, ModeFlag::HasSpeed).with_speed(0, 10, 5));
        assert_eq!(c.set_custom_mode(), None);
        assert_eq!(c.active_mode(), 0);
    }

    #[test]
    fn test_apply_mode_validates_incoming() {
        let mut c = test_controller();
        let bad = ModeData::new("Breathing", 2, ModeFlag::HasSpeed)
            .with_colors(1, 2, vec![]);
        assert!(c.apply_mode(1, bad).is_err());
        assert!(c.apply_mode(5, c.modes()[0].clone()).is_err());
        assert!(c.apply_mode(1, c.modes()[1].clone()).is_ok());
        assert_eq!(c.active_mode(), 1);
    }

    #[test]
    fn test_hidden_flag_toggles_once() {
        let mut c = test_controller();
        assert!(!c.hidden());
        assert!(c.set_hidden(true));
        assert!(!c.set_hidden(true));
        assert!(c.flags().contains(ControllerFlags::Hidden));
        assert!(c.set_hidden(false));
        assert!(!c.hidden());
    }

    #[test]
    fn test_json_roundtrip_is_identity() -> Result<(), Box<dyn Error>> {
        let mut c = test_controller();
        c.set_all_colors(Color { r: 1, g: 2, b: 3 });
        c.set_hidden(true);
        assert_eq!(ControllerData::from_json(&c.to_json())?, c);
        Ok(())
    }

    #[test]
    fn test_project_to_v0_strips_versioned_fields() {
        let mut c = test_controller();
        c.set_active_mode(1).unwrap();
        let p = c.project_to_version(0);
        assert_eq!(p.active_mode(), 0);
        assert_eq!(p.vendor(), "");
        assert_eq!(p.flags(), FlagSet::default());
        assert!(p.zones().iter().all(|z| z.segments().is_empty()));
    }
}
