use array2d::Array2D;
use flagset::{FlagSet, flags};
use serde_json::{Value, json};

use crate::device::json::{json_array, json_i32, json_str, json_u32};
use crate::device::segment::SegmentData;
use crate::error::DecodeError;
use crate::protocol::{DeserFromBuf, ReceivedMessage, SerToBuf, WriteMessage};
use crate::{OpenRgbError, OpenRgbResult, impl_enum_discriminant};

/// Matrix map cell value meaning "no LED at this grid position".
pub const NO_LED: u32 = u32::MAX;

/// Type of zones available.
///
/// See [Open SDK documentation](https://gitlab.com/CalcProgrammer1/OpenRGB/-/wikis/OpenRGB-SDK-Documentation#zone-data) for more information.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum ZoneType {
    /// Single LED zone.
    Single = 0,

    /// Linear zone.
    Linear = 1,

    /// Matrix zone.
    Matrix = 2,

    /// Linear zone wrapping around on itself.
    LinearLoop = 3,

    /// Matrix zone wrapping around horizontally.
    MatrixLoopX = 4,

    /// Matrix zone wrapping around vertically.
    MatrixLoopY = 5,

    /// Zone subdivided into segments.
    Segmented = 6,
}

impl_enum_discriminant!(
    ZoneType,
    Single: 0,
    Linear: 1,
    Matrix: 2,
    LinearLoop: 3,
    MatrixLoopX: 4,
    MatrixLoopY: 5,
    Segmented: 6
);

impl ZoneType {
    /// Whether zones of this type carry a matrix map.
    pub fn has_matrix(self) -> bool {
        matches!(
            self,
            ZoneType::Matrix | ZoneType::MatrixLoopX | ZoneType::MatrixLoopY
        )
    }
}

flags! {
    /// Flags for RGB controller zones.
    pub enum ZoneFlags: u32 {
        /// Zone is resizable, but only for effects. Direct color writes treat
        /// it as a single LED spanning the whole zone.
        ResizeEffectsOnly = 1 << 0,

        /// Zone has been manually configured.
        ManuallyConfigured = 1 << 15,
    }
}

/// A spatially or semantically coherent group of LEDs within a controller.
///
/// The zone does not own LEDs or colors; it holds a `(start_idx, leds_count)`
/// view into the controller's contiguous buffers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ZoneData {
    /// Zone name.
    name: String,

    /// Zone type.
    zone_type: ZoneType,

    /// Offset of this zone's LEDs in the controller buffers. Maintained by
    /// the controller, not carried on the wire.
    start_idx: u32,

    /// Zone LED count.
    leds_count: u32,

    /// Minimum number of LEDs if this zone is resizable.
    leds_min: u32,

    /// Maximum number of LEDs if this zone is resizable.
    leds_max: u32,

    /// Zone LED matrix, present iff [`ZoneType::has_matrix`].
    ///
    /// Cells hold the zone-relative index of the LED at that grid position,
    /// or [`NO_LED`].
    matrix: Option<Array2D<u32>>,

    /// User-defined segments. Carried on the wire from protocol version 4.
    segments: Vec<SegmentData>,

    /// Zone flags. Not carried on the wire at the supported versions.
    flags: FlagSet<ZoneFlags>,
}

impl ZoneData {
    /// Creates a zone. Resizable zones declare `leds_min < leds_max`.
    pub fn new(
        name: impl Into<String>,
        zone_type: ZoneType,
        leds_min: u32,
        leds_max: u32,
        leds_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            zone_type,
            start_idx: 0,
            leds_count,
            leds_min,
            leds_max,
            matrix: None,
            segments: Vec::new(),
            flags: FlagSet::default(),
        }
    }

    /// Attaches the LED matrix map. Required for matrix-type zones.
    pub fn with_matrix(mut self, matrix: Array2D<u32>) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Sets the zone flags.
    pub fn with_flags(mut self, flags: impl Into<FlagSet<ZoneFlags>>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Returns the name of this zone.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// [`ZoneType`] of this zone.
    pub fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// Offset of this zone's LEDs in the controller buffers.
    pub fn start_idx(&self) -> usize {
        self.start_idx as usize
    }

    pub(crate) fn set_start_idx(&mut self, start_idx: usize) {
        self.start_idx = start_idx as u32;
    }

    /// Number of LEDs in this zone.
    pub fn leds_count(&self) -> usize {
        self.leds_count as usize
    }

    pub(crate) fn set_leds_count(&mut self, leds_count: usize) {
        self.leds_count = leds_count as u32;
    }

    /// Minimum number of LEDs for this zone if it is resizable.
    pub fn leds_min(&self) -> usize {
        self.leds_min as usize
    }

    /// Maximum number of LEDs for this zone if it is resizable.
    pub fn leds_max(&self) -> usize {
        self.leds_max as usize
    }

    /// Whether this zone can be resized.
    pub fn is_resizable(&self) -> bool {
        self.leds_min != self.leds_max
    }

    /// Range of this zone's LEDs within the controller buffers.
    pub fn led_range(&self) -> std::ops::Range<usize> {
        self.start_idx()..self.start_idx() + self.leds_count()
    }

    /// LED matrix of this zone, present iff the zone type is a matrix type.
    pub fn matrix(&self) -> Option<&Array2D<u32>> {
        self.matrix.as_ref()
    }

    pub(crate) fn drop_matrix(&mut self) {
        self.matrix = None;
    }

    /// Returns the segments in this zone.
    pub fn segments(&self) -> &[SegmentData] {
        &self.segments
    }

    /// Returns the flags of this zone.
    pub fn flags(&self) -> FlagSet<ZoneFlags> {
        self.flags
    }

    /// Appends a segment. The segment must extend the existing partition
    /// contiguously and stay within the zone.
    pub(crate) fn push_segment(&mut self, segment: SegmentData) -> OpenRgbResult<()> {
        let covered: u32 = self.segments.iter().map(SegmentData::leds_count).sum();
        if segment.start_idx() != covered {
            return Err(OpenRgbError::Invariant(format!(
                "segment '{}' starts at {} but the zone is covered up to {}",
                segment.name(),
                segment.start_idx(),
                covered
            )));
        }
        if covered + segment.leds_count() > self.leds_count {
            return Err(OpenRgbError::Invariant(format!(
                "segment '{}' ends at {} beyond the zone's {} LEDs",
                segment.name(),
                covered + segment.leds_count(),
                self.leds_count
            )));
        }
        self.segments.push(segment);
        Ok(())
    }

    pub(crate) fn clear_segments(&mut self) {
        self.segments.clear();
    }

    /// Retains only segments that still fit after a resize; if the survivors
    /// no longer cover the zone exactly the partition is invalid and all
    /// segments are dropped.
    pub(crate) fn prune_segments(&mut self) {
        let leds_count = self.leds_count;
        self.segments
            .retain(|s| s.start_idx() + s.leds_count() <= leds_count);
        if !self.segments_cover_zone() {
            self.segments.clear();
        }
    }

    fn segments_cover_zone(&self) -> bool {
        if self.segments.is_empty() {
            return true;
        }
        let mut covered = 0;
        for segment in &self.segments {
            if segment.start_idx() != covered {
                return false;
            }
            covered += segment.leds_count();
        }
        covered == self.leds_count
    }

    /// Checks the zone invariants.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.leds_min <= self.leds_count && self.leds_count <= self.leds_max) {
            return Err(format!(
                "zone '{}' LED count {} outside [{}, {}]",
                self.name, self.leds_count, self.leds_min, self.leds_max
            ));
        }
        if self.zone_type.has_matrix() != self.matrix.is_some() {
            return Err(format!(
                "zone '{}' of type {:?} {} a matrix map",
                self.name,
                self.zone_type,
                if self.matrix.is_some() {
                    "carries"
                } else {
                    "is missing"
                }
            ));
        }
        if let Some(matrix) = &self.matrix {
            for cell in matrix.elements_row_major_iter() {
                if *cell != NO_LED && *cell >= self.leds_count {
                    return Err(format!(
                        "zone '{}' matrix cell {} outside its {} LEDs",
                        self.name, cell, self.leds_count
                    ));
                }
            }
        }
        if !self.segments_cover_zone() {
            return Err(format!(
                "zone '{}' segments do not partition its {} LEDs",
                self.name, self.leds_count
            ));
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Value {
        let matrix = self.matrix.as_ref().map(|m| {
            json!({
                "height": m.num_rows() as u32,
                "width": m.num_columns() as u32,
                "map": m.elements_row_major_iter().copied().collect::<Vec<u32>>(),
            })
        });
        json!({
            "name": self.name,
            "type": u32::from(self.zone_type) as i32,
            "start_idx": self.start_idx,
            "leds_count": self.leds_count,
            "leds_min": self.leds_min,
            "leds_max": self.leds_max,
            "matrix": matrix,
            "segments": self.segments.iter().map(SegmentData::to_json).collect::<Vec<Value>>(),
            "flags": self.flags.bits(),
        })
    }

    pub(crate) fn from_json(value: &Value) -> OpenRgbResult<Self> {
        let matrix = match value.get("matrix") {
            None | Some(Value::Null) => None,
            Some(m) => {
                let height = json_u32(m, "height")? as usize;
                let width = json_u32(m, "width")? as usize;
                let cells = json_array(m, "map")?
                    .iter()
                    .map(|c| {
                        c.as_u64().and_then(|v| u32::try_from(v).ok()).ok_or_else(|| {
                            DecodeError::InvalidValue("matrix cell is not a u32".to_string())
                        })
                    })
                    .collect::<Result<Vec<u32>, _>>()?;
                Some(new_matrix(height, width, cells)?)
            }
        };
        let segments = json_array(value, "segments")?
            .iter()
            .map(SegmentData::from_json)
            .collect::<OpenRgbResult<Vec<_>>>()?;
        let flags = FlagSet::new(json_u32(value, "flags")?)
            .map_err(|e| DecodeError::InvalidValue(format!("invalid zone flags: {e}")))?;
        Ok(Self {
            name: json_str(value, "name")?,
            zone_type: ZoneType::try_from(json_i32(value, "type")? as u32)?,
            start_idx: json_u32(value, "start_idx")?,
            leds_count: json_u32(value, "leds_count")?,
            leds_min: json_u32(value, "leds_min")?,
            leds_max: json_u32(value, "leds_max")?,
            matrix,
            segments,
            flags,
        })
    }
}

fn new_matrix(height: usize, width: usize, cells: Vec<u32>) -> OpenRgbResult<Array2D<u32>> {
    Array2D::from_row_major(&cells, height, width).map_err(|e| {
        DecodeError::InvalidValue(format!("matrix map dimensions do not match cells: {e:?}")).into()
    })
}

impl DeserFromBuf for ZoneData {
    fn deserialize(buf: &mut ReceivedMessage<'_>) -> OpenRgbResult<Self> {
        let name = buf.read_value()?;
        let zone_type = buf.read_value()?;
        let leds_min = buf.read_value()?;
        let leds_max = buf.read_value()?;
        let leds_count = buf.read_value()?;
        let matrix_len = buf.read_u16()? as usize;
        let matrix = match matrix_len {
            0 => None,
            _ => {
                let height = buf.read_u32()? as usize;
                let width = buf.read_u32()? as usize;
                if matrix_len != 8 + 4 * height * width {
                    return Err(DecodeError::InvalidValue(format!(
                        "matrix map of {height}x{width} cells does not fit its {matrix_len} bytes"
                    ))
                    .into());
                }
                let cells = buf.read_n_values::<u32>(height * width)?;
                Some(new_matrix(height, width, cells)?)
            }
        };

        let segments = match buf.protocol_version() >= 4 {
            true => buf.read_value::<Vec<SegmentData>>()?,
            false => Vec::new(),
        };

        Ok(Self {
            name,
            zone_type,
            start_idx: 0,
            leds_count,
            leds_min,
            leds_max,
            matrix,
            segments,
            flags: FlagSet::default(),
        })
    }
}

impl SerToBuf for ZoneData {
    fn serialize(&self, buf: &mut WriteMessage) -> OpenRgbResult<()> {
        buf.write_value(&self.name)?;
        buf.write_value(&self.zone_type)?;
        buf.write_u32(self.leds_min);
        buf.write_u32(self.leds_max);
        buf.write_u32(self.leds_count);
        match &self.matrix {
            None => buf.write_u16(0),
            Some(matrix) => {
                let height = matrix.num_rows() as u32;
                let width = matrix.num_columns() as u32;
                buf.write_u16((8 + 4 * height * width) as u16);
                buf.write_u32(height);
                buf.write_u32(width);
                for cell in matrix.elements_row_major_iter() {
                    buf.write_u32(*cell);
                }
            }
        }
        if buf.protocol_version() >= 4 {
            buf.write_value(&self.segments)?;
        }
        Ok(())
    }
}
