//! Generic property identifiers shared by all backends.
//!
//! Identifiers are stable across backends; any single backend supports only a
//! subset of them. Values cross the client boundary as [`PropertyValue`], a
//! tagged variant whose kind is fixed per identifier.

use std::fmt;
use std::str::FromStr;

use crate::traits::{CameraError, TriggerMode};

/// Backend-agnostic property identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyId {
    /// Camera model name.
    Name,
    /// Frame width.
    Width,
    /// Smallest accepted frame width.
    WidthMin,
    /// Largest accepted frame width.
    WidthMax,
    /// Frame height.
    Height,
    /// Smallest accepted frame height.
    HeightMin,
    /// Largest accepted frame height.
    HeightMax,
    /// Horizontal ROI offset.
    XOffset,
    /// Smallest horizontal ROI offset.
    XOffsetMin,
    /// Largest horizontal ROI offset.
    XOffsetMax,
    /// Vertical ROI offset.
    YOffset,
    /// Smallest vertical ROI offset.
    YOffsetMin,
    /// Largest vertical ROI offset.
    YOffsetMax,
    /// Exposure time.
    Exposure,
    /// Shortest exposure time.
    ExposureMin,
    /// Longest exposure time.
    ExposureMax,
    /// Delay between trigger and exposure.
    Delay,
    /// Shortest trigger delay.
    DelayMin,
    /// Longest trigger delay.
    DelayMax,
    /// Frame rate.
    FrameRate,
    /// Trigger source.
    TriggerMode,
    /// Significant bits per pixel.
    BitDepth,
    /// Sensor temperature.
    SensorTemperature,
    /// Analog gain.
    Gain,
}

/// Kind of value a generic identifier carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Unsigned integer.
    Integer,
    /// Floating point.
    Float,
    /// Free text.
    Text,
    /// Enumerated mode.
    Mode,
}

/// Unit of a generic identifier's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Dimensionless.
    None,
    /// Sensor pixels.
    Pixels,
    /// Microseconds.
    Microseconds,
    /// Frames per second.
    FramesPerSecond,
    /// Bits.
    Bits,
    /// Degrees Celsius.
    DegreesCelsius,
}

impl PropertyId {
    /// Every identifier, in declaration order.
    pub const ALL: [Self; 24] = [
        Self::Name,
        Self::Width,
        Self::WidthMin,
        Self::WidthMax,
        Self::Height,
        Self::HeightMin,
        Self::HeightMax,
        Self::XOffset,
        Self::XOffsetMin,
        Self::XOffsetMax,
        Self::YOffset,
        Self::YOffsetMin,
        Self::YOffsetMax,
        Self::Exposure,
        Self::ExposureMin,
        Self::ExposureMax,
        Self::Delay,
        Self::DelayMin,
        Self::DelayMax,
        Self::FrameRate,
        Self::TriggerMode,
        Self::BitDepth,
        Self::SensorTemperature,
        Self::Gain,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Width => "width",
            Self::WidthMin => "width_min",
            Self::WidthMax => "width_max",
            Self::Height => "height",
            Self::HeightMin => "height_min",
            Self::HeightMax => "height_max",
            Self::XOffset => "x_offset",
            Self::XOffsetMin => "x_offset_min",
            Self::XOffsetMax => "x_offset_max",
            Self::YOffset => "y_offset",
            Self::YOffsetMin => "y_offset_min",
            Self::YOffsetMax => "y_offset_max",
            Self::Exposure => "exposure",
            Self::ExposureMin => "exposure_min",
            Self::ExposureMax => "exposure_max",
            Self::Delay => "delay",
            Self::DelayMin => "delay_min",
            Self::DelayMax => "delay_max",
            Self::FrameRate => "framerate",
            Self::TriggerMode => "trigger_mode",
            Self::BitDepth => "bitdepth",
            Self::SensorTemperature => "sensor_temperature",
            Self::Gain => "gain",
        }
    }

    /// Declared value kind.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Name => ValueKind::Text,
            Self::TriggerMode => ValueKind::Mode,
            Self::SensorTemperature => ValueKind::Float,
            _ => ValueKind::Integer,
        }
    }

    /// Declared unit.
    #[must_use]
    pub const fn unit(self) -> Unit {
        match self {
            Self::Width
            | Self::WidthMin
            | Self::WidthMax
            | Self::Height
            | Self::HeightMin
            | Self::HeightMax
            | Self::XOffset
            | Self::XOffsetMin
            | Self::XOffsetMax
            | Self::YOffset
            | Self::YOffsetMin
            | Self::YOffsetMax => Unit::Pixels,
            Self::Exposure
            | Self::ExposureMin
            | Self::ExposureMax
            | Self::Delay
            | Self::DelayMin
            | Self::DelayMax => Unit::Microseconds,
            Self::FrameRate => Unit::FramesPerSecond,
            Self::BitDepth => Unit::Bits,
            Self::SensorTemperature => Unit::DegreesCelsius,
            Self::Name | Self::TriggerMode | Self::Gain => Unit::None,
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyId {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| CameraError::PropertyInvalid(s.to_owned()))
    }
}

/// A property value tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Unsigned integer in the identifier's unit.
    Integer(u32),
    /// Floating point in the identifier's unit.
    Float(f64),
    /// Free text.
    Text(String),
    /// Enumerated mode code.
    Mode(u32),
}

impl PropertyValue {
    /// Kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Mode(_) => ValueKind::Mode,
        }
    }

    /// Integer payload, if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<u32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Text payload, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<TriggerMode> for PropertyValue {
    fn from(mode: TriggerMode) -> Self {
        Self::Mode(mode.code())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) | Self::Mode(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
