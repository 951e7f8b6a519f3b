//! Core traits and types shared by cameras, backends and frame grabbers.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::camera::AcquisitionState;

/// Pixel layout delivered by the frame grabber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit monochrome.
    #[default]
    Gray8,
    /// 16-bit monochrome, little endian.
    Gray16,
}

impl PixelFormat {
    /// Number of bytes a single pixel occupies in a grabber buffer.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Gray16 => 2,
        }
    }

    /// Significant bits per pixel.
    #[must_use]
    pub const fn bit_depth(self) -> u32 {
        match self {
            Self::Gray8 => 8,
            Self::Gray16 => 16,
        }
    }
}

/// Capture window of the grabber, in sensor pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Horizontal offset of the region of interest.
    pub x_offset: u32,
    /// Vertical offset of the region of interest.
    pub y_offset: u32,
}

impl Geometry {
    /// Full-frame geometry without offsets.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
        }
    }

    /// Size in bytes of one frame with this geometry.
    #[must_use]
    pub const fn frame_bytes(&self, format: PixelFormat) -> usize {
        self.width as usize * self.height as usize * format.bytes_per_pixel()
    }
}

/// Trigger source for image acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Camera decides when to expose.
    Auto,
    /// Exposure started by a software command.
    Software,
    /// Exposure started by an external trigger line.
    External,
    /// Continuous free-running acquisition.
    #[default]
    FreeRun,
}

impl TriggerMode {
    /// Stable numeric code carried by [`crate::PropertyValue::Mode`].
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Auto => 0,
            Self::Software => 1,
            Self::External => 2,
            Self::FreeRun => 3,
        }
    }

    /// Inverse of [`TriggerMode::code`].
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            1 => Some(Self::Software),
            2 => Some(Self::External),
            3 => Some(Self::FreeRun),
            _ => None,
        }
    }

    /// Parse the lowercase name used in configuration files.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "software" => Some(Self::Software),
            "external" => Some(Self::External),
            "freerun" => Some(Self::FreeRun),
            _ => None,
        }
    }
}

/// Complete grabber configuration.
///
/// Grabbers accept or reject a whole configuration at once, so a single field
/// change is pushed as a modified copy of the current configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabberConfig {
    /// Pixel layout of delivered buffers.
    pub pixel_format: PixelFormat,
    /// Capture window.
    pub geometry: Geometry,
    /// Trigger source.
    pub trigger_mode: TriggerMode,
    /// Whether the grabber fills its ring without client involvement.
    pub asynchronous: bool,
    /// Requested depth of the grabber's buffer ring.
    pub buffer_count: u32,
}

impl Default for GrabberConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Gray8,
            geometry: Geometry::default(),
            trigger_mode: TriggerMode::FreeRun,
            asynchronous: true,
            buffer_count: 4,
        }
    }
}

/// A value as exchanged with a vendor SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Integer count.
    Int(i64),
    /// Floating point quantity in the vendor's unit.
    Float(f64),
    /// String, either free text or a formatted number.
    Text(String),
    /// Enumerated mode code.
    Mode(i64),
}

impl NativeValue {
    /// Kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> NativeKind {
        match self {
            Self::Int(_) => NativeKind::Int,
            Self::Float(_) => NativeKind::Float,
            Self::Text(_) => NativeKind::Text,
            Self::Mode(_) => NativeKind::Mode,
        }
    }
}

/// Kind of a vendor-native property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// Integer count.
    Int,
    /// Floating point quantity.
    Float,
    /// String.
    Text,
    /// Enumerated mode code.
    Mode,
}

/// Error type for camera, backend and grabber operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Property is not supported (or not writable) on this backend.
    #[error("property `{0}` is not supported by this camera")]
    PropertyInvalid(String),
    /// A collaborator refused the value.
    #[error("value for `{property}` out of range: {reason}")]
    PropertyOutOfRange {
        /// Generic property name.
        property: String,
        /// Collaborator's explanation.
        reason: String,
    },
    /// Backend or physical device absent at initialization.
    #[error("camera not found: {0}")]
    InitNotFound(String),
    /// Hardware or transport fault reported by a grabber or device.
    #[error("collaborator fault: {0}")]
    Collaborator(String),
    /// Ordinary refusal by a grabber or device.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Vendor device could not be opened.
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    /// Operation not allowed in the current acquisition state.
    #[error("cannot {operation} while camera is {state}")]
    InvalidState {
        /// Attempted operation.
        operation: &'static str,
        /// State the camera was in.
        state: AcquisitionState,
    },
    /// Caller buffer cannot hold one frame.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes in one frame.
        needed: usize,
        /// Bytes supplied by the caller.
        available: usize,
    },
    /// Grabber window differs from the window both sides last agreed on.
    #[error("grabber window {grabber_width}x{grabber_height} differs from committed {width}x{height}")]
    WindowMismatch {
        /// Committed frame width.
        width: u32,
        /// Committed frame height.
        height: u32,
        /// Width the grabber is configured for.
        grabber_width: u32,
        /// Height the grabber is configured for.
        grabber_height: u32,
    },
    /// No frame arrived in time.
    #[error("no frame within {0:?}")]
    Timeout(Duration),
    /// A captured frame does not show the expected content.
    #[error("frame validation failed: {0}")]
    Validation(String),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Whether this error is a hardware fault rather than an ordinary refusal.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Collaborator(_) | Self::Io(_))
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Narrow interface to a frame grabber.
///
/// Once started, a grabber fills its ring of buffers from the incoming video
/// stream on its own; [`GrabberPort::next_buffer`] lends the next filled
/// buffer until the following call.
pub trait GrabberPort {
    /// Currently applied configuration.
    fn config(&self) -> &GrabberConfig;

    /// Apply a complete configuration. On rejection the previous
    /// configuration stays in effect.
    fn configure(&mut self, config: &GrabberConfig) -> Result<()>;

    /// Begin asynchronous acquisition.
    fn start_async(&mut self) -> Result<()>;

    /// Stop acquisition. Stopping an idle grabber succeeds.
    fn stop(&mut self) -> Result<()>;

    /// Block until the next filled buffer is available.
    fn next_buffer(&mut self, timeout: Duration) -> Result<&[u8]>;
}

/// Narrow interface to a vendor SDK device handle.
///
/// Every handle addresses exactly one physical device, so several cameras can
/// be driven side by side.
pub trait NativeDevice {
    /// Open the physical device. Fails with [`CameraError::DeviceNotFound`]
    /// when it is absent.
    fn open(&mut self) -> Result<()>;

    /// Release the physical device.
    fn close(&mut self) -> Result<()>;

    /// Read a vendor property by native name.
    fn read_native(&self, name: &str) -> Result<NativeValue>;

    /// Write a vendor property by native name.
    fn write_native(&mut self, name: &str, value: NativeValue) -> Result<()>;
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray8 => write!(f, "GRAY8"),
            Self::Gray16 => write!(f, "GRAY16"),
        }
    }
}
