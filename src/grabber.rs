//! V4L2 frame grabber implementation using the v4l crate.

use std::io;
use std::time::Duration;

use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::traits::{
    CameraError, Geometry, GrabberConfig, GrabberPort, PixelFormat, Result, TriggerMode,
};

/// Identity of the capture node, as reported by the driver.
#[derive(Debug, Clone)]
pub struct GrabberCapabilities {
    /// Driver name (e.g. "vivid").
    pub driver: String,
    /// Card name.
    pub card: String,
    /// Bus location.
    pub bus_info: String,
    /// Node supports video capture.
    pub can_capture: bool,
    /// Node supports streaming I/O.
    pub can_stream: bool,
}

/// Frame grabber backed by a V4L2 capture node.
///
/// The buffer ring is memory mapped when acquisition starts; the driver only
/// begins streaming once the first buffer is requested.
pub struct V4L2Grabber {
    device: Device,
    capabilities: GrabberCapabilities,
    config: GrabberConfig,
    stream: Option<Stream<'static>>,
}

impl V4L2Grabber {
    /// Open a V4L2 capture node by index (e.g., 0 for /dev/video0).
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::DeviceNotFound`] if the node cannot be opened or
    /// queried.
    pub fn open(index: u32) -> Result<Self> {
        let not_found =
            |err: io::Error| CameraError::DeviceNotFound(format!("/dev/video{index}: {err}"));

        let device = Device::new(index as usize).map_err(not_found)?;
        let caps = device.query_caps().map_err(not_found)?;

        let capabilities = GrabberCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        let current = device.format().map_err(not_found)?;
        let config = GrabberConfig {
            pixel_format: pixel_format_of(current.fourcc).unwrap_or_default(),
            geometry: Geometry::new(current.width, current.height),
            ..GrabberConfig::default()
        };

        info!(
            index,
            driver = %capabilities.driver,
            card = %capabilities.card,
            "opened V4L2 grabber"
        );

        Ok(Self {
            device,
            capabilities,
            config,
            stream: None,
        })
    }

    /// Driver-reported identity of the node.
    #[must_use]
    pub const fn capabilities(&self) -> &GrabberCapabilities {
        &self.capabilities
    }

    /// Whether a buffer ring is currently allocated.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }
}

impl GrabberPort for V4L2Grabber {
    fn config(&self) -> &GrabberConfig {
        &self.config
    }

    fn configure(&mut self, config: &GrabberConfig) -> Result<()> {
        if self.stream.is_some() {
            return Err(CameraError::Rejected(
                "cannot reconfigure while streaming".to_owned(),
            ));
        }
        check_config(config)?;

        let mut fmt = self
            .device
            .format()
            .map_err(|err| CameraError::Collaborator(err.to_string()))?;
        let previous = fmt;

        fmt.width = config.geometry.width;
        fmt.height = config.geometry.height;
        fmt.fourcc = fourcc_of(config.pixel_format);

        let applied = self
            .device
            .set_format(&fmt)
            .map_err(|err| CameraError::Rejected(err.to_string()))?;

        if applied.width != fmt.width
            || applied.height != fmt.height
            || applied.fourcc != fmt.fourcc
        {
            // Driver substituted something else; put the old format back.
            self.device
                .set_format(&previous)
                .map_err(|err| CameraError::Collaborator(err.to_string()))?;
            return Err(CameraError::Rejected(format!(
                "driver adjusted {}x{} {} to {}x{} {}",
                fmt.width, fmt.height, fmt.fourcc, applied.width, applied.height, applied.fourcc
            )));
        }

        debug!(
            width = applied.width,
            height = applied.height,
            fourcc = %applied.fourcc,
            "V4L2 format applied"
        );
        self.config = config.clone();
        Ok(())
    }

    fn start_async(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream =
            Stream::with_buffers(&self.device, Type::VideoCapture, self.config.buffer_count)
                .map_err(|err| CameraError::Collaborator(err.to_string()))?;
        self.stream = Some(stream);

        info!(buffers = self.config.buffer_count, "V4L2 buffer ring allocated");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.stream.take().is_some() {
            info!("V4L2 stream stopped");
        }
        Ok(())
    }

    fn next_buffer(&mut self, timeout: Duration) -> Result<&[u8]> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CameraError::Collaborator("grabber not started".to_owned()))?;

        stream.set_timeout(timeout);
        let (buf, meta) = stream.next().map_err(|err| match err.kind() {
            io::ErrorKind::TimedOut => CameraError::Timeout(timeout),
            _ => CameraError::Collaborator(err.to_string()),
        })?;

        let used = meta.bytesused as usize;
        Ok(buf.get(..used).unwrap_or(buf))
    }
}

/// Reject settings a V4L2 capture node cannot honor.
fn check_config(config: &GrabberConfig) -> Result<()> {
    if config.trigger_mode != TriggerMode::FreeRun {
        return Err(CameraError::Rejected(format!(
            "V4L2 capture is free running, trigger mode {:?} unsupported",
            config.trigger_mode
        )));
    }
    if config.geometry.x_offset != 0 || config.geometry.y_offset != 0 {
        return Err(CameraError::Rejected(
            "V4L2 grabber does not support window offsets".to_owned(),
        ));
    }
    if config.geometry.width == 0 || config.geometry.height == 0 {
        return Err(CameraError::Rejected("empty capture window".to_owned()));
    }
    if config.buffer_count == 0 {
        return Err(CameraError::Rejected(
            "buffer ring needs at least one buffer".to_owned(),
        ));
    }
    Ok(())
}

fn fourcc_of(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Gray8 => FourCC::new(b"GREY"),
        PixelFormat::Gray16 => FourCC::new(b"Y16 "),
    }
}

fn pixel_format_of(fourcc: FourCC) -> Option<PixelFormat> {
    match &fourcc.repr {
        b"GREY" => Some(PixelFormat::Gray8),
        b"Y16 " => Some(PixelFormat::Gray16),
        _ => None,
    }
}
