//! Mock collaborators for testing without hardware.
//!
//! [`MockDevice`] emulates a Photon Focus vendor device, [`MockGrabber`] a
//! frame grabber with a synthesized buffer ring. Both report what happened to
//! them through shared probes, since the camera owns them as trait objects.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::traits::{
    CameraError, GrabberConfig, GrabberPort, NativeDevice, NativeValue, PixelFormat, Result,
};

/// Counters shared between a [`MockDevice`] and the test.
#[derive(Debug, Default)]
pub struct DeviceProbe {
    /// Successful `open` calls.
    pub opens: Cell<u32>,
    /// `close` calls.
    pub closes: Cell<u32>,
    /// Accepted writes, by native name.
    pub writes: RefCell<Vec<String>>,
}

/// Mock vendor device with a Photon Focus-like property set.
pub struct MockDevice {
    values: HashMap<String, NativeValue>,
    present: bool,
    open: bool,
    write_fault: Option<String>,
    probe: Rc<DeviceProbe>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a mock device with a 1024x1024 window.
    #[must_use]
    pub fn new() -> Self {
        let values = [
            ("CameraName", NativeValue::Text("MV1-D1312-40".to_owned())),
            ("Window.W", NativeValue::Int(1024)),
            ("Window.W.Min", NativeValue::Int(16)),
            ("Window.W.Max", NativeValue::Int(1312)),
            ("Window.H", NativeValue::Int(1024)),
            ("Window.H.Min", NativeValue::Int(1)),
            ("Window.H.Max", NativeValue::Int(1082)),
            ("Window.X", NativeValue::Int(0)),
            ("Window.X.Min", NativeValue::Int(0)),
            ("Window.X.Max", NativeValue::Int(1296)),
            ("Window.Y", NativeValue::Int(0)),
            ("Window.Y.Min", NativeValue::Int(0)),
            ("Window.Y.Max", NativeValue::Int(1081)),
            ("ExposureTime", NativeValue::Float(10.0)),
            ("ExposureTime.Min", NativeValue::Float(0.01)),
            ("ExposureTime.Max", NativeValue::Float(1000.0)),
            ("Trigger.Delay", NativeValue::Float(0.0)),
            ("Trigger.Delay.Min", NativeValue::Float(0.0)),
            ("Trigger.Delay.Max", NativeValue::Float(100.0)),
            ("FrameRate", NativeValue::Text("37.9".to_owned())),
            ("Trigger.Source", NativeValue::Mode(3)),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();

        Self {
            values,
            present: true,
            open: false,
            write_fault: None,
            probe: Rc::default(),
        }
    }

    /// A device that fails to open.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    /// Override or add a vendor property.
    #[must_use]
    pub fn with_value(mut self, name: &str, value: NativeValue) -> Self {
        self.values.insert(name.to_owned(), value);
        self
    }

    /// Report a hardware fault whenever `name` is written.
    #[must_use]
    pub fn with_write_fault(mut self, name: &str) -> Self {
        self.write_fault = Some(name.to_owned());
        self
    }

    /// Probe observing this device.
    #[must_use]
    pub fn probe(&self) -> Rc<DeviceProbe> {
        Rc::clone(&self.probe)
    }

    fn check_range(&self, name: &str, value: &NativeValue) -> Result<()> {
        let bound = |suffix: &str| self.values.get(&format!("{name}.{suffix}"));
        let below = |limit: Option<&NativeValue>| match (value, limit) {
            (NativeValue::Int(v), Some(NativeValue::Int(min))) => v < min,
            (NativeValue::Float(v), Some(NativeValue::Float(min))) => v < min,
            _ => false,
        };
        let above = |limit: Option<&NativeValue>| match (value, limit) {
            (NativeValue::Int(v), Some(NativeValue::Int(max))) => v > max,
            (NativeValue::Float(v), Some(NativeValue::Float(max))) => v > max,
            _ => false,
        };

        if below(bound("Min")) || above(bound("Max")) {
            return Err(CameraError::Rejected(format!("{name} = {value:?} out of bounds")));
        }
        Ok(())
    }
}

impl NativeDevice for MockDevice {
    fn open(&mut self) -> Result<()> {
        if !self.present {
            return Err(CameraError::DeviceNotFound("no camera on port".to_owned()));
        }
        self.open = true;
        self.probe.opens.set(self.probe.opens.get() + 1);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.probe.closes.set(self.probe.closes.get() + 1);
        Ok(())
    }

    fn read_native(&self, name: &str) -> Result<NativeValue> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| CameraError::Rejected(format!("unknown property {name}")))
    }

    fn write_native(&mut self, name: &str, value: NativeValue) -> Result<()> {
        if !self.open {
            return Err(CameraError::Collaborator("device not open".to_owned()));
        }
        if self.write_fault.as_deref() == Some(name) {
            return Err(CameraError::Collaborator(format!("bus error writing {name}")));
        }
        let current = self
            .values
            .get(name)
            .ok_or_else(|| CameraError::Rejected(format!("unknown property {name}")))?;
        if current.kind() != value.kind() {
            return Err(CameraError::Rejected(format!(
                "{name} expects {:?}, got {:?}",
                current.kind(),
                value.kind()
            )));
        }
        self.check_range(name, &value)?;

        self.values.insert(name.to_owned(), value);
        self.probe.writes.borrow_mut().push(name.to_owned());
        Ok(())
    }
}

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Horizontal ramp from dark to light.
    GrayRamp,
    /// Every pixel set to the same value.
    Solid(u8),
    /// Every pixel set to the low byte of the frame counter.
    Counter,
}

/// What a [`MockGrabber`] observed.
#[derive(Debug, Default)]
pub struct GrabberProbe {
    /// Last configuration the grabber accepted.
    pub config: RefCell<Option<GrabberConfig>>,
    /// Accepted `configure` calls.
    pub configures: Cell<u32>,
    /// `start_async` calls that succeeded.
    pub starts: Cell<u32>,
    /// `stop` calls.
    pub stops: Cell<u32>,
    /// Frames handed out.
    pub frames: Cell<u32>,
}

/// Mock frame grabber.
pub struct MockGrabber {
    config: GrabberConfig,
    max_width: u32,
    max_height: u32,
    pattern: TestPattern,
    running: bool,
    frame: Vec<u8>,
    start_error: Option<CameraError>,
    fault_after: Option<u32>,
    timeout_after: Option<u32>,
    short_frames: bool,
    probe: Rc<GrabberProbe>,
}

impl Default for MockGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGrabber {
    /// Create a grabber accepting windows up to 2048x2048.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GrabberConfig::default(),
            max_width: 2048,
            max_height: 2048,
            pattern: TestPattern::GrayRamp,
            running: false,
            frame: Vec::new(),
            start_error: None,
            fault_after: None,
            timeout_after: None,
            short_frames: false,
            probe: Rc::default(),
        }
    }

    /// Limit the accepted capture window.
    #[must_use]
    pub const fn with_max_geometry(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Set the test pattern for frame generation.
    #[must_use]
    pub const fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Fail the next `start_async` with `error`.
    #[must_use]
    pub fn with_start_error(mut self, error: CameraError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Report a DMA fault after `frames` frames.
    #[must_use]
    pub const fn with_fault_after(mut self, frames: u32) -> Self {
        self.fault_after = Some(frames);
        self
    }

    /// Time out after `frames` frames.
    #[must_use]
    pub const fn with_timeout_after(mut self, frames: u32) -> Self {
        self.timeout_after = Some(frames);
        self
    }

    /// Deliver buffers one byte shorter than a frame.
    #[must_use]
    pub const fn with_short_frames(mut self) -> Self {
        self.short_frames = true;
        self
    }

    /// Probe observing this grabber.
    #[must_use]
    pub fn probe(&self) -> Rc<GrabberProbe> {
        Rc::clone(&self.probe)
    }
}

impl GrabberPort for MockGrabber {
    fn config(&self) -> &GrabberConfig {
        &self.config
    }

    fn configure(&mut self, config: &GrabberConfig) -> Result<()> {
        let g = config.geometry;
        if g.width == 0 || g.height == 0 {
            return Err(CameraError::Rejected("empty capture window".to_owned()));
        }
        if g.x_offset.saturating_add(g.width) > self.max_width
            || g.y_offset.saturating_add(g.height) > self.max_height
        {
            return Err(CameraError::Rejected(format!(
                "window {}x{}+{}+{} exceeds {}x{}",
                g.width, g.height, g.x_offset, g.y_offset, self.max_width, self.max_height
            )));
        }
        self.config = config.clone();
        *self.probe.config.borrow_mut() = Some(config.clone());
        self.probe.configures.set(self.probe.configures.get() + 1);
        Ok(())
    }

    fn start_async(&mut self) -> Result<()> {
        if let Some(err) = self.start_error.take() {
            return Err(err);
        }
        self.running = true;
        self.probe.starts.set(self.probe.starts.get() + 1);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        self.probe.stops.set(self.probe.stops.get() + 1);
        Ok(())
    }

    fn next_buffer(&mut self, timeout: Duration) -> Result<&[u8]> {
        if !self.running {
            return Err(CameraError::Collaborator("acquisition not started".to_owned()));
        }
        let seq = self.probe.frames.get();
        if self.fault_after.is_some_and(|limit| seq >= limit) {
            return Err(CameraError::Collaborator("DMA transfer failed".to_owned()));
        }
        if self.timeout_after.is_some_and(|limit| seq >= limit) {
            return Err(CameraError::Timeout(timeout));
        }

        self.frame = generate_test_frame(&self.config, self.pattern, seq);
        if self.short_frames {
            self.frame.pop();
        }
        self.probe.frames.set(seq + 1);
        Ok(&self.frame)
    }
}

/// Generate frame data for `config` based on `pattern`.
#[allow(clippy::cast_possible_truncation)]
pub fn generate_test_frame(config: &GrabberConfig, pattern: TestPattern, seq: u32) -> Vec<u8> {
    let geometry = config.geometry;
    let format = config.pixel_format;
    let mut data = vec![0u8; geometry.frame_bytes(format)];

    match pattern {
        TestPattern::GrayRamp => generate_ramp(&mut data, geometry.width, format),
        TestPattern::Solid(value) => data.fill(value),
        TestPattern::Counter => data.fill(seq as u8),
    }

    data
}

/// Fill `data` with a horizontal ramp, one row after another.
fn generate_ramp(data: &mut [u8], width: u32, format: PixelFormat) {
    let bpp = format.bytes_per_pixel();
    let row_bytes = width as usize * bpp;
    if row_bytes == 0 {
        return;
    }

    for row in data.chunks_exact_mut(row_bytes) {
        for (x, pixel) in (0u64..).zip(row.chunks_exact_mut(bpp)) {
            match format {
                PixelFormat::Gray8 => {
                    #[allow(clippy::cast_possible_truncation)]
                    let value = ((x * 255) / u64::from(width)) as u8;
                    pixel.fill(value);
                }
                PixelFormat::Gray16 => {
                    #[allow(clippy::cast_possible_truncation)]
                    let value = ((x * 65535) / u64::from(width)) as u16;
                    pixel.copy_from_slice(&value.to_le_bytes());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Geometry;

    #[test]
    fn test_mock_device_enforces_bounds() {
        let mut device = MockDevice::new();
        device.open().expect("open should succeed");

        device
            .write_native("Window.W", NativeValue::Int(640))
            .expect("640 is within bounds");
        assert!(device
            .write_native("Window.W", NativeValue::Int(4096))
            .is_err());
        assert!(device
            .write_native("ExposureTime", NativeValue::Float(0.001))
            .is_err());
        assert_eq!(
            device.read_native("Window.W").expect("read should succeed"),
            NativeValue::Int(640)
        );
        assert_eq!(device.probe().writes.borrow().len(), 1);
    }

    #[test]
    fn test_mock_device_rejects_kind_mismatch() {
        let mut device = MockDevice::new();
        device.open().expect("open should succeed");
        let err = device
            .write_native("ExposureTime", NativeValue::Int(10))
            .expect_err("int exposure should be rejected");
        assert!(!err.is_fault());
    }

    #[test]
    fn test_absent_device() {
        let mut device = MockDevice::absent();
        assert!(matches!(device.open(), Err(CameraError::DeviceNotFound(_))));
        assert_eq!(device.probe().opens.get(), 0);
    }

    #[test]
    fn test_mock_grabber_rejects_oversized_window() {
        let mut grabber = MockGrabber::new().with_max_geometry(640, 480);
        let mut config = GrabberConfig {
            geometry: Geometry::new(640, 480),
            ..GrabberConfig::default()
        };
        grabber.configure(&config).expect("full window fits");

        config.geometry.x_offset = 8;
        assert!(grabber.configure(&config).is_err());
        assert_eq!(grabber.config().geometry.x_offset, 0);
    }

    #[test]
    fn test_mock_grabber_capture() {
        let mut grabber = MockGrabber::new().with_pattern(TestPattern::Counter);
        grabber
            .configure(&GrabberConfig {
                geometry: Geometry::new(64, 48),
                ..GrabberConfig::default()
            })
            .expect("configure should succeed");
        assert!(grabber.next_buffer(Duration::from_millis(10)).is_err());

        grabber.start_async().expect("start should succeed");
        let first = grabber
            .next_buffer(Duration::from_millis(10))
            .expect("frame should arrive")
            .to_vec();
        let second = grabber
            .next_buffer(Duration::from_millis(10))
            .expect("frame should arrive");
        assert_eq!(first.len(), 64 * 48);
        assert_eq!(first.first(), Some(&0));
        assert_eq!(second.first(), Some(&1));
    }

    #[test]
    fn test_gray16_ramp_is_little_endian() {
        let config = GrabberConfig {
            pixel_format: PixelFormat::Gray16,
            geometry: Geometry::new(4, 1),
            ..GrabberConfig::default()
        };
        let data = generate_test_frame(&config, TestPattern::GrayRamp, 0);
        assert_eq!(data.len(), 8);
        // x = 2 of 4: 65535 * 2 / 4 = 32767
        assert_eq!(data.get(4..6), Some(&[0xff, 0x7f][..]));
    }
}
