//! Camera lifecycle and acquisition state machine.
//!
//! A [`Camera`] couples one vendor device, one frame grabber and the
//! backend's [`PropertyTranslator`]. Calls are not synchronized internally:
//! each camera must be driven from one thread at a time. A blocked
//! [`CameraDevice::grab`] holds the camera mutably and cannot be interrupted by
//! `stop_recording` or `destroy`; it returns when the grabber yields a buffer
//! or its timeout expires.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::property::{PropertyId, PropertyValue};
use crate::traits::{CameraError, Geometry, GrabberConfig, GrabberPort, NativeDevice, Result};
use crate::translator::{GeometryField, PropertyTranslator, Route};

/// How long `grab` waits for a buffer unless configured otherwise.
pub const DEFAULT_GRAB_TIMEOUT: Duration = Duration::from_secs(5);

/// Acquisition state of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Idle; properties may be changed freely.
    Configurable,
    /// Grabber running, waiting for the first trigger.
    Armed,
    /// Frames are being acquired.
    Recording,
    /// A collaborator reported a fault; only destroy is permitted.
    Error,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configurable => "configurable",
            Self::Armed => "armed",
            Self::Recording => "recording",
            Self::Error => "in error",
        };
        f.write_str(label)
    }
}

/// Uniform client contract over all camera backends.
pub trait CameraDevice {
    /// Name of the backend driving this camera.
    fn backend(&self) -> &str;

    /// Current acquisition state.
    fn state(&self) -> AcquisitionState;

    /// Committed frame width and height.
    fn frame_size(&self) -> (u32, u32);

    /// Bytes copied by each successful `grab`.
    fn frame_bytes(&self) -> usize;

    /// Capture window the grabber currently holds. Differs from
    /// [`CameraDevice::frame_size`] after a partial commit.
    fn grabber_geometry(&self) -> Geometry;

    /// Write a property.
    ///
    /// Window geometry must be accepted by both the grabber and the device.
    /// If the grabber accepts and the device rejects, the grabber keeps the
    /// new value while the camera's committed geometry does not change;
    /// re-read both sides before relying on either.
    fn set_property(&mut self, id: PropertyId, value: PropertyValue) -> Result<()>;

    /// Read a property, converted to its generic kind and unit.
    fn get_property(&self, id: PropertyId) -> Result<PropertyValue>;

    /// Read a property as text of at most `capacity` bytes.
    fn get_text(&self, id: PropertyId, capacity: usize) -> Result<String> {
        let mut text = match self.get_property(id)? {
            PropertyValue::Text(text) => text,
            other => other.to_string(),
        };
        let mut end = capacity.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        Ok(text)
    }

    /// Start the grabber and wait for a trigger (backends with an armed state).
    fn arm(&mut self) -> Result<()>;

    /// Begin acquisition.
    fn start_recording(&mut self) -> Result<()>;

    /// End acquisition.
    fn stop_recording(&mut self) -> Result<()>;

    /// Block until the next frame and copy it into `buffer`.
    ///
    /// Returns the number of bytes written, always [`CameraDevice::frame_bytes`].
    /// Fails with [`CameraError::WindowMismatch`] while the grabber window
    /// disagrees with the committed one; re-apply the window to recover.
    fn grab(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Release the device. Consumes the camera.
    fn destroy(self: Box<Self>) -> Result<()>;
}

/// Options applied when a camera is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraOptions {
    /// Longest wait for a single frame.
    pub grab_timeout: Duration,
    /// Requested depth of the grabber's buffer ring.
    pub buffer_count: u32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            grab_timeout: DEFAULT_GRAB_TIMEOUT,
            buffer_count: GrabberConfig::default().buffer_count,
        }
    }
}

/// Camera engine shared by all backends.
pub struct Camera {
    backend: String,
    translator: PropertyTranslator,
    synthesized: HashMap<PropertyId, PropertyValue>,
    supports_armed: bool,
    device: Box<dyn NativeDevice>,
    grabber: Box<dyn GrabberPort>,
    state: AcquisitionState,
    frame_width: u32,
    frame_height: u32,
    grab_timeout: Duration,
    device_open: bool,
}

impl Camera {
    /// Open the backend's device and prepare `grabber` for it.
    ///
    /// The device's current window is read back and pushed to the grabber so
    /// both sides start out agreeing.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::InitNotFound`] if the vendor device is absent,
    /// or the device's or grabber's error if the window cannot be agreed.
    /// The device is closed again on failure.
    pub fn init(
        backend: &dyn Backend,
        grabber: Box<dyn GrabberPort>,
        options: &CameraOptions,
    ) -> Result<Self> {
        let mut device = backend.create_device();
        device.open().map_err(|err| match err {
            CameraError::DeviceNotFound(detail) => {
                CameraError::InitNotFound(format!("{}: {detail}", backend.name()))
            }
            other => other,
        })?;

        let synthesized = PropertyId::ALL
            .into_iter()
            .filter_map(|id| backend.synthesized(id).map(|value| (id, value)))
            .collect();

        let mut camera = Self {
            backend: backend.name().to_owned(),
            translator: backend.translator(),
            synthesized,
            supports_armed: backend.supports_armed(),
            device,
            grabber,
            state: AcquisitionState::Configurable,
            frame_width: 0,
            frame_height: 0,
            grab_timeout: options.grab_timeout,
            device_open: true,
        };

        let config = GrabberConfig {
            buffer_count: options.buffer_count,
            ..backend.grabber_config()
        };
        if let Err(err) = camera.prepare_grabber(config) {
            if let Err(close_err) = camera.release_device() {
                warn!(backend = %camera.backend, error = %close_err, "close after failed init");
            }
            return Err(err);
        }

        info!(
            backend = %camera.backend,
            width = camera.frame_width,
            height = camera.frame_height,
            "camera initialized"
        );
        Ok(camera)
    }

    /// Change how long `grab` waits for a frame.
    #[must_use]
    pub const fn with_grab_timeout(mut self, timeout: Duration) -> Self {
        self.grab_timeout = timeout;
        self
    }

    /// How long `grab` waits for a frame.
    #[must_use]
    pub const fn grab_timeout(&self) -> Duration {
        self.grab_timeout
    }

    /// Identifiers this camera can read.
    #[must_use]
    pub fn supported_properties(&self) -> Vec<PropertyId> {
        let mut ids = self.translator.supported();
        ids.extend(self.synthesized.keys().copied());
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn prepare_grabber(&mut self, mut config: GrabberConfig) -> Result<()> {
        for id in PropertyId::ALL {
            let Some(entry) = self.translator.resolve(id) else {
                continue;
            };
            let Route::Dual(field) = entry.route else {
                continue;
            };
            let native = self.device.read_native(entry.native)?;
            if let PropertyValue::Integer(value) = entry.to_generic(id, native)? {
                config.geometry = field.apply(config.geometry, value);
            }
        }

        self.grabber.configure(&config)?;
        let geometry = self.grabber.config().geometry;
        self.frame_width = geometry.width;
        self.frame_height = geometry.height;
        Ok(())
    }

    fn release_device(&mut self) -> Result<()> {
        if !self.device_open {
            return Ok(());
        }
        self.device_open = false;
        self.device.close()
    }

    fn ensure_state(&self, operation: &'static str, allowed: &[AcquisitionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CameraError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn ensure_usable(&self, operation: &'static str) -> Result<()> {
        if self.state == AcquisitionState::Error {
            return Err(CameraError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn fail(&mut self, err: &CameraError) {
        warn!(backend = %self.backend, from = %self.state, error = %err, "camera entered error state");
        self.state = AcquisitionState::Error;
    }

    /// Map a collaborator's refusal of a write to the client taxonomy.
    fn write_error(&mut self, id: PropertyId, err: CameraError) -> CameraError {
        if err.is_fault() {
            self.fail(&err);
            return err;
        }
        CameraError::PropertyOutOfRange {
            property: id.name().to_owned(),
            reason: err.to_string(),
        }
    }

    fn start_grabber(&mut self) -> Result<()> {
        if let Err(err) = self.grabber.start_async() {
            if err.is_fault() {
                self.fail(&err);
            }
            return Err(err);
        }
        Ok(())
    }
}

impl CameraDevice for Camera {
    fn backend(&self) -> &str {
        &self.backend
    }

    fn state(&self) -> AcquisitionState {
        self.state
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    fn frame_bytes(&self) -> usize {
        let format = self.grabber.config().pixel_format;
        self.frame_width as usize * self.frame_height as usize * format.bytes_per_pixel()
    }

    fn grabber_geometry(&self) -> Geometry {
        self.grabber.config().geometry
    }

    fn set_property(&mut self, id: PropertyId, value: PropertyValue) -> Result<()> {
        self.ensure_usable("set property")?;
        let entry = self
            .translator
            .resolve(id)
            .filter(|entry| entry.is_writable())
            .cloned()
            .ok_or_else(|| CameraError::PropertyInvalid(id.name().to_owned()))?;
        let native = entry.to_native(id, &value)?;
        debug!(backend = %self.backend, property = %id, %value, native = entry.native, "set property");

        match entry.route {
            Route::Device => {
                if let Err(err) = self.device.write_native(entry.native, native) {
                    return Err(self.write_error(id, err));
                }
            }
            Route::Dual(field) => {
                self.ensure_state("change capture window", &[AcquisitionState::Configurable])?;
                let Some(pixels) = value.as_integer() else {
                    return Err(CameraError::PropertyOutOfRange {
                        property: id.name().to_owned(),
                        reason: "window geometry must be an integer".to_owned(),
                    });
                };

                let current = self.grabber.config();
                let config = GrabberConfig {
                    geometry: field.apply(current.geometry, pixels),
                    ..current.clone()
                };
                if let Err(err) = self.grabber.configure(&config) {
                    return Err(self.write_error(id, err));
                }

                if let Err(err) = self.device.write_native(entry.native, native) {
                    warn!(
                        backend = %self.backend,
                        property = %id,
                        value = pixels,
                        error = %err,
                        "partial commit: grabber accepted value the device rejected"
                    );
                    return Err(self.write_error(id, err));
                }

                match field {
                    GeometryField::Width => self.frame_width = pixels,
                    GeometryField::Height => self.frame_height = pixels,
                    GeometryField::XOffset | GeometryField::YOffset => {}
                }
            }
        }
        Ok(())
    }

    fn get_property(&self, id: PropertyId) -> Result<PropertyValue> {
        self.ensure_usable("get property")?;
        let Some(entry) = self.translator.resolve(id) else {
            return self
                .synthesized
                .get(&id)
                .cloned()
                .ok_or_else(|| CameraError::PropertyInvalid(id.name().to_owned()));
        };

        let native = self.device.read_native(entry.native).map_err(|err| {
            if err.is_fault() {
                err
            } else {
                CameraError::PropertyInvalid(id.name().to_owned())
            }
        })?;
        entry.to_generic(id, native)
    }

    fn arm(&mut self) -> Result<()> {
        self.ensure_state("arm", &[AcquisitionState::Configurable])?;
        if !self.supports_armed {
            return Err(CameraError::Rejected(format!(
                "backend `{}` has no armed state",
                self.backend
            )));
        }
        self.start_grabber()?;
        self.state = AcquisitionState::Armed;
        info!(backend = %self.backend, "camera armed");
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        self.ensure_state(
            "start recording",
            &[AcquisitionState::Configurable, AcquisitionState::Armed],
        )?;
        if self.state == AcquisitionState::Configurable {
            self.start_grabber()?;
        }
        self.state = AcquisitionState::Recording;
        info!(backend = %self.backend, bytes_per_frame = self.frame_bytes(), "recording started");
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.ensure_state(
            "stop recording",
            &[AcquisitionState::Recording, AcquisitionState::Armed],
        )?;
        if let Err(err) = self.grabber.stop() {
            if err.is_fault() {
                self.fail(&err);
            }
            return Err(err);
        }
        self.state = AcquisitionState::Configurable;
        info!(backend = %self.backend, "recording stopped");
        Ok(())
    }

    fn grab(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.ensure_state("grab", &[AcquisitionState::Recording])?;
        let grabber = self.grabber.config().geometry;
        if (grabber.width, grabber.height) != (self.frame_width, self.frame_height) {
            return Err(CameraError::WindowMismatch {
                width: self.frame_width,
                height: self.frame_height,
                grabber_width: grabber.width,
                grabber_height: grabber.height,
            });
        }

        let needed = self.frame_bytes();
        let Some(target) = buffer.get_mut(..needed) else {
            return Err(CameraError::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        };

        let copied = match self.grabber.next_buffer(self.grab_timeout) {
            Ok(frame) => frame
                .get(..needed)
                .ok_or_else(|| {
                    CameraError::Collaborator(format!(
                        "grabber delivered {} bytes, frame needs {needed}",
                        frame.len()
                    ))
                })
                .map(|source| {
                    target.copy_from_slice(source);
                    needed
                }),
            Err(err) => Err(err),
        };

        match copied {
            Err(err) if err.is_fault() => {
                self.fail(&err);
                Err(err)
            }
            other => other,
        }
    }

    fn destroy(mut self: Box<Self>) -> Result<()> {
        if self.state != AcquisitionState::Configurable {
            if let Err(err) = self.grabber.stop() {
                warn!(backend = %self.backend, error = %err, "grabber stop failed during destroy");
            }
        }
        info!(backend = %self.backend, "camera destroyed");
        self.release_device()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if self.device_open {
            warn!(backend = %self.backend, "camera dropped without destroy, closing device");
            if let Err(err) = self.release_device() {
                warn!(backend = %self.backend, error = %err, "device close failed");
            }
        }
    }
}
