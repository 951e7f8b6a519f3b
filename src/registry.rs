//! Backend registry: maps backend names to vendor implementations.
//!
//! Clients look a camera up by name and receive it only through the
//! [`CameraDevice`] contract.

use std::collections::HashMap;

use tracing::warn;

use crate::backend::Backend;
use crate::camera::{Camera, CameraDevice, CameraOptions};
use crate::config::CameraConfig;
use crate::traits::{CameraError, GrabberPort, Result};

/// Registered camera backends, keyed by name.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name, replacing any previous backend
    /// of that name.
    pub fn register(&mut self, backend: Box<dyn Backend>) -> Option<Box<dyn Backend>> {
        self.backends.insert(backend.name().to_owned(), backend)
    }

    /// Registered backend names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create a camera with default options.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::InitNotFound`] if no backend is registered under
    /// `name` or its device is absent, or any error from [`Camera::init`].
    pub fn init(
        &self,
        name: &str,
        grabber: Box<dyn GrabberPort>,
    ) -> Result<Box<dyn CameraDevice>> {
        self.init_with_options(name, grabber, &CameraOptions::default())
    }

    /// Create a camera with explicit options.
    ///
    /// # Errors
    ///
    /// See [`BackendRegistry::init`].
    pub fn init_with_options(
        &self,
        name: &str,
        grabber: Box<dyn GrabberPort>,
        options: &CameraOptions,
    ) -> Result<Box<dyn CameraDevice>> {
        let backend = self
            .backends
            .get(name)
            .ok_or_else(|| CameraError::InitNotFound(format!("no backend named `{name}`")))?;

        let camera = Camera::init(backend.as_ref(), grabber, options)?;
        Ok(Box::new(camera))
    }

    /// Create the configured camera and apply its initial properties in name
    /// order. A camera that fails to take a property is destroyed.
    ///
    /// # Errors
    ///
    /// Returns the first initialization, conversion or property error.
    pub fn init_with_config(
        &self,
        config: &CameraConfig,
        grabber: Box<dyn GrabberPort>,
    ) -> Result<Box<dyn CameraDevice>> {
        let values = config.property_values()?;
        let mut camera = self.init_with_options(&config.backend, grabber, &config.options())?;

        for (id, value) in values {
            if let Err(err) = camera.set_property(id, value) {
                warn!(
                    property = %id,
                    error = %err,
                    "initial property rejected, destroying camera"
                );
                if let Err(destroy_err) = camera.destroy() {
                    warn!(error = %destroy_err, "destroy after failed configuration also failed");
                }
                return Err(err);
            }
        }

        Ok(camera)
    }
}
