//! TOML camera configuration.
//!
//! ```toml
//! backend = "pf"
//! grab_timeout_ms = 2000
//!
//! [properties]
//! width = 640
//! exposure = 5000
//! trigger_mode = "freerun"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::CameraOptions;
use crate::property::{PropertyId, PropertyValue, ValueKind};
use crate::traits::{CameraError, Result, TriggerMode};

/// Camera selection and initial settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Registry name of the backend (e.g. "pf").
    pub backend: String,
    /// Longest wait for a single frame, in milliseconds.
    #[serde(default = "default_grab_timeout")]
    pub grab_timeout_ms: u64,
    /// Depth of the grabber's buffer ring.
    #[serde(default = "default_buffer_count")]
    pub buffer_count: u32,
    /// Initial property values by generic name.
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
}

const fn default_grab_timeout() -> u64 {
    5000
}

const fn default_buffer_count() -> u32 {
    4
}

impl CameraConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Config`] for malformed TOML or missing fields.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| CameraError::Config(err.to_string()))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Io`] if the file cannot be read, or
    /// [`CameraError::Config`] if it does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Options for [`crate::Camera::init`].
    #[must_use]
    pub const fn options(&self) -> CameraOptions {
        CameraOptions {
            grab_timeout: Duration::from_millis(self.grab_timeout_ms),
            buffer_count: self.buffer_count,
        }
    }

    /// Initial properties, typed and in name order.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::PropertyInvalid`] for an unknown property name
    /// and [`CameraError::Config`] for a value of the wrong type.
    pub fn property_values(&self) -> Result<Vec<(PropertyId, PropertyValue)>> {
        self.properties
            .iter()
            .map(|(name, value)| {
                let id: PropertyId = name.parse()?;
                Ok((id, typed_value(id, value)?))
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn typed_value(id: PropertyId, value: &toml::Value) -> Result<PropertyValue> {
    let mismatch = |expected: &str| {
        CameraError::Config(format!("`{id}` expects {expected}, got {}", value.type_str()))
    };

    match (id.kind(), value) {
        (ValueKind::Integer, toml::Value::Integer(v)) => u32::try_from(*v)
            .map(PropertyValue::Integer)
            .map_err(|_| mismatch("an unsigned 32-bit integer")),
        (ValueKind::Float, toml::Value::Integer(v)) => Ok(PropertyValue::Float(*v as f64)),
        (ValueKind::Float, toml::Value::Float(v)) => Ok(PropertyValue::Float(*v)),
        (ValueKind::Text, toml::Value::String(s)) => Ok(PropertyValue::Text(s.clone())),
        (ValueKind::Mode, toml::Value::String(s)) if id == PropertyId::TriggerMode => {
            TriggerMode::from_name(s)
                .map(PropertyValue::from)
                .ok_or_else(|| mismatch("auto, software, external or freerun"))
        }
        (ValueKind::Mode, toml::Value::Integer(v)) => u32::try_from(*v)
            .map(PropertyValue::Mode)
            .map_err(|_| mismatch("a mode code")),
        (ValueKind::Integer, _) => Err(mismatch("an integer")),
        (ValueKind::Float, _) => Err(mismatch("a number")),
        (ValueKind::Text, _) => Err(mismatch("a string")),
        (ValueKind::Mode, _) => Err(mismatch("a mode name or code")),
    }
}
