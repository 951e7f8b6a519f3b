//! Vendor backend abstraction.

use crate::property::{PropertyId, PropertyValue};
use crate::traits::{GrabberConfig, NativeDevice};
use crate::translator::PropertyTranslator;

/// A camera vendor's implementation of the uniform camera contract.
///
/// The backend describes its property schema and grabber requirements; the
/// shared [`crate::Camera`] engine runs the state machine on top of it.
pub trait Backend {
    /// Registry name, e.g. `"pf"`.
    fn name(&self) -> &str;

    /// Build this backend's property mapping table.
    fn translator(&self) -> PropertyTranslator;

    /// Grabber configuration applied at init, before the device's geometry
    /// is read back and merged in.
    fn grabber_config(&self) -> GrabberConfig;

    /// Value for identifiers the vendor does not expose but the backend can
    /// answer anyway.
    fn synthesized(&self, _id: PropertyId) -> Option<PropertyValue> {
        None
    }

    /// Whether the backend distinguishes "ready to trigger" from "streaming".
    fn supports_armed(&self) -> bool {
        false
    }

    /// A fresh, unopened handle to the vendor device.
    fn create_device(&self) -> Box<dyn NativeDevice>;
}

/// Creates vendor device handles for a given port.
pub type DeviceFactory = Box<dyn Fn(u32) -> Box<dyn NativeDevice>>;
