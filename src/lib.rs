//! Cam-HAL: a uniform control interface for scientific cameras
//!
//! Clients drive every camera through generic property identifiers and a
//! four-state acquisition machine. Each vendor backend supplies a table that
//! maps the generic identifiers onto its native property names, units and
//! routing (camera only, or camera and frame grabber in agreement). Frames are
//! delivered through a frame grabber, with a V4L2 implementation included.

pub mod backend;
pub mod camera;
pub mod config;
pub mod grabber;
pub mod photon_focus;
pub mod property;
pub mod registry;
pub mod traits;
pub mod translator;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use backend::{Backend, DeviceFactory};
pub use camera::{AcquisitionState, Camera, CameraDevice, CameraOptions};
pub use config::CameraConfig;
pub use grabber::{GrabberCapabilities, V4L2Grabber};
pub use photon_focus::PhotonFocus;
pub use property::{PropertyId, PropertyValue, Unit, ValueKind};
pub use registry::BackendRegistry;
pub use traits::{
    CameraError, Geometry, GrabberConfig, GrabberPort, NativeDevice, NativeKind, NativeValue,
    PixelFormat, Result, TriggerMode,
};
pub use translator::{Access, GeometryField, MappingEntry, PropertyTranslator, Route};
