//! Photon Focus backend.
//!
//! Photon Focus cameras speak Camera Link and are read out through a separate
//! frame grabber. The vendor library exposes properties by dotted name; the
//! window geometry must agree between camera and grabber, exposure and trigger
//! settings bypass the grabber. Exposure is reported in milliseconds.

use crate::backend::{Backend, DeviceFactory};
use crate::property::{PropertyId, PropertyValue};
use crate::traits::{GrabberConfig, NativeDevice, NativeKind, PixelFormat, TriggerMode};
use crate::translator::{GeometryField, MappingEntry, PropertyTranslator};

/// Microseconds per vendor millisecond.
const MS_TO_US: f64 = 1000.0;

/// Photon Focus camera on one Camera Link port.
pub struct PhotonFocus {
    port: u32,
    factory: DeviceFactory,
}

impl PhotonFocus {
    /// Registry name.
    pub const NAME: &'static str = "pf";

    /// Create the backend for `port`; `factory` binds the vendor library.
    #[must_use]
    pub fn new<F>(port: u32, factory: F) -> Self
    where
        F: Fn(u32) -> Box<dyn NativeDevice> + 'static,
    {
        Self {
            port,
            factory: Box::new(factory),
        }
    }

    /// Port this backend opens.
    #[must_use]
    pub const fn port(&self) -> u32 {
        self.port
    }
}

impl Backend for PhotonFocus {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn translator(&self) -> PropertyTranslator {
        use NativeKind::{Float, Int, Mode, Text};

        PropertyTranslator::new([
            (PropertyId::Name, MappingEntry::read_only("CameraName", Text)),
            (PropertyId::Width, MappingEntry::dual("Window.W", GeometryField::Width)),
            (PropertyId::WidthMin, MappingEntry::read_only("Window.W.Min", Int)),
            (PropertyId::WidthMax, MappingEntry::read_only("Window.W.Max", Int)),
            (PropertyId::Height, MappingEntry::dual("Window.H", GeometryField::Height)),
            (PropertyId::HeightMin, MappingEntry::read_only("Window.H.Min", Int)),
            (PropertyId::HeightMax, MappingEntry::read_only("Window.H.Max", Int)),
            (PropertyId::XOffset, MappingEntry::dual("Window.X", GeometryField::XOffset)),
            (PropertyId::XOffsetMin, MappingEntry::read_only("Window.X.Min", Int)),
            (PropertyId::XOffsetMax, MappingEntry::read_only("Window.X.Max", Int)),
            (PropertyId::YOffset, MappingEntry::dual("Window.Y", GeometryField::YOffset)),
            (PropertyId::YOffsetMin, MappingEntry::read_only("Window.Y.Min", Int)),
            (PropertyId::YOffsetMax, MappingEntry::read_only("Window.Y.Max", Int)),
            (
                PropertyId::Exposure,
                MappingEntry::device("ExposureTime", Float).scaled(MS_TO_US),
            ),
            (
                PropertyId::ExposureMin,
                MappingEntry::read_only("ExposureTime.Min", Float).scaled(MS_TO_US),
            ),
            (
                PropertyId::ExposureMax,
                MappingEntry::read_only("ExposureTime.Max", Float).scaled(MS_TO_US),
            ),
            (
                PropertyId::Delay,
                MappingEntry::device("Trigger.Delay", Float).scaled(MS_TO_US),
            ),
            (
                PropertyId::DelayMin,
                MappingEntry::read_only("Trigger.Delay.Min", Float).scaled(MS_TO_US),
            ),
            (
                PropertyId::DelayMax,
                MappingEntry::read_only("Trigger.Delay.Max", Float).scaled(MS_TO_US),
            ),
            (PropertyId::FrameRate, MappingEntry::device("FrameRate", Text)),
            (PropertyId::TriggerMode, MappingEntry::device("Trigger.Source", Mode)),
        ])
    }

    fn grabber_config(&self) -> GrabberConfig {
        GrabberConfig {
            pixel_format: PixelFormat::Gray8,
            trigger_mode: TriggerMode::FreeRun,
            asynchronous: true,
            ..GrabberConfig::default()
        }
    }

    fn synthesized(&self, id: PropertyId) -> Option<PropertyValue> {
        match id {
            PropertyId::BitDepth => Some(PropertyValue::Integer(8)),
            _ => None,
        }
    }

    fn create_device(&self) -> Box<dyn NativeDevice> {
        (self.factory)(self.port)
    }
}
