//! Per-backend translation between generic identifiers and vendor properties.
//!
//! A [`PropertyTranslator`] is built once when a backend instance is created
//! and never changes afterwards. Each [`MappingEntry`] names the vendor
//! property, the vendor's value kind and unit, whether the property may be
//! written, and which collaborators hold authority over it.

use std::collections::HashMap;

use crate::property::{PropertyId, PropertyValue, ValueKind};
use crate::traits::{CameraError, Geometry, NativeKind, NativeValue, Result, TriggerMode};

/// Grabber geometry field mirrored by a dual-authority property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryField {
    /// Capture width.
    Width,
    /// Capture height.
    Height,
    /// Horizontal offset.
    XOffset,
    /// Vertical offset.
    YOffset,
}

impl GeometryField {
    /// Return `geometry` with this field replaced by `value`.
    #[must_use]
    pub const fn apply(self, mut geometry: Geometry, value: u32) -> Geometry {
        match self {
            Self::Width => geometry.width = value,
            Self::Height => geometry.height = value,
            Self::XOffset => geometry.x_offset = value,
            Self::YOffset => geometry.y_offset = value,
        }
        geometry
    }
}

/// Which collaborators a write must reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Only the physical device holds the value.
    Device,
    /// Grabber first, then the physical device; both must accept.
    Dual(GeometryField),
}

/// Whether clients may write a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Readable only.
    ReadOnly,
    /// Readable and writable.
    ReadWrite,
}

/// One generic identifier's vendor-side description.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// Vendor property name.
    pub native: &'static str,
    /// Kind the vendor expects on write.
    pub native_kind: NativeKind,
    /// Generic units per vendor unit.
    pub scale: f64,
    /// Write permission.
    pub access: Access,
    /// Collaborators that hold the value.
    pub route: Route,
}

impl MappingEntry {
    /// Writable property held by the device alone.
    #[must_use]
    pub const fn device(native: &'static str, native_kind: NativeKind) -> Self {
        Self {
            native,
            native_kind,
            scale: 1.0,
            access: Access::ReadWrite,
            route: Route::Device,
        }
    }

    /// Read-only property.
    #[must_use]
    pub const fn read_only(native: &'static str, native_kind: NativeKind) -> Self {
        Self {
            native,
            native_kind,
            scale: 1.0,
            access: Access::ReadOnly,
            route: Route::Device,
        }
    }

    /// Writable integer property shared between grabber and device.
    #[must_use]
    pub const fn dual(native: &'static str, field: GeometryField) -> Self {
        Self {
            native,
            native_kind: NativeKind::Int,
            scale: 1.0,
            access: Access::ReadWrite,
            route: Route::Dual(field),
        }
    }

    /// Declare how many generic units make up one vendor unit.
    #[must_use]
    pub const fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Whether clients may write this property.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Convert a generic value into the vendor's representation.
    pub fn to_native(&self, id: PropertyId, value: &PropertyValue) -> Result<NativeValue> {
        if value.kind() != id.kind() {
            return Err(out_of_range(
                id,
                format!("expected {:?} value, got {:?}", id.kind(), value.kind()),
            ));
        }

        let native = match (value, self.native_kind) {
            (PropertyValue::Integer(v), NativeKind::Int) => {
                NativeValue::Int(i64::from(round_half_up(f64::from(*v) / self.scale)))
            }
            (PropertyValue::Integer(v), NativeKind::Float) => {
                NativeValue::Float(f64::from(*v) / self.scale)
            }
            (PropertyValue::Integer(v), NativeKind::Text) => {
                NativeValue::Text(format!("{}", f64::from(*v) / self.scale))
            }
            (PropertyValue::Float(v), NativeKind::Float) => NativeValue::Float(*v / self.scale),
            (PropertyValue::Float(v), NativeKind::Int) => {
                NativeValue::Int(i64::from(round_half_up(*v / self.scale)))
            }
            (PropertyValue::Mode(code), NativeKind::Mode | NativeKind::Int) => {
                if id == PropertyId::TriggerMode && TriggerMode::from_code(*code).is_none() {
                    return Err(out_of_range(id, format!("unknown trigger mode {code}")));
                }
                NativeValue::Mode(i64::from(*code))
            }
            (PropertyValue::Text(text), NativeKind::Text) => NativeValue::Text(text.clone()),
            (value, kind) => {
                return Err(out_of_range(
                    id,
                    format!("cannot express {value:?} as vendor {kind:?}"),
                ))
            }
        };
        Ok(native)
    }

    /// Convert a vendor value into the identifier's generic kind and unit.
    ///
    /// Conversion follows the kind the vendor actually returned: floats and
    /// numeric strings are rescaled and rounded half up.
    pub fn to_generic(&self, id: PropertyId, value: NativeValue) -> Result<PropertyValue> {
        let generic = match id.kind() {
            ValueKind::Integer => {
                PropertyValue::Integer(round_half_up(self.numeric(&value)? * self.scale))
            }
            ValueKind::Float => PropertyValue::Float(self.numeric(&value)? * self.scale),
            ValueKind::Text => match value {
                NativeValue::Text(text) => PropertyValue::Text(text),
                NativeValue::Int(v) | NativeValue::Mode(v) => PropertyValue::Text(v.to_string()),
                NativeValue::Float(v) => PropertyValue::Text(v.to_string()),
            },
            ValueKind::Mode => match value {
                NativeValue::Mode(code) | NativeValue::Int(code) => {
                    PropertyValue::Mode(u32::try_from(code.max(0)).unwrap_or(u32::MAX))
                }
                other => {
                    return Err(CameraError::Collaborator(format!(
                        "`{}` returned {other:?} for a mode property",
                        self.native
                    )))
                }
            },
        };
        Ok(generic)
    }

    #[allow(clippy::cast_precision_loss)]
    fn numeric(&self, value: &NativeValue) -> Result<f64> {
        match value {
            NativeValue::Int(v) | NativeValue::Mode(v) => Ok(*v as f64),
            NativeValue::Float(v) => Ok(*v),
            NativeValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                CameraError::Collaborator(format!(
                    "`{}` returned non-numeric value `{text}`",
                    self.native
                ))
            }),
        }
    }
}

/// Immutable lookup from generic identifiers to vendor properties.
#[derive(Debug, Clone, Default)]
pub struct PropertyTranslator {
    entries: HashMap<PropertyId, MappingEntry>,
}

impl PropertyTranslator {
    /// Build a translator from its mapping table.
    #[must_use]
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PropertyId, MappingEntry)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up the vendor property for `id`. `None` means this backend does
    /// not support the identifier.
    #[must_use]
    pub fn resolve(&self, id: PropertyId) -> Option<&MappingEntry> {
        self.entries.get(&id)
    }

    /// Supported identifiers in declaration order.
    #[must_use]
    pub fn supported(&self) -> Vec<PropertyId> {
        let mut ids: Vec<PropertyId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Round to the nearest integer with halves rounding up, saturating at the
/// bounds of `u32`. NaN and negative inputs become zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_half_up(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    (value + 0.5).floor().min(f64::from(u32::MAX)) as u32
}

fn out_of_range(id: PropertyId, reason: String) -> CameraError {
    CameraError::PropertyOutOfRange {
        property: id.name().to_owned(),
        reason,
    }
}
