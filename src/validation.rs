//! Frame validation utilities for test pattern verification.
//!
//! This module provides functions to check that grabbed frames contain
//! expected test patterns. Useful for integration testing with virtual
//! capture devices and mock grabbers.

use crate::traits::{CameraError, Geometry, PixelFormat, Result};

/// Sample spacing along the validated row, in pixels.
const SAMPLE_STEP: usize = 10;

/// Allowed backwards step between samples, as a fraction of full scale.
const RAMP_TOLERANCE: f64 = 0.01;

/// Minimum rise across the row, as a fraction of full scale.
const RAMP_MIN_RISE: f64 = 0.2;

/// Validates that a frame contains a horizontal gray ramp.
///
/// Samples the center row and verifies that intensity increases from left to
/// right (allowing small rounding steps backwards) and that the overall rise
/// is significant, so a solid frame does not pass.
///
/// # Errors
///
/// Returns [`CameraError::Validation`] if:
/// - The frame is shorter than `geometry` requires
/// - The intensity decreases along the row
/// - The total intensity change is too small
pub fn validate_gray_ramp(frame: &[u8], geometry: &Geometry, format: PixelFormat) -> Result<()> {
    let needed = geometry.frame_bytes(format);
    if frame.len() < needed {
        return Err(CameraError::Validation(format!(
            "frame has {} bytes, geometry needs {needed}",
            frame.len()
        )));
    }

    let bpp = format.bytes_per_pixel();
    let width = geometry.width as usize;
    let center_y = geometry.height as usize / 2;
    let full_scale = f64::from((1u32 << format.bit_depth()) - 1);

    let mut first: Option<f64> = None;
    let mut prev: Option<f64> = None;

    for x in (0..width).step_by(SAMPLE_STEP) {
        let offset = (center_y * width + x) * bpp;
        let value = sample(frame, offset, format).ok_or_else(|| {
            CameraError::Validation(format!("failed to read pixel at ({x}, {center_y})"))
        })?;

        if let Some(prev) = prev {
            if value < RAMP_TOLERANCE.mul_add(-full_scale, prev) {
                return Err(CameraError::Validation(format!(
                    "ramp not increasing at x={x}: {value} < previous {prev}"
                )));
            }
        }
        first.get_or_insert(value);
        prev = Some(value);
    }

    if let (Some(first), Some(last)) = (first, prev) {
        let rise = last - first;
        if rise < RAMP_MIN_RISE * full_scale {
            return Err(CameraError::Validation(format!(
                "insufficient intensity change for ramp: {rise}"
            )));
        }
    }

    Ok(())
}

/// Validates that every byte of a frame equals `value`.
///
/// # Errors
///
/// Returns [`CameraError::Validation`] at the first differing byte or for an
/// empty frame.
pub fn validate_uniform(frame: &[u8], value: u8) -> Result<()> {
    if frame.is_empty() {
        return Err(CameraError::Validation(
            "cannot validate empty frame".to_owned(),
        ));
    }

    frame
        .iter()
        .position(|&b| b != value)
        .map_or(Ok(()), |index| {
            Err(CameraError::Validation(format!(
                "byte {index} is {:?}, expected {value}",
                frame.get(index)
            )))
        })
}

/// Read one pixel at byte `offset`.
fn sample(frame: &[u8], offset: usize, format: PixelFormat) -> Option<f64> {
    match format {
        PixelFormat::Gray8 => frame.get(offset).map(|&v| f64::from(v)),
        PixelFormat::Gray16 => {
            let bytes = frame.get(offset..offset + 2)?;
            let lo = *bytes.first()?;
            let hi = *bytes.get(1)?;
            Some(f64::from(u16::from_le_bytes([lo, hi])))
        }
    }
}
