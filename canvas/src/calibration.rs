//! Physical calibration: pixel size and the volume/density coefficients.

#[cfg(test)]
#[path = "calibration_test.rs"]
mod calibration_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_K_DEN, DEFAULT_K_VOL, DEFAULT_PIXEL_SIZE_M};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("pixel size must be a positive number of meters, got {0}")]
    PixelSize(f64),
    #[error("{name} must be a finite non-negative number, got {value}")]
    Coefficient { name: &'static str, value: f64 },
}

/// Inputs that turn source-pixel geometry into meters, cubic meters and tonnes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Size of one source-image pixel in meters.
    pub pixel_size_m: f64,
    /// Correction applied to the ideal cone volume.
    pub k_vol: f64,
    /// Bulk density (tonnes per cubic meter).
    pub k_den: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { pixel_size_m: DEFAULT_PIXEL_SIZE_M, k_vol: DEFAULT_K_VOL, k_den: DEFAULT_K_DEN }
    }
}

impl Calibration {
    /// Build a validated calibration.
    ///
    /// # Errors
    ///
    /// See [`Calibration::validate`].
    pub fn new(pixel_size_m: f64, k_vol: f64, k_den: f64) -> Result<Self, CalibrationError> {
        let calibration = Self { pixel_size_m, k_vol, k_den };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Check that the pixel size is positive and the coefficients are
    /// finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as a [`CalibrationError`].
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(self.pixel_size_m.is_finite() && self.pixel_size_m > 0.0) {
            return Err(CalibrationError::PixelSize(self.pixel_size_m));
        }
        check_coefficient("k_vol", self.k_vol)?;
        check_coefficient("k_den", self.k_den)?;
        Ok(())
    }
}

fn check_coefficient(name: &'static str, value: f64) -> Result<(), CalibrationError> {
    if value.is_finite() && value >= 0.0 { Ok(()) } else { Err(CalibrationError::Coefficient { name, value }) }
}
