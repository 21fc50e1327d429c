#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn default_matches_front_end_defaults() {
    let c = Calibration::default();
    assert_eq!(c.pixel_size_m, 0.1);
    assert_eq!(c.k_vol, 1.0);
    assert_eq!(c.k_den, 1.7);
    assert!(c.validate().is_ok());
}

#[test]
fn new_accepts_valid_values() {
    let c = Calibration::new(0.05, 0.9, 1.6).unwrap();
    assert_eq!(c.pixel_size_m, 0.05);
    assert_eq!(c.k_vol, 0.9);
    assert_eq!(c.k_den, 1.6);
}

#[test]
fn zero_pixel_size_rejected() {
    assert_eq!(Calibration::new(0.0, 1.0, 1.7), Err(CalibrationError::PixelSize(0.0)));
}

#[test]
fn negative_pixel_size_rejected() {
    assert!(matches!(Calibration::new(-0.1, 1.0, 1.7), Err(CalibrationError::PixelSize(_))));
}

#[test]
fn nan_pixel_size_rejected() {
    assert!(matches!(Calibration::new(f64::NAN, 1.0, 1.7), Err(CalibrationError::PixelSize(_))));
}

#[test]
fn negative_k_vol_rejected() {
    assert_eq!(
        Calibration::new(0.1, -1.0, 1.7),
        Err(CalibrationError::Coefficient { name: "k_vol", value: -1.0 })
    );
}

#[test]
fn infinite_k_den_rejected() {
    assert!(matches!(
        Calibration::new(0.1, 1.0, f64::INFINITY),
        Err(CalibrationError::Coefficient { name: "k_den", .. })
    ));
}

#[test]
fn zero_coefficients_allowed() {
    assert!(Calibration::new(0.1, 0.0, 0.0).is_ok());
}

#[test]
fn deserialize_fills_missing_fields_with_defaults() {
    let c: Calibration = serde_json::from_str(r#"{ "pixel_size_m": 0.02 }"#).unwrap();
    assert_eq!(c.pixel_size_m, 0.02);
    assert_eq!(c.k_vol, 1.0);
    assert_eq!(c.k_den, 1.7);
}

#[test]
fn error_messages_name_the_field() {
    let err = Calibration::new(0.1, 1.0, -2.0).unwrap_err();
    assert_eq!(err.to_string(), "k_den must be a finite non-negative number, got -2");
}
