#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> SourcePoint {
    SourcePoint::new(x, y)
}

#[test]
fn distance_three_four_five() {
    assert!(approx_eq(distance(pt(0.0, 0.0), pt(3.0, 4.0)), 5.0));
}

#[test]
fn distance_is_symmetric() {
    let a = pt(-2.0, 7.5);
    let b = pt(11.0, -3.0);
    assert!(approx_eq(distance(a, b), distance(b, a)));
}

#[test]
fn area_right_triangle() {
    assert!(approx_eq(triangle_area(pt(0.0, 0.0), pt(4.0, 0.0), pt(0.0, 3.0)), 6.0));
}

#[test]
fn area_is_orientation_independent() {
    let cw = triangle_area(pt(0.0, 0.0), pt(100.0, 0.0), pt(50.0, -60.0));
    let ccw = triangle_area(pt(0.0, 0.0), pt(50.0, -60.0), pt(100.0, 0.0));
    assert!(approx_eq(cw, 3000.0));
    assert!(approx_eq(ccw, 3000.0));
}

#[test]
fn area_collinear_is_zero() {
    assert_eq!(triangle_area(pt(0.0, 0.0), pt(1.0, 1.0), pt(2.0, 2.0)), 0.0);
}

#[test]
fn height_over_horizontal_base() {
    assert!(approx_eq(triangle_height(pt(0.0, 0.0), pt(100.0, 0.0), pt(50.0, -60.0)), 60.0));
}

#[test]
fn height_over_slanted_base_matches_perpendicular_distance() {
    // Apex (0, 10) over the line y = x: perpendicular distance is 10 / sqrt(2).
    let h = triangle_height(pt(0.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0));
    assert!(approx_eq(h, 10.0 / 2.0_f64.sqrt()));
}

#[test]
fn height_zero_length_base_is_zero() {
    assert_eq!(triangle_height(pt(5.0, 5.0), pt(5.0, 5.0), pt(0.0, 0.0)), 0.0);
}

#[test]
fn midpoint_of_segment() {
    assert_eq!(midpoint(pt(0.0, 0.0), pt(10.0, -4.0)), pt(5.0, -2.0));
}
