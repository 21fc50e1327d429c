#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

// =============================================================
// Helpers
// =============================================================

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> ViewPoint {
    ViewPoint::new(x, y)
}

fn src(x: f64, y: f64) -> SourcePoint {
    SourcePoint::new(x, y)
}

/// 1600x1200 image in an 800x600 view: base scale 0.5, no offset, so a view
/// point maps to the source point at twice its coordinates.
fn core_with_image() -> EngineCore {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    core.load_image(1600.0, 1200.0).unwrap();
    core
}

/// Triangle A(200,200) B(600,200) C(400,40) in source space.
fn core_with_triangle() -> EngineCore {
    let mut core = core_with_image();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    core.on_pointer_down(pt(300.0, 100.0), Button::Primary);
    core.on_pointer_down(pt(200.0, 20.0), Button::Primary);
    core
}

fn has_action<F>(actions: &[Action], pred: F) -> bool
where
    F: Fn(&Action) -> bool,
{
    actions.iter().any(pred)
}

fn has_render_needed(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::RenderNeeded))
}

fn has_estimate(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::EstimateUpdated(_)))
}

fn has_cursor(actions: &[Action], cursor: Cursor) -> bool {
    has_action(actions, |a| *a == Action::SetCursor(cursor))
}

// =============================================================
// EngineCore: construction and defaults
// =============================================================

#[test]
fn core_new_has_no_image() {
    let core = EngineCore::new();
    assert!(core.viewport().is_none());
    assert!(core.triangle().is_empty());
    assert_eq!(core.calibration(), Calibration::default());
    assert_eq!(core.ui.cursor, Cursor::Crosshair);
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn core_default_view_size_is_zero() {
    let core = EngineCore::default();
    assert_eq!(core.view_size, Size::new(0.0, 0.0));
}

// =============================================================
// View size and image loading
// =============================================================

#[test]
fn set_view_size_without_image_only_records_size() {
    let mut core = EngineCore::new();
    let actions = core.set_view_size(640.0, 480.0);
    assert!(actions.is_empty());
    assert_eq!(core.view_size, Size::new(640.0, 480.0));
}

#[test]
fn set_view_size_rejects_invalid() {
    let mut core = core_with_image();
    let before = *core.viewport().unwrap();
    assert!(core.set_view_size(0.0, 600.0).is_empty());
    assert!(core.set_view_size(f64::NAN, 600.0).is_empty());
    assert_eq!(core.view_size, Size::new(800.0, 600.0));
    assert_eq!(*core.viewport().unwrap(), before);
}

#[test]
fn load_image_before_view_size_fails() {
    let mut core = EngineCore::new();
    let err = core.load_image(1600.0, 1200.0).unwrap_err();
    assert!(matches!(err, EngineError::Viewport(ViewportError::InvalidSize { what: "view", .. })));
    assert!(core.viewport().is_none());
}

#[test]
fn load_image_rejects_empty_image() {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    assert!(matches!(core.load_image(0.0, 100.0), Err(EngineError::Viewport(_))));
}

#[test]
fn load_image_rejects_unrepresentable_scale() {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    let err = core.apply_json(r#"{"op":"load_image","width":1e-310,"height":1e-310}"#).unwrap_err();
    assert!(matches!(err, EngineError::Viewport(ViewportError::DegenerateScale(_))));
    assert!(core.viewport().is_none());

    core.load_image(1600.0, 1200.0).unwrap();
    let actions = core.on_pointer_down(core.viewport().unwrap().view_center(), Button::Primary);
    assert_eq!(actions[0], Action::VertexPlaced { index: 0, point: src(800.0, 600.0) });
}

#[test]
fn set_view_size_keeps_state_on_degenerate_scale() {
    let mut core = core_with_image();
    let before = *core.viewport().unwrap();
    assert!(core.set_view_size(1e-322, 1e-322).is_empty());
    assert_eq!(core.view_size, Size::new(800.0, 600.0));
    assert_eq!(*core.viewport().unwrap(), before);
}

#[test]
fn load_image_fills_view() {
    let core = core_with_image();
    let vp = core.viewport().unwrap();
    assert!(approx_eq(vp.base_scale(), 0.5));
    assert!(approx_eq(vp.zoom(), 1.0));
    assert_eq!(vp.offset(), pt(0.0, 0.0));
}

#[test]
fn load_image_emits_render_needed() {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    let actions = core.load_image(1600.0, 1200.0).unwrap();
    assert!(has_render_needed(&actions));
    assert!(!has_action(&actions, |a| matches!(a, Action::TriangleCleared)));
}

#[test]
fn load_image_clears_previous_triangle() {
    let mut core = core_with_triangle();
    let actions = core.load_image(1000.0, 1000.0).unwrap();
    assert!(core.triangle().is_empty());
    assert!(has_action(&actions, |a| matches!(a, Action::TriangleCleared)));
}

#[test]
fn resize_keeps_source_vertices() {
    let mut core = core_with_triangle();
    let before = core.triangle().vertices().to_vec();
    let actions = core.set_view_size(400.0, 300.0);
    assert!(has_render_needed(&actions));
    assert_eq!(core.triangle().vertices(), before.as_slice());
    // Fit scale 0.25 now: A(200,200) projects to (50,50).
    assert_eq!(core.vertices_in_view()[0], pt(50.0, 50.0));
}

// =============================================================
// Vertex placement
// =============================================================

#[test]
fn pointer_down_without_image_is_noop() {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    assert!(core.on_pointer_down(pt(10.0, 10.0), Button::Primary).is_empty());
    assert!(core.triangle().is_empty());
}

#[test]
fn pointer_down_places_vertex_in_source_space() {
    let mut core = core_with_image();
    let actions = core.on_pointer_down(pt(100.0, 50.0), Button::Primary);
    assert_eq!(actions[0], Action::VertexPlaced { index: 0, point: src(200.0, 100.0) });
    assert!(has_render_needed(&actions));
    assert!(!has_estimate(&actions));
}

#[test]
fn third_vertex_completes_and_estimates() {
    let mut core = core_with_image();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    core.on_pointer_down(pt(300.0, 100.0), Button::Primary);
    let actions = core.on_pointer_down(pt(200.0, 20.0), Button::Primary);

    assert!(core.triangle().is_complete());
    let expected = core.triangle().estimate_solid(&Calibration::default()).unwrap();
    assert!(has_action(&actions, |a| *a == Action::EstimateUpdated(expected.clone())));
    assert_eq!(expected.base_edge, crate::triangle::Edge::AB);
}

#[test]
fn pointer_down_off_vertex_on_complete_triangle_is_noop() {
    let mut core = core_with_triangle();
    let actions = core.on_pointer_down(pt(700.0, 500.0), Button::Primary);
    assert!(actions.is_empty());
    assert_eq!(core.triangle().len(), 3);
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn non_primary_buttons_are_ignored() {
    let mut core = core_with_image();
    assert!(core.on_pointer_down(pt(10.0, 10.0), Button::Secondary).is_empty());
    assert!(core.on_pointer_down(pt(10.0, 10.0), Button::Middle).is_empty());
    assert!(core.triangle().is_empty());
}

#[test]
fn clicks_outside_image_still_place_vertices() {
    let mut core = EngineCore::new();
    core.set_view_size(800.0, 600.0);
    core.load_image(800.0, 300.0).unwrap();
    // At zoom 0.5 the 800x300 image is letterboxed at y = 150..450.
    core.set_zoom(0.5);
    let actions = core.on_pointer_down(pt(0.0, 0.0), Button::Primary);
    assert_eq!(actions[0], Action::VertexPlaced { index: 0, point: src(0.0, -150.0) });
}

// =============================================================
// Dragging and hover
// =============================================================

#[test]
fn press_on_vertex_starts_drag() {
    let mut core = core_with_triangle();
    let actions = core.on_pointer_down(pt(105.0, 100.0), Button::Primary);
    assert_eq!(core.input, InputState::DraggingVertex { index: 0 });
    assert!(has_cursor(&actions, Cursor::Move));
}

#[test]
fn drag_moves_vertex_and_updates_estimate() {
    let mut core = core_with_triangle();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    let actions = core.on_pointer_move(pt(110.0, 120.0));

    assert_eq!(actions[0], Action::VertexMoved { index: 0, point: src(220.0, 240.0) });
    assert!(has_estimate(&actions));
    assert!(has_render_needed(&actions));
    assert_eq!(core.triangle().vertices()[0], src(220.0, 240.0));
}

#[test]
fn drag_ends_on_pointer_up() {
    let mut core = core_with_triangle();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    core.on_pointer_move(pt(110.0, 120.0));
    core.on_pointer_up(pt(110.0, 120.0), Button::Primary);

    assert_eq!(core.input, InputState::Idle);
    // Still over the dropped vertex.
    assert_eq!(core.ui.hovered, Some(0));
    assert_eq!(core.ui.cursor, Cursor::Move);

    let after = core.on_pointer_move(pt(400.0, 400.0));
    assert!(!has_action(&after, |a| matches!(a, Action::VertexMoved { .. })));
    assert!(has_cursor(&after, Cursor::Crosshair));
}

#[test]
fn second_press_during_drag_is_ignored() {
    let mut core = core_with_triangle();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    assert!(core.on_pointer_down(pt(300.0, 100.0), Button::Primary).is_empty());
    assert_eq!(core.input, InputState::DraggingVertex { index: 0 });
}

#[test]
fn pointer_up_without_drag_is_noop() {
    let mut core = core_with_triangle();
    assert!(core.on_pointer_up(pt(100.0, 100.0), Button::Primary).is_empty());
}

#[test]
fn hover_over_vertex_sets_move_cursor() {
    let mut core = core_with_triangle();
    let actions = core.on_pointer_move(pt(300.0, 95.0));
    assert_eq!(core.ui.hovered, Some(1));
    assert!(has_cursor(&actions, Cursor::Move));
    assert!(has_render_needed(&actions));

    let actions = core.on_pointer_move(pt(500.0, 500.0));
    assert_eq!(core.ui.hovered, None);
    assert!(has_cursor(&actions, Cursor::Crosshair));
}

#[test]
fn hover_is_inert_while_incomplete() {
    let mut core = core_with_image();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    let actions = core.on_pointer_move(pt(100.0, 100.0));
    assert!(actions.is_empty());
    assert_eq!(core.ui.hovered, None);
}

#[test]
fn hit_radius_is_in_view_pixels() {
    let mut core = core_with_triangle();
    core.set_zoom(5.0);
    let a = core.vertices_in_view()[0];
    core.on_pointer_down(pt(a.x + 9.0, a.y), Button::Primary);
    assert_eq!(core.input, InputState::DraggingVertex { index: 0 });
}

#[test]
fn zoom_refreshes_hover_under_still_pointer() {
    let mut core = core_with_triangle();
    core.on_pointer_move(pt(300.0, 100.0));
    assert_eq!(core.ui.hovered, Some(1));

    // B moves to (280, 60) at zoom 1.2, out of reach of the pointer.
    let actions = core.zoom_in();
    assert_eq!(core.ui.hovered, None);
    assert!(has_cursor(&actions, Cursor::Crosshair));
    assert_eq!(actions.iter().filter(|a| **a == Action::RenderNeeded).count(), 1);

    let actions = core.reset_zoom();
    assert_eq!(core.ui.hovered, Some(1));
    assert!(has_cursor(&actions, Cursor::Move));
}

#[test]
fn zoom_during_drag_keeps_drag_highlight() {
    let mut core = core_with_triangle();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    core.zoom_in();
    assert_eq!(core.input, InputState::DraggingVertex { index: 0 });
    assert_eq!(core.ui.hovered, Some(0));
    assert_eq!(core.ui.cursor, Cursor::Move);
}

#[test]
fn resize_refreshes_hover() {
    let mut core = core_with_triangle();
    core.on_pointer_move(pt(100.0, 100.0));
    assert_eq!(core.ui.hovered, Some(0));
    // Fit scale 0.25 moves A to (50, 50).
    let actions = core.set_view_size(400.0, 300.0);
    assert_eq!(core.ui.hovered, None);
    assert!(has_cursor(&actions, Cursor::Crosshair));
}

// =============================================================
// Zoom
// =============================================================

#[test]
fn zoom_without_image_is_noop() {
    let mut core = EngineCore::new();
    assert!(core.zoom_in().is_empty());
    assert!(core.zoom_out().is_empty());
    assert!(core.reset_zoom().is_empty());
    assert!(core.set_zoom(2.0).is_empty());
}

#[test]
fn zoom_in_keeps_vertices_on_image() {
    let mut core = core_with_triangle();
    let actions = core.zoom_in();
    assert!(has_render_needed(&actions));
    assert!(approx_eq(core.viewport().unwrap().zoom(), 1.2));

    // Anchored on the view center: offset (-80, -60) at scale 0.6.
    assert_eq!(core.triangle().vertices()[0], src(200.0, 200.0));
    let a = core.vertices_in_view()[0];
    assert!(approx_eq(a.x, 40.0));
    assert!(approx_eq(a.y, 60.0));
}

#[test]
fn reset_zoom_restores_fill() {
    let mut core = core_with_image();
    core.zoom_in();
    core.zoom_in();
    core.reset_zoom();
    let vp = core.viewport().unwrap();
    assert!(approx_eq(vp.zoom(), 1.0));
    assert!(approx_eq(vp.offset().x, 0.0));
    assert!(approx_eq(vp.offset().y, 0.0));
}

#[test]
fn set_zoom_clamps() {
    let mut core = core_with_image();
    core.set_zoom(10.0);
    assert!(approx_eq(core.viewport().unwrap().zoom(), 5.0));
    core.set_zoom(0.01);
    assert!(approx_eq(core.viewport().unwrap().zoom(), 0.5));
}

// =============================================================
// Clear, calibration, detection
// =============================================================

#[test]
fn clear_removes_vertices() {
    let mut core = core_with_triangle();
    core.on_pointer_move(pt(100.0, 100.0));
    let actions = core.clear();
    assert!(core.triangle().is_empty());
    assert!(has_action(&actions, |a| matches!(a, Action::TriangleCleared)));
    assert!(has_cursor(&actions, Cursor::Crosshair));
    assert!(has_render_needed(&actions));
    assert_eq!(core.ui.hovered, None);
}

#[test]
fn clear_on_empty_triangle_only_renders() {
    let mut core = core_with_image();
    assert_eq!(core.clear(), vec![Action::RenderNeeded]);
}

#[test]
fn placement_resumes_after_clear() {
    let mut core = core_with_triangle();
    core.clear();
    let actions = core.on_pointer_down(pt(10.0, 10.0), Button::Primary);
    assert_eq!(actions[0], Action::VertexPlaced { index: 0, point: src(20.0, 20.0) });
}

#[test]
fn set_calibration_rejects_invalid_and_keeps_previous() {
    let mut core = core_with_triangle();
    let bad = Calibration { pixel_size_m: 0.0, ..Calibration::default() };
    assert!(matches!(core.set_calibration(bad), Err(EngineError::Calibration(CalibrationError::PixelSize(_)))));
    assert_eq!(core.calibration(), Calibration::default());
}

#[test]
fn set_calibration_reestimates() {
    let mut core = core_with_triangle();
    let before = core.estimate().unwrap();
    let actions = core.set_calibration(Calibration { k_den: 3.4, ..Calibration::default() }).unwrap();
    let after = core.estimate().unwrap();
    assert!(has_estimate(&actions));
    assert!(approx_eq(after.mass, before.mass * 2.0));
}

#[test]
fn set_calibration_without_triangle_has_no_estimate() {
    let mut core = core_with_image();
    let actions = core.set_calibration(Calibration::default()).unwrap();
    assert!(!has_estimate(&actions));
}

#[test]
fn apply_detected_requires_image() {
    let mut core = EngineCore::new();
    let pts = [src(0.0, 0.0), src(10.0, 0.0), src(5.0, -5.0)];
    assert!(matches!(core.apply_detected(&pts), Err(EngineError::NoImage)));
}

#[test]
fn apply_detected_requires_three_points() {
    let mut core = core_with_image();
    let pts = [src(0.0, 0.0), src(10.0, 0.0)];
    assert!(matches!(core.apply_detected(&pts), Err(EngineError::Solid(SolidError::InvalidVertexCount(2)))));
}

#[test]
fn apply_detected_replaces_triangle() {
    let mut core = core_with_triangle();
    let pts = [src(0.0, 0.0), src(100.0, 0.0), src(50.0, -60.0)];
    let actions = core.apply_detected(&pts).unwrap();
    assert_eq!(core.triangle().vertices(), &pts);
    let placed = actions.iter().filter(|a| matches!(a, Action::VertexPlaced { .. })).count();
    assert_eq!(placed, 3);
    assert!(has_estimate(&actions));
}

#[test]
fn apply_detected_during_drag_resets_hover_and_cursor() {
    let mut core = core_with_triangle();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    assert_eq!(core.ui.cursor, Cursor::Move);

    let pts = [src(1000.0, 1000.0), src(1400.0, 1000.0), src(1200.0, 800.0)];
    let actions = core.apply_detected(&pts).unwrap();

    assert_eq!(core.input, InputState::Idle);
    assert_eq!(core.ui.hovered, None);
    assert_eq!(core.ui.cursor, Cursor::Crosshair);
    assert!(has_cursor(&actions, Cursor::Crosshair));
    assert!(core.scene().markers.iter().all(|m| !m.highlighted));
}

#[test]
fn apply_detected_hovers_vertex_under_pointer() {
    let mut core = core_with_image();
    core.on_pointer_move(pt(500.0, 500.0));
    let pts = [src(1000.0, 1000.0), src(1400.0, 1000.0), src(1200.0, 800.0)];
    core.apply_detected(&pts).unwrap();
    assert_eq!(core.ui.hovered, Some(0));
    assert_eq!(core.ui.cursor, Cursor::Move);
}

// =============================================================
// Queries
// =============================================================

#[test]
fn side_lengths_follow_calibration() {
    let mut core = core_with_image();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary);
    core.on_pointer_down(pt(300.0, 100.0), Button::Primary);
    let sides = core.side_lengths();
    assert_eq!(sides.len(), 1);
    assert!(approx_eq(sides[0].length_px, 400.0));
    assert!(approx_eq(sides[0].length_m, 40.0));
}

#[test]
fn estimate_requires_complete_triangle() {
    let core = core_with_image();
    assert_eq!(core.estimate(), Err(SolidError::InvalidVertexCount(0)));
}

#[test]
fn vertices_in_view_empty_without_image() {
    assert!(EngineCore::new().vertices_in_view().is_empty());
}

// =============================================================
// Commands
// =============================================================

#[test]
fn command_parses_with_default_button() {
    let cmd: Command = serde_json::from_str(r#"{"op":"pointer_down","x":1,"y":2}"#).unwrap();
    assert_eq!(cmd, Command::PointerDown { x: 1.0, y: 2.0, button: Button::Primary });
}

#[test]
fn command_parses_partial_calibration() {
    let cmd: Command = serde_json::from_str(r#"{"op":"set_calibration","pixel_size_m":0.05}"#).unwrap();
    assert_eq!(cmd, Command::SetCalibration(Calibration { pixel_size_m: 0.05, ..Calibration::default() }));
}

#[test]
fn command_serializes_with_op_tag() {
    let json = serde_json::to_value(Command::ZoomIn).unwrap();
    assert_eq!(json, serde_json::json!({ "op": "zoom_in" }));
}

#[test]
fn apply_json_rejects_malformed() {
    let mut core = EngineCore::new();
    assert!(matches!(core.apply_json("{\"op\":\"explode\"}"), Err(EngineError::InvalidCommand(_))));
    assert!(matches!(core.apply_json("not json"), Err(EngineError::InvalidCommand(_))));
}

#[test]
fn apply_json_session_produces_estimate() {
    let mut core = EngineCore::new();
    let session = [
        r#"{"op":"resize_view","width":800,"height":600}"#,
        r#"{"op":"load_image","width":1600,"height":1200}"#,
        r#"{"op":"set_calibration","pixel_size_m":0.05}"#,
        r#"{"op":"pointer_down","x":100,"y":100}"#,
        r#"{"op":"pointer_down","x":150,"y":100}"#,
        r#"{"op":"pointer_down","x":125,"y":70}"#,
    ];
    for line in session {
        core.apply_json(line).unwrap();
    }
    let est = core.estimate().unwrap();
    assert!(approx_eq(est.radius, 2.5));
    assert!(approx_eq(est.height, 3.0));
    assert!((est.volume - 19.63).abs() < 0.01);
    assert!((est.mass - 33.38).abs() < 0.01);
}

#[test]
fn apply_json_detected_command() {
    let mut core = core_with_image();
    let actions = core
        .apply_json(r#"{"op":"detected","vertices":[{"x":0,"y":0},{"x":100,"y":0},{"x":50,"y":-60}]}"#)
        .unwrap();
    assert!(has_estimate(&actions));
    assert!(core.triangle().is_complete());
}

// =============================================================
// Canvas backing store
// =============================================================

#[test]
fn backing_store_scales_by_dpr() {
    assert_eq!(backing_store_size(800.0, 600.0, 2.0), Some((1600, 1200)));
    assert_eq!(backing_store_size(100.4, 50.6, 1.0), Some((100, 51)));
}

#[test]
fn backing_store_rejects_invalid_css_size() {
    assert_eq!(backing_store_size(f64::NAN, 600.0, 1.0), None);
    assert_eq!(backing_store_size(-800.0, 600.0, 1.0), None);
    assert_eq!(backing_store_size(800.0, 0.0, 1.0), None);
    assert_eq!(backing_store_size(1e300, 600.0, 1.0), None);
}
