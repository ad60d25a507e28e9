#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn cam(pan_x: f64, pan_y: f64, zoom: f64) -> Camera {
    Camera { pan_x, pan_y, zoom, ..Camera::default() }
}

// --- Point ---

#[test]
fn point_arithmetic() {
    let a = Point::new(3.0, 4.0);
    let b = Point::new(1.0, 1.0);
    assert_eq!(a.sub(b), Point::new(2.0, 3.0));
    assert_eq!(a.add(b), Point::new(4.0, 5.0));
    assert_eq!(a.scale(2.0), Point::new(6.0, 8.0));
    assert!(approx_eq(Point::new(0.0, 0.0).distance(a), 5.0));
}

// --- Rect ---

#[test]
fn rect_from_corners_normalizes() {
    let r = Rect::from_corners(Point::new(50.0, 10.0), Point::new(10.0, 40.0));
    assert_eq!(r, Rect::new(10.0, 10.0, 40.0, 30.0));
}

#[test]
fn rect_contains_border() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(r.contains(Point::new(10.0, 10.0)));
    assert!(!r.contains(Point::new(10.1, 5.0)));
}

#[test]
fn rect_intersects_overlap_and_touch() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
    assert!(a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
    assert!(!a.intersects(&Rect::new(11.0, 0.0, 5.0, 5.0)));
}

#[test]
fn rect_contained_inside_other_intersects() {
    let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
    let inner = Rect::new(40.0, 40.0, 5.0, 5.0);
    assert!(outer.intersects(&inner));
    assert!(inner.intersects(&outer));
}

// --- Camera defaults ---

#[test]
fn camera_default_is_identity() {
    let c = Camera::default();
    assert_eq!(c.pan_x, 0.0);
    assert_eq!(c.pan_y, 0.0);
    assert_eq!(c.zoom, 1.0);
    assert!(c.min_zoom <= c.zoom && c.zoom <= c.max_zoom);
}

#[test]
fn camera_with_limits_swaps_inverted_bounds() {
    let c = Camera::with_limits(3.0, 0.5);
    assert_eq!(c.min_zoom, 0.5);
    assert_eq!(c.max_zoom, 3.0);
    assert_eq!(c.zoom, 1.0);
}

#[test]
fn camera_with_limits_clamps_initial_zoom() {
    let c = Camera::with_limits(2.0, 4.0);
    assert_eq!(c.zoom, 2.0);
}

// --- Conversions ---

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let c = cam(20.0, 10.0, 2.0);
    let world = c.screen_to_world(Point::new(20.0, 10.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn screen_to_world_concrete_scenario() {
    let c = cam(0.0, 0.0, 2.0);
    let world = c.screen_to_world(Point::new(300.0, 300.0));
    assert!(point_approx_eq(world, Point::new(150.0, 150.0)));
}

#[test]
fn world_to_screen_with_pan_and_zoom() {
    let c = cam(20.0, 10.0, 3.0);
    let screen = c.world_to_screen(Point::new(5.0, 5.0));
    assert!(point_approx_eq(screen, Point::new(35.0, 25.0)));
}

#[test]
fn inverse_transform_holds_for_many_points() {
    let cameras = [cam(0.0, 0.0, 1.0), cam(13.7, -42.3, 0.75), cam(-500.0, 250.0, 3.9)];
    let points = [Point::new(0.0, 0.0), Point::new(400.0, 300.0), Point::new(-17.25, 1e4)];
    for c in cameras {
        for p in points {
            let back = c.world_to_screen(c.screen_to_world(p));
            assert!(point_approx_eq(p, back), "{p:?} -> {back:?} with {c:?}");
        }
    }
}

#[test]
fn screen_dist_to_world_ignores_pan() {
    let c = cam(999.0, -999.0, 4.0);
    assert!(approx_eq(c.screen_dist_to_world(8.0), 2.0));
}

#[test]
fn world_rect_to_screen_scales_size() {
    let c = cam(10.0, 20.0, 2.0);
    let r = c.world_rect_to_screen(Rect::new(5.0, 5.0, 100.0, 50.0));
    assert_eq!(r, Rect::new(20.0, 30.0, 200.0, 100.0));
}

// --- Pan / zoom ---

#[test]
fn pan_by_adds_screen_delta() {
    let mut c = cam(0.0, 0.0, 2.0);
    c.pan_by(20.0, -10.0);
    c.pan_by(5.0, 5.0);
    assert_eq!(c.pan_x, 25.0);
    assert_eq!(c.pan_y, -5.0);
}

#[test]
fn zoom_at_preserves_anchor() {
    let mut c = cam(37.0, -12.0, 1.3);
    let anchor = Point::new(420.0, 233.0);
    let before = c.screen_to_world(anchor);
    c.zoom_at(anchor, 1.7);
    let after = c.screen_to_world(anchor);
    assert!(point_approx_eq(before, after));
    assert!(approx_eq(c.zoom, 1.3 * 1.7));
}

#[test]
fn zoom_at_clamps_and_still_preserves_anchor() {
    let mut c = cam(0.0, 0.0, 3.0);
    let anchor = Point::new(100.0, 100.0);
    let before = c.screen_to_world(anchor);
    c.zoom_at(anchor, 10.0);
    assert_eq!(c.zoom, c.max_zoom);
    assert!(point_approx_eq(before, c.screen_to_world(anchor)));

    c.zoom_at(anchor, 0.0001);
    assert_eq!(c.zoom, c.min_zoom);
    assert!(point_approx_eq(before, c.screen_to_world(anchor)));
}

#[test]
fn zoom_at_ignores_invalid_factor() {
    let mut c = cam(5.0, 5.0, 1.5);
    c.zoom_at(Point::new(0.0, 0.0), f64::NAN);
    c.zoom_at(Point::new(0.0, 0.0), -2.0);
    c.zoom_at(Point::new(0.0, 0.0), 0.0);
    assert_eq!(c.zoom, 1.5);
    assert_eq!(c.pan_x, 5.0);
}

#[test]
fn set_zoom_clamps() {
    let mut c = Camera::default();
    c.set_zoom(100.0);
    assert_eq!(c.zoom, c.max_zoom);
    c.set_zoom(f64::INFINITY);
    assert_eq!(c.zoom, c.max_zoom);
}

#[test]
fn center_on_puts_world_point_mid_viewport() {
    let mut c = cam(0.0, 0.0, 2.0);
    c.center_on(Point::new(50.0, 25.0), 800.0, 600.0);
    let screen = c.world_to_screen(Point::new(50.0, 25.0));
    assert!(point_approx_eq(screen, Point::new(400.0, 300.0)));
}
