use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn canvas_defaults_without_env() {
    let cfg = CanvasConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, CanvasConfig::default());
    assert!(cfg.snap_to_grid);
    assert_eq!(cfg.preview_limit, DEFAULT_PREVIEW_LIMIT);
}

#[test]
fn canvas_parses_overrides() {
    let cfg = CanvasConfig::from_lookup(lookup(&[
        ("FLOWCANVAS_MIN_ZOOM", "0.25"),
        ("FLOWCANVAS_MAX_ZOOM", "2"),
        ("FLOWCANVAS_GRID_STEP", "10"),
        ("FLOWCANVAS_SNAP_TO_GRID", "off"),
        ("FLOWCANVAS_PREVIEW_LIMIT", "6"),
    ]))
    .unwrap();
    assert!((cfg.min_zoom - 0.25).abs() < 1e-12);
    assert!((cfg.max_zoom - 2.0).abs() < 1e-12);
    assert!((cfg.grid_step - 10.0).abs() < 1e-12);
    assert!(!cfg.snap_to_grid);
    assert_eq!(cfg.preview_limit, 6);
}

#[test]
fn canvas_rejects_bad_values() {
    let err = CanvasConfig::from_lookup(lookup(&[("FLOWCANVAS_SNAP_TO_GRID", "maybe")])).unwrap_err();
    assert_eq!(err, ConfigError::Parse { key: "FLOWCANVAS_SNAP_TO_GRID".into(), value: "maybe".into() });

    let err = CanvasConfig::from_lookup(lookup(&[("FLOWCANVAS_MIN_ZOOM", "-1")])).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref key, .. } if key == "FLOWCANVAS_MIN_ZOOM"));

    let err = CanvasConfig::from_lookup(lookup(&[("FLOWCANVAS_PREVIEW_LIMIT", "four")])).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn backend_requires_base_url() {
    let err = BackendConfig::from_lookup(lookup(&[])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("FLOWCANVAS_API_BASE_URL".into()));
    assert_eq!(err.to_string(), "missing config: env var FLOWCANVAS_API_BASE_URL not set");
}

#[test]
fn backend_parses_overrides_and_trims_url() {
    let cfg = BackendConfig::from_lookup(lookup(&[
        ("FLOWCANVAS_API_BASE_URL", "https://api.example.test/v1/"),
        ("FLOWCANVAS_REQUEST_TIMEOUT_SECS", "42"),
        ("FLOWCANVAS_CONNECT_TIMEOUT_SECS", "7"),
        ("FLOWCANVAS_TRIGGER_POLL_MS", "250"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://api.example.test/v1");
    assert_eq!(cfg.request_timeout_secs, 42);
    assert_eq!(cfg.connect_timeout_secs, 7);
    assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
}

#[test]
fn backend_defaults() {
    let cfg = BackendConfig::new("http://localhost:3000");
    assert_eq!(cfg.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(cfg.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
    assert_eq!(cfg.trigger_poll_ms, TRIGGER_POLL_INTERVAL_MS);
}
