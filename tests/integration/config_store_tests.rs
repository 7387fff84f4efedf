//! `FileConfigStore` against a real filesystem (temp dirs).

use std::fs;

use tempfile::TempDir;
use watershed::adapters::config_file::FileConfigStore;
use watershed::app::ports::ConfigPort;
use watershed::config::{ControllerConfig, EdgeDetection, Level};
use watershed::error::ConfigError;

fn store() -> (TempDir, FileConfigStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path().join("config.json"));
    (dir, store)
}

#[test]
fn missing_file_loads_defaults_and_writes_them_back() {
    let (_dir, store) = store();
    assert!(!store.path().exists());

    let cfg = store.load().unwrap();
    assert_eq!(cfg, ControllerConfig::default());
    assert!(store.path().exists());
    assert_eq!(store.load().unwrap(), cfg);
}

#[test]
fn partial_file_merges_over_defaults() {
    let (_dir, store) = store();
    fs::write(
        store.path(),
        r#"{ "pin_out": 21, "pin_in": null, "edge_detection": "Interrupt" }"#,
    )
    .unwrap();

    let cfg = store.load().unwrap();
    assert_eq!(cfg.pin_out, 21);
    assert_eq!(cfg.pin_in, None);
    assert_eq!(cfg.edge_detection, EdgeDetection::Interrupt);
    assert_eq!(cfg.debounce_ms, ControllerConfig::default().debounce_ms);
}

#[test]
fn garbage_file_is_corrupted() {
    let (_dir, store) = store();
    fs::write(store.path(), b"pin_out = 18").unwrap();
    assert_eq!(store.load(), Err(ConfigError::Corrupted));
}

#[test]
fn save_round_trips_and_leaves_no_temp_file() {
    let (dir, store) = store();
    let cfg = ControllerConfig {
        pin_out: 5,
        active_level: Level::High,
        debounce_ms: 20,
        halt_command: Some(heapless::String::try_from("sudo halt").unwrap()),
        ..ControllerConfig::default()
    };
    store.save(&cfg).unwrap();
    assert_eq!(store.load().unwrap(), cfg);
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn invalid_config_is_not_written() {
    let (_dir, store) = store();
    store.save(&ControllerConfig::default()).unwrap();
    let before = fs::read(store.path()).unwrap();

    let bad = ControllerConfig {
        pin_in: Some(ControllerConfig::default().pin_out),
        ..ControllerConfig::default()
    };
    assert!(matches!(
        store.save(&bad),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn environment_overrides_apply_after_the_file() {
    let (_dir, store) = store();
    fs::write(store.path(), r#"{ "pin_out": 21, "debounce_ms": 40 }"#).unwrap();

    let mut cfg = store.load().unwrap();
    cfg.apply_env([
        ("WATERSHED_DEBOUNCE_MS", "25"),
        ("WATERSHED_PIN_IN", "none"),
        ("HOME", "/root"),
    ])
    .unwrap();
    assert_eq!(cfg.pin_out, 21);
    assert_eq!(cfg.debounce_ms, 25);
    assert_eq!(cfg.pin_in, None);
    assert!(cfg.validate().is_ok());
}
