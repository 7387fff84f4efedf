//! Fuzz target: config decoding and validation
//!
//! Feeds arbitrary bytes to both persisted config formats (JSON file,
//! postcard NVS blob) and to the environment overlay, verifying:
//! - No panics under arbitrary input
//! - Whatever decodes and validates survives a postcard round-trip
//!
//! cargo fuzz run fuzz_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use watershed::config::ControllerConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = serde_json::from_slice::<ControllerConfig>(data) {
        check(&cfg);
    }
    if let Ok(cfg) = postcard::from_bytes::<ControllerConfig>(data) {
        check(&cfg);
    }
    if let Ok(text) = core::str::from_utf8(data) {
        let mut cfg = ControllerConfig::default();
        let vars = text.lines().filter_map(|l| l.split_once('='));
        if cfg.apply_env(vars).is_ok() {
            let _ = cfg.validate();
        }
    }
});

fn check(cfg: &ControllerConfig) {
    if cfg.validate().is_ok() {
        let bytes = postcard::to_allocvec(cfg).expect("encode valid config");
        let back: ControllerConfig = postcard::from_bytes(&bytes).expect("decode own encoding");
        assert_eq!(&back, cfg);
    }
}
