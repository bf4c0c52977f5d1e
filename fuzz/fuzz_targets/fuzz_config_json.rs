//! Fuzz target: `SystemConfig::from_json`
//!
//! Feeds arbitrary bytes as a build-time configuration document.  Parsing
//! must never panic, and anything accepted must pass validation again.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use fridgewatch::config::SystemConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(cfg) = SystemConfig::from_json(text) {
        assert!(cfg.validate().is_ok());
        assert!(cfg.topic_prefix.ends_with('/'));
    }
});
