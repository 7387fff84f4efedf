//! Fuzz target: button debouncer
//!
//! Drives the debounce state machine with arbitrary edge/tick sequences
//! on a wrapping clock and verifies:
//! - No panics, including across `u32` clock wrap
//! - Qualified presses and releases strictly alternate, starting with a
//!   press
//! - A press is only ever qualified while the input is active
//!
//! cargo fuzz run fuzz_debouncer

#![no_main]

use libfuzzer_sys::fuzz_target;
use watershed::drivers::button::{Debouncer, MonitorState, Qualified};

fuzz_target!(|data: &[u8]| {
    let Some((&window, ops)) = data.split_first() else {
        return;
    };
    let mut d = Debouncer::new(u32::from(window));
    let mut now = u32::MAX - 500;
    let mut active = false;
    let mut last = Qualified::Release;

    for chunk in ops.chunks(2) {
        let op = chunk[0];
        let dt = u32::from(chunk.get(1).copied().unwrap_or(0));
        now = now.wrapping_add(dt);
        let q = if op & 1 == 1 {
            active = op & 2 == 2;
            d.on_edge(active, now)
        } else {
            d.tick(now)
        };
        if let Some(q) = q {
            assert_ne!(q, last, "qualified transitions must alternate");
            last = q;
        }
        if d.state() == MonitorState::ConfirmedPress {
            assert!(active, "confirmed press while inactive");
        }
    }
});
