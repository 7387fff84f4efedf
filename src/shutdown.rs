//! One-shot shutdown request latch.
//!
//! Raised by the button monitor on a confirmed press, by the termination
//! signal path, or by an explicit command. Only the first raise produces a
//! [`ShutdownRequest`]; every later raise is a no-op until the process
//! restarts.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Who asked for the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownSource {
    Button = 1,
    Signal = 2,
    Command = 3,
}

impl ShutdownSource {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Button),
            2 => Some(Self::Signal),
            3 => Some(Self::Command),
            _ => None,
        }
    }
}

/// The request carried out of the latch exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub source: ShutdownSource,
}

/// Shared, lock-free latch. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownLatch {
    raised: Arc<AtomicU8>,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the latch. Returns the request only for the first caller.
    pub fn raise(&self, source: ShutdownSource) -> Option<ShutdownRequest> {
        self.raised
            .compare_exchange(0, source as u8, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ShutdownRequest { source })
    }

    /// The request that won the latch, if any.
    pub fn requested(&self) -> Option<ShutdownRequest> {
        ShutdownSource::from_u8(self.raised.load(Ordering::Acquire))
            .map(|source| ShutdownRequest { source })
    }

    pub fn is_raised(&self) -> bool {
        self.requested().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_raise_wins() {
        let latch = ShutdownLatch::new();
        assert!(!latch.is_raised());

        let req = latch.raise(ShutdownSource::Button);
        assert_eq!(req, Some(ShutdownRequest { source: ShutdownSource::Button }));

        assert_eq!(latch.raise(ShutdownSource::Button), None);
        assert_eq!(latch.raise(ShutdownSource::Signal), None);
        assert_eq!(latch.requested().map(|r| r.source), Some(ShutdownSource::Button));
    }

    #[test]
    fn clones_share_state() {
        let latch = ShutdownLatch::new();
        let other = latch.clone();
        assert!(other.raise(ShutdownSource::Signal).is_some());
        assert!(latch.is_raised());
        assert!(latch.raise(ShutdownSource::Command).is_none());
    }
}
