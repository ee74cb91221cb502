// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Process-wide logical clock.
//!
//! Every modification of a pipeline node and every computed output is stamped
//! with a value taken from one monotonically increasing counter. Comparing two
//! stamps tells which event happened last, without any wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

static LOGICAL_CLOCK: AtomicU64 = AtomicU64::new(0);

/// A logical timestamp. `Timestamp::ZERO` means "never computed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The timestamp of something that was never stamped.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Take the next tick of the clock.
    ///
    /// Two calls never return the same value, even across threads.
    pub fn now() -> Self {
        Timestamp(LOGICAL_CLOCK.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Raw counter value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Check whether this timestamp was never set.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_strictly_increasing() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        assert!(b > a);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_zero_is_oldest() {
        assert!(Timestamp::ZERO < Timestamp::now());
        assert!(Timestamp::default().is_zero());
    }
}
