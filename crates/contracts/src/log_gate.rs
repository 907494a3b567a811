//! Numeric verbosity gate
//!
//! Messages carry a level in 0-255; smaller is more severe. A message is shown
//! only when its level is at or below the configured verbosity.

/// Level of per-attempt reset summaries
pub const LEVEL_RESET_SUMMARY: u8 = 3;
/// Level of rate-limited streak warnings
pub const LEVEL_STREAK_WARNING: u8 = 5;
/// Level of streak recovery notices
pub const LEVEL_RECOVERY: u8 = 8;
/// Level of per-packet segment errors
pub const LEVEL_SEGMENT_DETAIL: u8 = 10;

/// Verbosity threshold fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogGate {
    verbosity: u8,
}

impl LogGate {
    pub const fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Gate that lets every message through
    pub const fn all() -> Self {
        Self { verbosity: u8::MAX }
    }

    pub const fn verbosity(self) -> u8 {
        self.verbosity
    }

    #[inline]
    pub const fn allows(self, level: u8) -> bool {
        level <= self.verbosity
    }
}
