use std::time::Duration;

use chrono::{Local, Offset};

/// Interpreter settings fixed at construction time.
#[derive(Clone, Debug)]
pub struct Config {
    /// Nested script calls allowed before a stack-overflow error.
    pub max_call_depth: usize,
    /// Allocations between automatic collections.
    pub gc_threshold: usize,
    /// Report runtime errors outside `try` through the host.
    pub show_errors: bool,
    /// Wall-clock budget enforced by [`crate::DefaultHost`]; `None` is unlimited.
    pub timeout: Option<Duration>,
    /// Fixed locale offset east of GMT, used when parsing and formatting local dates.
    pub gmt_offset_minutes: i32,
}

impl Config {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;
    pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

    pub fn with_gmt_offset(mut self, minutes: i32) -> Self {
        self.gmt_offset_minutes = minutes;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            gc_threshold: Self::DEFAULT_GC_THRESHOLD,
            show_errors: true,
            timeout: None,
            gmt_offset_minutes: local_gmt_offset_minutes(),
        }
    }
}

/// Current local zone offset. Sampled once; daylight saving changes are not tracked.
pub fn local_gmt_offset_minutes() -> i32 {
    Local::now().offset().fix().local_minus_utc() / 60
}
