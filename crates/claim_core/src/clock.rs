//! Time source port.
//!
//! The engine never reads the wall clock on its own; every time-dependent
//! operation takes a `now` argument. [`crate::realm::Realm`] reads a
//! [`Clock`] once per call and threads the value through.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::Timestamp;

/// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}
