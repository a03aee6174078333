//! Database-side wait bounds.

use std::fmt;
use std::time::Duration;

/// How long the database should wait for a contended lock.
///
/// Carried as whole seconds, which is what `GET_LOCK` accepts:
/// - negative: wait indefinitely
/// - zero: try once without waiting
/// - positive: wait up to that many seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitTimeout {
    secs: i64, // -1 for infinite
}

impl WaitTimeout {
    pub const INFINITE: Self = Self { secs: -1 };
    pub const ZERO: Self = Self { secs: 0 };

    /// Creates a wait bound from a number of seconds. Any negative value
    /// means "forever".
    pub const fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Self::INFINITE
        } else {
            Self { secs }
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.secs < 0
    }

    pub fn is_zero(&self) -> bool {
        self.secs == 0
    }

    /// The value to bind as the database timeout argument.
    pub fn as_secs(&self) -> i64 {
        self.secs
    }

    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_infinite() {
            None
        } else {
            Some(Duration::from_secs(self.secs as u64))
        }
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl From<i64> for WaitTimeout {
    fn from(secs: i64) -> Self {
        Self::from_secs(secs)
    }
}

impl From<i32> for WaitTimeout {
    fn from(secs: i32) -> Self {
        Self::from_secs(i64::from(secs))
    }
}

impl From<Duration> for WaitTimeout {
    /// Sub-second remainders round up so a short, non-zero wait never
    /// degrades into a try-once.
    fn from(d: Duration) -> Self {
        let mut secs = d.as_secs();
        if d.subsec_nanos() > 0 {
            secs += 1;
        }
        Self {
            secs: i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }
}

impl From<Option<Duration>> for WaitTimeout {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            None => Self::INFINITE,
            Some(d) => Self::from(d),
        }
    }
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("an unbounded wait")
        } else {
            write!(f, "{}s", self.secs)
        }
    }
}
