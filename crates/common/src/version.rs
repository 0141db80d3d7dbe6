use std::fmt;

use serde::{Deserialize, Serialize};

/// Optimistic concurrency token for an aggregate's state.
///
/// Counts applied events: a fresh state sits at 0 and every applied event
/// adds exactly one. A save is accepted only when the stored version still
/// equals the version the writer loaded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a state that has never been saved.
    pub const fn initial() -> Self {
        Self(0)
    }

    /// Version after the first applied event.
    pub const fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        self.advanced_by(1)
    }

    /// Moves forward by `count` applied events.
    pub fn advanced_by(&self, count: usize) -> Self {
        Self(self.0 + count as i64)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_at_zero() {
        assert_eq!(Version::default(), Version::initial());
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn advancing_counts_events() {
        let loaded = Version::new(3);
        assert_eq!(loaded.advanced_by(0), loaded);
        assert_eq!(loaded.advanced_by(4), Version::new(7));
        assert!(loaded < loaded.next());
    }

    #[test]
    fn displays_as_plain_number() {
        assert_eq!(Version::new(12).to_string(), "12");
    }
}
