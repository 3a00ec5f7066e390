use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Nanoseconds since 1970-01-01T00:00:00Z, the backend's native timestamp.
///
/// Serialized as a bare integer so it lands in query strings as `start=1700…`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochNanos(pub i64);

impl From<i64> for EpochNanos {
    fn from(value: i64) -> Self {
        EpochNanos(value)
    }
}

impl FromStr for EpochNanos {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<i64>().map(EpochNanos)
    }
}

impl fmt::Display for EpochNanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
