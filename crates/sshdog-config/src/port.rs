//! Validated listen ports.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Lowest port value that is still rejected (privileged range).
const LOWER_BOUND: i64 = 1024;
/// Highest port value that is still rejected.
const UPPER_BOUND: i64 = 65535;

/// A TCP port strictly between 1024 and 65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenPort(u16);

/// Reasons a port candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The candidate text was not an integer.
    #[error("'{value}' is not a port number: {source}")]
    Parse {
        /// Offending text, already trimmed.
        value: String,
        /// Underlying integer parse error.
        #[source]
        source: ParseIntError,
    },
    /// The candidate fell outside the accepted range.
    #[error("port {value} is outside the range 1025-65534")]
    OutOfRange {
        /// Offending value.
        value: i64,
    },
}

impl ListenPort {
    /// Validates an integer candidate.
    pub fn new(value: i64) -> Result<Self, PortError> {
        if value <= LOWER_BOUND || value >= UPPER_BOUND {
            return Err(PortError::OutOfRange { value });
        }
        u16::try_from(value)
            .map(Self)
            .map_err(|_| PortError::OutOfRange { value })
    }

    /// Builds a port from a compiled-in constant.
    ///
    /// # Panics
    ///
    /// Panics when `value` is outside the accepted range. Intended for
    /// `const` items, where the panic becomes a compile error.
    #[must_use]
    pub const fn from_default(value: u16) -> Self {
        assert!(value > 1024 && value < 65535, "default port out of range");
        Self(value)
    }

    /// Returns the raw port number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl FromStr for ListenPort {
    type Err = PortError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let value = trimmed.parse::<i64>().map_err(|source| PortError::Parse {
            value: trimmed.to_owned(),
            source,
        })?;
        Self::new(value)
    }
}

impl fmt::Display for ListenPort {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

impl From<ListenPort> for u16 {
    fn from(port: ListenPort) -> Self {
        port.get()
    }
}
