//! Connection pool size read from `*_POOL_SIZE` variables
//!
//! ```rust
//! use dbkit_core::PoolSize;
//!
//! let size: PoolSize = "20".parse().expect("20 is valid");
//! assert_eq!(size.get(), 20);
//! assert!("0".parse::<PoolSize>().is_err());
//! assert_eq!(PoolSize::default().get(), 10);
//! ```

use std::fmt;
use std::str::FromStr;

/// Upper bound on pooled connections per client
const LIMIT: u8 = 100;

/// Maximum pooled connections, 1 to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize(u8);

impl PoolSize {
    pub const fn new(size: u8) -> Option<Self> {
        match size {
            1..=LIMIT => Some(Self(size)),
            _ => None,
        }
    }

    /// Size in the unit the pool builders take
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        Self(10)
    }
}

impl FromStr for PoolSize {
    type Err = PoolSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let size: u64 = raw
            .parse()
            .map_err(|_| PoolSizeError::NotANumber(raw.to_string()))?;
        u8::try_from(size)
            .ok()
            .and_then(Self::new)
            .ok_or(PoolSizeError::OutOfRange(size))
    }
}

impl fmt::Display for PoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolSizeError {
    #[error("pool size {0} is out of range (1-{LIMIT})")]
    OutOfRange(u64),

    #[error("pool size '{0}' is not a number")]
    NotANumber(String),
}
