use anyhow::{Context, Result};
use std::num::NonZeroUsize;

/// Upper bound on the number of counters a single digest may hold, rounded up to whole pages.
pub const DEFAULT_MAX_BUCKETS: usize = 64 * 1024;
/// Largest accepted bucket capacity.
pub const MAX_BUCKETS: usize = 1 << 31;

/// Memory settings shared by every digest of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestConfig {
    pub max_buckets: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

impl DigestConfig {
    pub fn new(max_buckets: usize) -> Self {
        Self {
            max_buckets: max_buckets.clamp(1, MAX_BUCKETS),
        }
    }

    /// Reads `APPROX_PERCENTILE_MAX_BUCKETS`, falling back to the default when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var("APPROX_PERCENTILE_MAX_BUCKETS") {
            Ok(value) => {
                let max_buckets = value
                    .parse::<usize>()
                    .with_context(|| format!("parsing APPROX_PERCENTILE_MAX_BUCKETS={value}"))?;
                Ok(Self::new(max_buckets))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Settings of the shard-parallel driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationConfig {
    pub nb_shards: NonZeroUsize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        let nb_shards = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self { nb_shards }
    }
}

impl AggregationConfig {
    /// Reads `APPROX_PERCENTILE_SHARDS`, falling back to the available parallelism when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var("APPROX_PERCENTILE_SHARDS") {
            Ok(value) => {
                let nb_shards = value
                    .parse::<NonZeroUsize>()
                    .with_context(|| format!("parsing APPROX_PERCENTILE_SHARDS={value}"))?;
                Ok(Self { nb_shards })
            }
            Err(_) => Ok(Self::default()),
        }
    }
}
