//! Approximate percentile aggregation: mergeable, memory-bounded digests for GROUP BY execution.
//!
//! Values are quantized into log-linear buckets (see [`quantize`]). Low precisions keep one native
//! counter per bucket ([`unpacked`]), higher precisions pack counters into shared 64-bit words
//! ([`packed`]). A [`factory::ApproxPercentile`] instance validates the query literals once and
//! builds the digests that every [`group_table::GroupStateTable`] routes values into.

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

/// Packed bit-field manipulation
pub mod bitfield;
/// Generic bucket digest over a counter store
pub mod bucket_digest;
/// Runtime configuration read from the environment
pub mod config;
/// Error types
pub mod error;
/// Argument validation and digest variant selection
pub mod factory;
/// Percentile extraction from a completed digest
pub mod finalize;
/// Per-shard map from group key to digest
pub mod group_table;
/// Combination of shard-local group tables
pub mod merge;
/// Digest with bit-packed counters
pub mod packed;
/// Shard-per-worker aggregation driver
pub mod parallel;
/// Closed sum type over the two digest variants
pub mod percentile_digest;
/// Validation of table references held by cached query plans
pub mod plan_cache;
/// Mapping of values to bucket keys
pub mod quantize;
/// Serialized form of a digest, used to ship partial aggregation state
pub mod snapshot;
/// Fixed-size pages of bucket counters
pub mod store;
/// Digest with one native counter per bucket
pub mod unpacked;

pub use error::{Error, Result};
