//! DataFusion surface of the approximate percentile digests.

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

use anyhow::Result;
use approx_percentile_digest::config::DigestConfig;
use datafusion::prelude::SessionContext;
use micromegas_tracing::prelude::*;

/// Accumulators backing the aggregate functions
pub mod accumulator;
/// `approx_percentile`, `approx_median` and `make_percentile_digest` aggregate functions
pub mod approx_percentile_udaf;
/// Parsing of constant function arguments
pub mod literal_args;
/// Merge a column of digests produced with the same precision
pub mod merge_digests_udaf;
/// Estimate a percentile from a serialized digest
pub mod percentile_from_digest;

/// Registers every function of this crate, with digest settings read from the environment.
pub fn register_approx_percentile_functions(ctx: &SessionContext) -> Result<()> {
    let config = DigestConfig::from_env()?;
    register_approx_percentile_functions_with_config(ctx, config);
    Ok(())
}

pub fn register_approx_percentile_functions_with_config(ctx: &SessionContext, config: DigestConfig) {
    ctx.register_udaf(approx_percentile_udaf::make_approx_percentile_udaf(config));
    ctx.register_udaf(approx_percentile_udaf::make_approx_median_udaf(config));
    ctx.register_udaf(approx_percentile_udaf::make_percentile_digest_udaf(config));
    ctx.register_udaf(merge_digests_udaf::make_merge_percentile_digests_udaf());
    ctx.register_udf(percentile_from_digest::make_percentile_from_digest_udf());
    debug!("registered approx_percentile functions max_buckets={}", config.max_buckets);
}
