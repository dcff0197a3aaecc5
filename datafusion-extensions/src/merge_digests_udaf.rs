use crate::{accumulator::DigestMergeAccumulator, approx_percentile_udaf::make_digest_arrow_type};
use datafusion::{
    error::DataFusionError,
    logical_expr::{Accumulator, AggregateUDF, Volatility, function::AccumulatorArgs},
    prelude::*,
};
use std::sync::Arc;

fn make_empty_accumulator(_args: AccumulatorArgs) -> Result<Box<dyn Accumulator>, DataFusionError> {
    Ok(Box::new(DigestMergeAccumulator::new_non_configured()))
}

/// Creates a user-defined aggregate function to merge percentile digests.
pub fn make_merge_percentile_digests_udaf() -> AggregateUDF {
    create_udaf(
        "merge_percentile_digests",
        vec![make_digest_arrow_type()],
        Arc::new(make_digest_arrow_type()),
        Volatility::Immutable,
        Arc::new(&make_empty_accumulator),
        Arc::new(vec![make_digest_arrow_type()]),
    )
}
