use crate::{
    accumulator::{AccumulatorOutput, PercentileAccumulator},
    literal_args::{argument_error, float_arg, int_arg},
};
use approx_percentile_digest::{
    config::DigestConfig,
    factory::{ApproxPercentile, PositionedArg},
};
use datafusion::{
    arrow::datatypes::DataType,
    error::DataFusionError,
    logical_expr::{Accumulator, AggregateUDF, Volatility, function::AccumulatorArgs},
    prelude::*,
};
use std::sync::Arc;

pub const APPROX_PERCENTILE: &str = "approx_percentile";
pub const APPROX_MEDIAN: &str = "approx_median";
pub const MAKE_PERCENTILE_DIGEST: &str = "make_percentile_digest";

/// Serialized digests travel between aggregation stages as a single binary column.
pub fn make_digest_arrow_type() -> DataType {
    DataType::Binary
}

fn make_percentile_accumulator(
    args: AccumulatorArgs,
    config: DigestConfig,
) -> Result<Box<dyn Accumulator>, DataFusionError> {
    let percentile = float_arg(APPROX_PERCENTILE, args.exprs, 1)?;
    let precision = int_arg(APPROX_PERCENTILE, args.exprs, 2)?;
    let function = ApproxPercentile::with_config(percentile, precision, config)
        .map_err(|e| argument_error(APPROX_PERCENTILE, e))?;
    Ok(Box::new(PercentileAccumulator::new(
        function,
        AccumulatorOutput::Percentile,
    )))
}

fn make_median_accumulator(
    args: AccumulatorArgs,
    config: DigestConfig,
) -> Result<Box<dyn Accumulator>, DataFusionError> {
    let precision = int_arg(APPROX_MEDIAN, args.exprs, 1)?;
    let function = ApproxPercentile::with_config(
        PositionedArg::new(0.5, precision.position),
        precision,
        config,
    )
    .map_err(|e| argument_error(APPROX_MEDIAN, e))?;
    Ok(Box::new(PercentileAccumulator::new(
        function,
        AccumulatorOutput::Percentile,
    )))
}

fn make_digest_accumulator(
    args: AccumulatorArgs,
    config: DigestConfig,
) -> Result<Box<dyn Accumulator>, DataFusionError> {
    let precision = int_arg(MAKE_PERCENTILE_DIGEST, args.exprs, 1)?;
    let function = ApproxPercentile::with_config(
        PositionedArg::new(0.5, precision.position),
        precision,
        config,
    )
    .map_err(|e| argument_error(MAKE_PERCENTILE_DIGEST, e))?;
    Ok(Box::new(PercentileAccumulator::new(
        function,
        AccumulatorOutput::Digest,
    )))
}

/// `approx_percentile(value, percentile, precision)`
pub fn make_approx_percentile_udaf(config: DigestConfig) -> AggregateUDF {
    create_udaf(
        APPROX_PERCENTILE,
        vec![DataType::Float64, DataType::Float64, DataType::Int64],
        Arc::new(DataType::Float64),
        Volatility::Immutable,
        Arc::new(move |args: AccumulatorArgs| make_percentile_accumulator(args, config)),
        Arc::new(vec![make_digest_arrow_type()]),
    )
}

/// `approx_median(value, precision)`
pub fn make_approx_median_udaf(config: DigestConfig) -> AggregateUDF {
    create_udaf(
        APPROX_MEDIAN,
        vec![DataType::Float64, DataType::Int64],
        Arc::new(DataType::Float64),
        Volatility::Immutable,
        Arc::new(move |args: AccumulatorArgs| make_median_accumulator(args, config)),
        Arc::new(vec![make_digest_arrow_type()]),
    )
}

/// `make_percentile_digest(value, precision)` returns the serialized digest of each group.
pub fn make_percentile_digest_udaf(config: DigestConfig) -> AggregateUDF {
    create_udaf(
        MAKE_PERCENTILE_DIGEST,
        vec![DataType::Float64, DataType::Int64],
        Arc::new(make_digest_arrow_type()),
        Volatility::Immutable,
        Arc::new(move |args: AccumulatorArgs| make_digest_accumulator(args, config)),
        Arc::new(vec![make_digest_arrow_type()]),
    )
}
