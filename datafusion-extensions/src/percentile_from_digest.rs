use crate::{
    accumulator::{as_binary_array, as_float64_array, decode_digest},
    approx_percentile_udaf::make_digest_arrow_type,
};
use approx_percentile_digest::{
    factory::{PositionedArg, check_percentile},
    finalize,
};
use datafusion::{
    arrow::{
        array::{Array, Float64Builder},
        datatypes::DataType,
    },
    error::DataFusionError,
    logical_expr::{ColumnarValue, ScalarUDF, Volatility},
    prelude::*,
};
use std::sync::Arc;

fn percentile_from_digest(values: &[ColumnarValue]) -> Result<ColumnarValue, DataFusionError> {
    if values.len() != 2 {
        return Err(DataFusionError::Execution(
            "wrong number of arguments to percentile_from_digest".into(),
        ));
    }
    let arrays = ColumnarValue::values_to_arrays(values)?;
    let digests = as_binary_array(&arrays[0])?;
    let ratios = as_float64_array(&arrays[1])?;
    let mut result_builder = Float64Builder::with_capacity(digests.len());
    for (bytes, ratio) in digests.iter().zip(ratios.iter()) {
        let (Some(bytes), Some(ratio)) = (bytes, ratio) else {
            result_builder.append_null();
            continue;
        };
        let ratio = check_percentile(PositionedArg::new(ratio, 1))
            .map_err(|e| DataFusionError::Execution(format!("percentile_from_digest: {e}")))?;
        let digest = decode_digest(bytes)?;
        result_builder.append_option(finalize::extract(&digest, ratio));
    }
    Ok(ColumnarValue::Array(Arc::new(result_builder.finish())))
}

pub fn make_percentile_from_digest_udf() -> ScalarUDF {
    create_udf(
        "percentile_from_digest",
        vec![make_digest_arrow_type(), DataType::Float64],
        DataType::Float64,
        Volatility::Immutable,
        Arc::new(&percentile_from_digest),
    )
}
