use approx_percentile_digest::{error::ArgumentError, factory::PositionedArg};
use datafusion::{
    error::DataFusionError,
    physical_plan::{PhysicalExpr, expressions::Literal},
    scalar::ScalarValue,
};
use std::sync::Arc;

/// Value of a constant argument. Non-constant expressions are rejected.
pub fn literal_arg<'a>(
    function_name: &str,
    exprs: &'a [Arc<dyn PhysicalExpr>],
    index: usize,
) -> Result<&'a ScalarValue, DataFusionError> {
    let expr = exprs.get(index).ok_or_else(|| {
        DataFusionError::Plan(format!("{function_name}: missing argument {index}"))
    })?;
    expr.as_any()
        .downcast_ref::<Literal>()
        .map(Literal::value)
        .ok_or_else(|| {
            DataFusionError::Plan(format!(
                "{function_name}: argument {index} must be a constant"
            ))
        })
}

pub fn float_arg(
    function_name: &str,
    exprs: &[Arc<dyn PhysicalExpr>],
    index: usize,
) -> Result<PositionedArg<f64>, DataFusionError> {
    let value = match literal_arg(function_name, exprs, index)? {
        ScalarValue::Float64(Some(value)) => *value,
        ScalarValue::Float32(Some(value)) => *value as f64,
        ScalarValue::Int64(Some(value)) => *value as f64,
        ScalarValue::Int32(Some(value)) => *value as f64,
        other => {
            return Err(DataFusionError::Plan(format!(
                "{function_name}: argument {index} should be a float64, found {other:?}"
            )));
        }
    };
    Ok(PositionedArg::new(value, index))
}

pub fn int_arg(
    function_name: &str,
    exprs: &[Arc<dyn PhysicalExpr>],
    index: usize,
) -> Result<PositionedArg<i64>, DataFusionError> {
    let value = match literal_arg(function_name, exprs, index)? {
        ScalarValue::Int64(Some(value)) => *value,
        ScalarValue::Int32(Some(value)) => *value as i64,
        ScalarValue::UInt64(Some(value)) => i64::try_from(*value).unwrap_or(i64::MAX),
        other => {
            return Err(DataFusionError::Plan(format!(
                "{function_name}: argument {index} should be an int64, found {other:?}"
            )));
        }
    };
    Ok(PositionedArg::new(value, index))
}

pub fn argument_error(function_name: &str, error: ArgumentError) -> DataFusionError {
    DataFusionError::Plan(format!("{function_name}: {error}"))
}
