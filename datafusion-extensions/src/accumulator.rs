use approx_percentile_digest::{factory::ApproxPercentile, percentile_digest::PercentileDigest};
use datafusion::{
    arrow::array::{Array, ArrayRef, BinaryArray, Float64Array},
    error::DataFusionError,
    logical_expr::Accumulator,
    scalar::ScalarValue,
};

/// What an accumulator produces once its group is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorOutput {
    /// The estimated percentile as a float64
    Percentile,
    /// The serialized digest, for later merging
    Digest,
}

pub fn as_float64_array(array: &ArrayRef) -> datafusion::error::Result<&Float64Array> {
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| DataFusionError::Execution("downcasting to Float64Array".into()))
}

pub fn as_binary_array(array: &ArrayRef) -> datafusion::error::Result<&BinaryArray> {
    array
        .as_any()
        .downcast_ref::<BinaryArray>()
        .ok_or_else(|| DataFusionError::Execution("downcasting to BinaryArray".into()))
}

pub fn decode_digest(bytes: &[u8]) -> datafusion::error::Result<PercentileDigest> {
    PercentileDigest::from_bytes(bytes).map_err(|e| DataFusionError::External(Box::new(e)))
}

pub fn digest_to_scalar(digest: &PercentileDigest) -> datafusion::error::Result<ScalarValue> {
    let bytes = digest
        .to_bytes()
        .map_err(|e| DataFusionError::External(Box::new(e)))?;
    Ok(ScalarValue::Binary(Some(bytes)))
}

/// Merges every non-null serialized digest of `states` into `digest`. An unset digest takes the
/// shape of the first one decoded.
fn merge_serialized(
    digest: &mut Option<PercentileDigest>,
    states: &BinaryArray,
) -> datafusion::error::Result<()> {
    for bytes in states.iter().flatten() {
        let other = decode_digest(bytes)?;
        match digest {
            Some(digest) => digest
                .merge(&other)
                .map_err(|e| DataFusionError::Execution(e.to_string()))?,
            None => *digest = Some(other),
        }
    }
    Ok(())
}

/// Accumulates the values of one group into a digest.
#[derive(Debug)]
pub struct PercentileAccumulator {
    function: ApproxPercentile,
    output: AccumulatorOutput,
    digest: PercentileDigest,
}

impl PercentileAccumulator {
    pub fn new(function: ApproxPercentile, output: AccumulatorOutput) -> Self {
        Self {
            digest: function.new_digest(),
            function,
            output,
        }
    }

    pub fn digest(&self) -> &PercentileDigest {
        &self.digest
    }
}

impl Accumulator for PercentileAccumulator {
    fn update_batch(&mut self, values: &[ArrayRef]) -> datafusion::error::Result<()> {
        // the remaining columns hold the constant arguments
        let values = values.first().ok_or_else(|| {
            DataFusionError::Execution("missing values in PercentileAccumulator".into())
        })?;
        let values = as_float64_array(values)?;
        for value in values.iter().flatten() {
            self.digest.insert(value);
        }
        Ok(())
    }

    fn evaluate(&mut self) -> datafusion::error::Result<ScalarValue> {
        match self.output {
            AccumulatorOutput::Percentile => {
                Ok(ScalarValue::Float64(self.function.evaluate(&self.digest)))
            }
            AccumulatorOutput::Digest => digest_to_scalar(&self.digest),
        }
    }

    fn size(&self) -> usize {
        size_of_val(self) + self.digest.heap_size()
    }

    fn state(&mut self) -> datafusion::error::Result<Vec<ScalarValue>> {
        Ok(vec![digest_to_scalar(&self.digest)?])
    }

    fn merge_batch(&mut self, states: &[ArrayRef]) -> datafusion::error::Result<()> {
        let states = states.first().ok_or_else(|| {
            DataFusionError::Execution("missing state in PercentileAccumulator".into())
        })?;
        let states = as_binary_array(states)?;
        // the partially merged digest is kept even when a state fails to decode
        let mut digest = Some(std::mem::replace(
            &mut self.digest,
            self.function.new_digest(),
        ));
        let merged = merge_serialized(&mut digest, states);
        if let Some(digest) = digest {
            self.digest = digest;
        }
        merged
    }
}

/// Merges serialized digests. Takes its shape from the first digest it sees.
#[derive(Debug, Default)]
pub struct DigestMergeAccumulator {
    digest: Option<PercentileDigest>,
}

impl DigestMergeAccumulator {
    pub fn new_non_configured() -> Self {
        Self::default()
    }
}

impl Accumulator for DigestMergeAccumulator {
    fn update_batch(&mut self, values: &[ArrayRef]) -> datafusion::error::Result<()> {
        if values.len() != 1 {
            return Err(DataFusionError::Execution(
                "invalid arguments to DigestMergeAccumulator::update_batch".into(),
            ));
        }
        merge_serialized(&mut self.digest, as_binary_array(&values[0])?)
    }

    fn evaluate(&mut self) -> datafusion::error::Result<ScalarValue> {
        match &self.digest {
            Some(digest) => digest_to_scalar(digest),
            None => Ok(ScalarValue::Binary(None)),
        }
    }

    fn size(&self) -> usize {
        size_of_val(self) + self.digest.as_ref().map_or(0, PercentileDigest::heap_size)
    }

    fn state(&mut self) -> datafusion::error::Result<Vec<ScalarValue>> {
        Ok(vec![self.evaluate()?])
    }

    fn merge_batch(&mut self, states: &[ArrayRef]) -> datafusion::error::Result<()> {
        self.update_batch(states)
    }
}
