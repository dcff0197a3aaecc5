use micromegas_tracing::prelude::*;

use crate::{
    config::DigestConfig,
    error::ArgumentError,
    finalize,
    percentile_digest::{DigestVariant, PercentileDigest},
    quantize::{MAX_PRECISION, MIN_PRECISION},
};

/// Precision used when the query does not specify one.
pub const DEFAULT_PRECISION: u8 = 1;

/// A literal query argument and the position reported when it is rejected.
///
/// `position` is whatever locator the host supplies. The DataFusion functions pass the
/// zero-based index of the argument in the call, not an offset in the query text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedArg<T> {
    pub value: T,
    pub position: usize,
}

impl<T> PositionedArg<T> {
    pub fn new(value: T, position: usize) -> Self {
        Self { value, position }
    }
}

/// Validated percentile and precision, fixed for the lifetime of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileRequest {
    percentile: f64,
    precision: u8,
}

impl PercentileRequest {
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

pub fn check_percentile(arg: PositionedArg<f64>) -> Result<f64, ArgumentError> {
    if !(0.0..=1.0).contains(&arg.value) {
        return Err(ArgumentError::new(
            arg.position,
            format!("invalid percentile {}, expected a value in [0, 1]", arg.value),
        ));
    }
    Ok(arg.value)
}

pub fn check_precision(arg: PositionedArg<i64>) -> Result<u8, ArgumentError> {
    if arg.value < MIN_PRECISION as i64 || arg.value > MAX_PRECISION as i64 {
        return Err(ArgumentError::new(
            arg.position,
            format!(
                "precision must be between {MIN_PRECISION} and {MAX_PRECISION}, found {}",
                arg.value
            ),
        ));
    }
    Ok(arg.value as u8)
}

/// One `approx_percentile` call site of a compiled query.
///
/// Built once from the literal arguments, then shared by every group: it decides which digest
/// variant the groups use and how their final value is extracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxPercentile {
    request: PercentileRequest,
    variant: DigestVariant,
    config: DigestConfig,
}

impl ApproxPercentile {
    pub fn new(
        percentile: PositionedArg<f64>,
        precision: PositionedArg<i64>,
    ) -> Result<Self, ArgumentError> {
        Self::with_config(percentile, precision, DigestConfig::default())
    }

    pub fn with_default_precision(percentile: PositionedArg<f64>) -> Result<Self, ArgumentError> {
        let precision = PositionedArg::new(DEFAULT_PRECISION as i64, percentile.position);
        Self::new(percentile, precision)
    }

    /// `approx_median`: the 0.5 percentile.
    pub fn median(precision: PositionedArg<i64>) -> Result<Self, ArgumentError> {
        Self::new(PositionedArg::new(0.5, precision.position), precision)
    }

    pub fn with_config(
        percentile: PositionedArg<f64>,
        precision: PositionedArg<i64>,
        config: DigestConfig,
    ) -> Result<Self, ArgumentError> {
        let percentile = check_percentile(percentile)?;
        let precision = check_precision(precision)?;
        let variant = DigestVariant::for_precision(precision);
        debug!(
            "approx_percentile percentile={percentile} precision={precision} variant={variant:?}"
        );
        Ok(Self {
            request: PercentileRequest {
                percentile,
                precision,
            },
            variant,
            config,
        })
    }

    pub fn request(&self) -> PercentileRequest {
        self.request
    }

    pub fn variant(&self) -> DigestVariant {
        self.variant
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub fn new_digest(&self) -> PercentileDigest {
        PercentileDigest::new(self.request.precision, &self.config)
    }

    /// Final value of a group, `None` when the group saw no valid value.
    pub fn evaluate(&self, digest: &PercentileDigest) -> Option<f64> {
        finalize::extract(digest, self.request.percentile)
    }
}
