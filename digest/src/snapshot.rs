use serde::{Deserialize, Serialize};

use crate::{
    config::{DigestConfig, MAX_BUCKETS},
    error::DigestError,
    percentile_digest::PercentileDigest,
    quantize::MAX_PRECISION,
    store::PAGE_SLOTS,
};

/// Self-describing copy of a digest: sparse buckets plus the exact statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestSnapshot {
    pub precision: u8,
    /// Mantissa bits of the bucket keys, lower than the precision asks for once the digest
    /// coarsened.
    pub resolution_bits: u32,
    pub max_buckets: u64,
    pub count: u64,
    pub saturated: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub buckets: Vec<(i64, u64)>,
}

impl From<&PercentileDigest> for DigestSnapshot {
    fn from(digest: &PercentileDigest) -> Self {
        Self {
            precision: digest.precision(),
            resolution_bits: digest.quantizer().resolution_bits(),
            max_buckets: digest.max_buckets() as u64,
            count: digest.count(),
            saturated: digest.saturated(),
            min: digest.min(),
            max: digest.max(),
            buckets: digest.buckets().collect(),
        }
    }
}

impl TryFrom<DigestSnapshot> for PercentileDigest {
    type Error = DigestError;

    fn try_from(snapshot: DigestSnapshot) -> Result<Self, Self::Error> {
        if snapshot.precision > MAX_PRECISION {
            return Err(DigestError::Decode(format!(
                "precision {} out of range",
                snapshot.precision
            )));
        }
        if snapshot.max_buckets == 0
            || snapshot.max_buckets % PAGE_SLOTS as u64 != 0
            || snapshot.max_buckets > MAX_BUCKETS as u64
        {
            return Err(DigestError::Decode(format!(
                "invalid bucket capacity {}",
                snapshot.max_buckets
            )));
        }
        let config = DigestConfig::new(snapshot.max_buckets as usize);
        let mut digest = PercentileDigest::new(snapshot.precision, &config);
        let quantizer = digest
            .quantizer()
            .with_resolution_bits(snapshot.resolution_bits)
            .ok_or_else(|| {
                DigestError::Decode(format!(
                    "resolution of {} bits out of range for precision {}",
                    snapshot.resolution_bits, snapshot.precision
                ))
            })?;
        let bounds = match (snapshot.min, snapshot.max) {
            (Some(min), Some(max)) => Some((min, max)),
            (None, None) => None,
            _ => {
                return Err(DigestError::Decode(
                    "snapshot has only one of min and max".into(),
                ));
            }
        };
        match &mut digest {
            PercentileDigest::Unpacked(inner) => {
                inner.restore(quantizer, bounds, snapshot.saturated, snapshot.buckets)?
            }
            PercentileDigest::Packed(inner) => {
                inner.restore(quantizer, bounds, snapshot.saturated, snapshot.buckets)?
            }
        }
        if digest.count() != snapshot.count {
            return Err(DigestError::Decode(format!(
                "bucket counts add up to {} but the snapshot records {}",
                digest.count(),
                snapshot.count
            )));
        }
        Ok(digest)
    }
}

impl DigestSnapshot {
    /// Encodes the snapshot as CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, DigestError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| DigestError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DigestError> {
        ciborium::from_reader(bytes).map_err(|e| DigestError::Decode(e.to_string()))
    }
}

impl PercentileDigest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, DigestError> {
        DigestSnapshot::from(self).encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        DigestSnapshot::decode(bytes)?.try_into()
    }
}
