//! Error taxonomy for link evaluation and batch runs
//!
//! Per-link failures ([`LinkError`]) skip the link and let the batch continue.
//! Batch-level failures ([`FatalError`]) abort the whole run.

use crate::core::{Endpoint, HotspotId};
use crate::propagation::PropagationError;
use crate::utils::config::ConfigError;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Input checks that reject a link before or after refinement
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid latitude for {endpoint}: {lat}")]
    InvalidLatitude { endpoint: Endpoint, lat: f64 },

    #[error("invalid longitude for {endpoint}: {lon}")]
    InvalidLongitude { endpoint: Endpoint, lon: f64 },

    #[error("invalid asserted height for {endpoint}: {height_m}")]
    InvalidAntennaHeight { endpoint: Endpoint, height_m: f64 },

    #[error("terrain profile generation failed")]
    MissingProfile,

    #[error("terrain profile is too short: {samples} samples")]
    ProfileTooShort { samples: usize },

    #[error("terrain profile distances are not strictly increasing")]
    ProfileNotIncreasing,

    #[error("frequency out of expected range: {frequency_hz} Hz")]
    FrequencyOutOfRange { frequency_hz: f64 },

    #[error("invalid or empty signal histogram")]
    EmptyHistogram,

    #[error("all signal histogram weights are zero")]
    ZeroHistogramWeight,
}

/// How the batch reacts to a per-link failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Skip the link and log it
    Skip,
    /// Skip the link; expected condition, logged below warning level
    SkipQuietly,
}

/// Failure evaluating a single link
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("invalid assertion data: {0}")]
    Validation(#[from] ValidationError),

    #[error("no candidate cells around {endpoint} at ({lat}, {lon}) with radius {radius}")]
    Geometry {
        endpoint: Endpoint,
        lat: f64,
        lon: f64,
        radius: u32,
    },

    #[error("{operation} failed: {source}")]
    Computation {
        operation: &'static str,
        #[source]
        source: PropagationError,
    },

    #[error("no asserted coordinates for {beaconer}->{witness}")]
    MissingAssertion { beaconer: HotspotId, witness: HotspotId },
}

impl LinkError {
    pub fn computation(operation: &'static str) -> impl FnOnce(PropagationError) -> LinkError {
        move |source| LinkError::Computation { operation, source }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            LinkError::MissingAssertion { .. } => Recovery::SkipQuietly,
            LinkError::Validation(_) | LinkError::Geometry { .. } | LinkError::Computation { .. } => {
                Recovery::Skip
            }
        }
    }

    /// Short label used for batch counters and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            LinkError::Validation(_) => "validation",
            LinkError::Geometry { .. } => "geometry",
            LinkError::Computation { .. } => "computation",
            LinkError::MissingAssertion { .. } => "missing_assertion",
        }
    }

    /// Emit the single log line for a skipped link
    pub fn log_skip(&self, beaconer: &HotspotId, witness: &HotspotId) {
        match (self.recovery(), self) {
            (Recovery::SkipQuietly, _) => {
                debug!(%beaconer, %witness, "{}", self);
            }
            (Recovery::Skip, LinkError::Computation { .. }) => {
                warn!(%beaconer, %witness, kind = self.kind(), "skipping link: {}", self);
            }
            (Recovery::Skip, _) => {
                info!(%beaconer, %witness, kind = self.kind(), "skipping link: {}", self);
            }
        }
    }
}

/// Failure that aborts a whole run
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("link source unavailable: {0}")]
    LinkSource(String),

    #[error("terrain data source unavailable: {0}")]
    TerrainSource(#[source] PropagationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_assertion_is_quiet() {
        let err = LinkError::MissingAssertion {
            beaconer: "b".into(),
            witness: "w".into(),
        };
        assert_eq!(err.recovery(), Recovery::SkipQuietly);
        assert_eq!(err.kind(), "missing_assertion");
    }

    #[test]
    fn test_failures_map_to_named_variants() {
        let err: LinkError = ValidationError::FrequencyOutOfRange { frequency_hz: 1000e6 }.into();
        assert_eq!(err.recovery(), Recovery::Skip);
        assert_eq!(err.kind(), "validation");

        let err = LinkError::computation("point-to-point loss")(PropagationError::ModelFailure {
            details: "no convergence".to_string(),
        });
        assert_eq!(err.kind(), "computation");
        assert!(err.to_string().contains("point-to-point loss"));
    }

    #[test]
    fn test_validation_messages_name_endpoint() {
        let err = ValidationError::InvalidLatitude {
            endpoint: Endpoint::Witness,
            lat: 91.0,
        };
        assert_eq!(err.to_string(), "invalid latitude for witness: 91");
    }
}
