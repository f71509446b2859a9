use crate::core::{
    Endpoint, SignalHistogram, TerrainProfile, MAX_ANTENNA_HEIGHT_M, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ,
};
use crate::validation::error::ValidationError;

/// Bounds applied to link inputs
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Lowest accepted antenna height after clamping (meters)
    pub min_antenna_height_m: f64,
    /// Highest accepted antenna height after clamping (meters)
    pub max_antenna_height_m: f64,
    /// Exclusive lower frequency bound (Hz)
    pub min_frequency_hz: f64,
    /// Exclusive upper frequency bound (Hz)
    pub max_frequency_hz: f64,
    /// Minimum number of terrain profile samples
    pub min_profile_samples: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_antenna_height_m: 0.0,
            max_antenna_height_m: MAX_ANTENNA_HEIGHT_M,
            min_frequency_hz: MIN_FREQUENCY_HZ,
            max_frequency_hz: MAX_FREQUENCY_HZ,
            min_profile_samples: 2,
        }
    }
}

/// Input checks for a single link
///
/// Every check is a pure function of its input; the first failing rule is
/// reported as a [`ValidationError`].
#[derive(Debug, Clone, Default)]
pub struct LinkValidator {
    config: ValidationConfig,
}

impl LinkValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates and antenna height of one endpoint
    pub fn validate_endpoint(&self, endpoint: Endpoint, lat: f64, lon: f64, height_m: f64) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidLatitude { endpoint, lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::InvalidLongitude { endpoint, lon });
        }
        if !(self.config.min_antenna_height_m..=self.config.max_antenna_height_m).contains(&height_m) {
            return Err(ValidationError::InvalidAntennaHeight { endpoint, height_m });
        }
        Ok(())
    }

    /// Carrier frequency; both bounds are open
    pub fn validate_frequency(&self, frequency_hz: f64) -> Result<(), ValidationError> {
        if !(frequency_hz > self.config.min_frequency_hz && frequency_hz < self.config.max_frequency_hz) {
            return Err(ValidationError::FrequencyOutOfRange { frequency_hz });
        }
        Ok(())
    }

    pub fn validate_histogram(&self, histogram: &SignalHistogram) -> Result<(), ValidationError> {
        if histogram.is_empty() {
            return Err(ValidationError::EmptyHistogram);
        }
        Ok(())
    }

    pub fn validate_profile(&self, profile: Option<&TerrainProfile>) -> Result<(), ValidationError> {
        let profile = profile.ok_or(ValidationError::MissingProfile)?;
        if profile.len() < self.config.min_profile_samples {
            return Err(ValidationError::ProfileTooShort {
                samples: profile.len(),
            });
        }
        if !profile.is_strictly_increasing() {
            return Err(ValidationError::ProfileNotIncreasing);
        }
        Ok(())
    }
}
