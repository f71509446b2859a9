use crate::algorithms::ClassificationParams;
use crate::core::DEFAULT_GRID_RESOLUTION;
use crate::utils::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Highest supported hex grid resolution
pub const MAX_GRID_RESOLUTION: u8 = 15;
/// Largest hollow ring searched around an asserted location
pub const MAX_SEARCH_RADIUS_CELLS: u32 = 64;

/// Classifier run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Links at or below this distance are never edges (km)
    pub min_distance_km: f64,
    /// Residual below which a link is suspicious (dB)
    pub threshold_db: f64,
    /// Hex ring radius used to refine asserted locations
    pub search_radius_cells: u32,
    pub grid_resolution: u8,
    /// Minimum histogram weight for an edge
    pub min_samples: u64,
    /// Maximum beaconer links fetched per witness
    pub max_beaconers: usize,
    /// Witnesses per batch
    pub batch_size: usize,
    /// Worker threads for the residual computation
    pub n_workers: usize,
    /// Directory for edge lists and report cards
    pub report_dir: PathBuf,
    /// Also write the full classification results of each batch
    pub include_edge_metadata: bool,
    pub logging: LogConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_distance_km: 1.0,
            threshold_db: -30.0,
            search_radius_cells: 1,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            min_samples: 10,
            max_beaconers: 250,
            batch_size: 1000,
            n_workers: 4,
            report_dir: PathBuf::from("report_cards"),
            include_edge_metadata: false,
            logging: LogConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Classification parameters for the batch path (cheap loss only)
    pub fn params(&self) -> ClassificationParams {
        ClassificationParams {
            min_samples: self.min_samples,
            min_distance_km: self.min_distance_km,
            threshold_db: self.threshold_db,
            search_radius_cells: self.search_radius_cells,
            grid_resolution: self.grid_resolution,
            compute_loss_profile: false,
        }
    }

    /// Check every parameter, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_workers == 0 {
            return Err(ConfigError::invalid("n_workers", self.n_workers, "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", self.batch_size, "must be at least 1"));
        }
        if self.max_beaconers == 0 {
            return Err(ConfigError::invalid("max_beaconers", self.max_beaconers, "must be at least 1"));
        }
        if !self.min_distance_km.is_finite() || self.min_distance_km < 0.0 {
            return Err(ConfigError::invalid(
                "min_distance_km",
                self.min_distance_km,
                "must be a finite, non-negative distance",
            ));
        }
        if !self.threshold_db.is_finite() {
            return Err(ConfigError::invalid("threshold_db", self.threshold_db, "must be finite"));
        }
        if self.search_radius_cells > MAX_SEARCH_RADIUS_CELLS {
            return Err(ConfigError::invalid(
                "search_radius_cells",
                self.search_radius_cells,
                format!("must be at most {}", MAX_SEARCH_RADIUS_CELLS),
            ));
        }
        if self.grid_resolution > MAX_GRID_RESOLUTION {
            return Err(ConfigError::invalid(
                "grid_resolution",
                self.grid_resolution,
                format!("must be at most {}", MAX_GRID_RESOLUTION),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {parameter}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("missing required parameter: {parameter}")]
    MissingParameter { parameter: String },

    #[error("{message}")]
    Io { message: String },

    #[error("{message}")]
    Serialization { message: String },
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Holds the active configuration and tracks where it came from
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    config: ClassifierConfig,
    config_file_path: Option<PathBuf>,
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: ClassifierConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            message: format!("failed to read config file '{}': {}", path.display(), e),
        })?;

        let config: ClassifierConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;

        self.config = config;
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::Serialization {
            message: format!("failed to serialize config: {}", e),
        })?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            message: format!("failed to write config file '{}': {}", path.display(), e),
        })?;

        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the configuration was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::Io {
                message: "no file path set for saving configuration".to_string(),
            }),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Update the residual threshold, returning the previous value
    pub fn set_threshold(&mut self, threshold_db: f64) -> Result<f64, ConfigError> {
        let mut candidate = self.config.clone();
        candidate.threshold_db = threshold_db;
        candidate.validate()?;
        let old_value = std::mem::replace(&mut self.config.threshold_db, threshold_db);
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the minimum edge distance, returning the previous value
    pub fn set_min_distance(&mut self, min_distance_km: f64) -> Result<f64, ConfigError> {
        let mut candidate = self.config.clone();
        candidate.min_distance_km = min_distance_km;
        candidate.validate()?;
        let old_value = std::mem::replace(&mut self.config.min_distance_km, min_distance_km);
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the worker count, returning the previous value
    pub fn set_n_workers(&mut self, n_workers: usize) -> Result<usize, ConfigError> {
        if n_workers == 0 {
            return Err(ConfigError::invalid("n_workers", n_workers, "must be at least 1"));
        }
        let old_value = std::mem::replace(&mut self.config.n_workers, n_workers);
        self.is_modified = true;
        Ok(old_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("link_residual_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold_db, -30.0);
        assert_eq!(config.max_beaconers, 250);
        assert_eq!(config.report_dir, PathBuf::from("report_cards"));
    }

    #[test]
    fn test_params_use_cheap_loss() {
        let config = ClassifierConfig {
            threshold_db: -12.0,
            ..ClassifierConfig::default()
        };
        let params = config.params();
        assert_eq!(params.threshold_db, -12.0);
        assert_eq!(params.min_distance_km, 1.0);
        assert!(!params.compute_loss_profile);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            ClassifierConfig { n_workers: 0, ..Default::default() },
            ClassifierConfig { batch_size: 0, ..Default::default() },
            ClassifierConfig { min_distance_km: -1.0, ..Default::default() },
            ClassifierConfig { threshold_db: f64::NAN, ..Default::default() },
            ClassifierConfig { grid_resolution: 16, ..Default::default() },
            ClassifierConfig { search_radius_cells: u32::MAX, ..Default::default() },
            ClassifierConfig { search_radius_cells: MAX_SEARCH_RADIUS_CELLS + 1, ..Default::default() },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{"threshold_db": -20.0, "n_workers": 2}"#).unwrap();
        let manager = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(manager.config().threshold_db, -20.0);
        assert_eq!(manager.config().n_workers, 2);
        assert_eq!(manager.config().batch_size, 1000);
        assert!(!manager.is_modified());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("saved.json");
        let mut manager = ConfigurationManager::new();
        assert_eq!(manager.set_threshold(-18.0).unwrap(), -30.0);
        assert!(manager.is_modified());
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(reloaded.config(), manager.config());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_setters_keep_old_value_on_error() {
        let mut manager = ConfigurationManager::new();
        assert!(manager.set_min_distance(-2.0).is_err());
        assert!(manager.set_n_workers(0).is_err());
        assert_eq!(manager.config().min_distance_km, 1.0);
        assert_eq!(manager.config().n_workers, 4);
        assert!(!manager.is_modified());
    }

    #[test]
    fn test_update_config_validates_whole_config() {
        let mut manager = ConfigurationManager::new();
        let bad = ClassifierConfig { search_radius_cells: u32::MAX, ..ClassifierConfig::default() };
        assert!(manager.update_config(bad).is_err());
        assert!(!manager.is_modified());

        let moved = ClassifierConfig { report_dir: PathBuf::from("out"), ..manager.config().clone() };
        manager.update_config(moved).unwrap();
        assert_eq!(manager.config().report_dir, PathBuf::from("out"));
        assert!(manager.is_modified());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConfigurationManager::from_file(temp_path("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(ConfigurationManager::new().save().is_err());
    }
}
