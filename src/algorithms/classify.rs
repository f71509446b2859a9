//! Residual computation and edge classification for a single link

use crate::algorithms::refine::{clamp_antenna_height, GeospatialRefiner};
use crate::algorithms::statistics::aggregate;
use crate::core::{AssertedLink, ClassificationResult, Endpoint, DEFAULT_GRID_RESOLUTION};
use crate::propagation::{HexGrid, PropagationError, TerrainModel};
use crate::validation::error::{LinkError, ValidationError};
use crate::validation::rules::LinkValidator;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Thresholds and refinement settings for classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationParams {
    /// Minimum total histogram weight for an edge
    pub min_samples: u64,
    /// Links must be strictly longer than this to be edges (km)
    pub min_distance_km: f64,
    /// Residual must be strictly below this to be an edge (dB)
    pub threshold_db: f64,
    /// Ring radius used when refining asserted locations
    pub search_radius_cells: u32,
    pub grid_resolution: u8,
    /// Use the cumulative loss profile instead of the point-to-point loss
    pub compute_loss_profile: bool,
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            min_samples: 10,
            min_distance_km: 3.0,
            threshold_db: -15.0,
            search_radius_cells: 3,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            compute_loss_profile: false,
        }
    }
}

/// Decision rule: all three conditions are required
pub fn is_edge(total_weight: u64, residual_db: f64, distance_km: f64, params: &ClassificationParams) -> bool {
    total_weight >= params.min_samples && residual_db < params.threshold_db && distance_km > params.min_distance_km
}

/// Path loss implied by the mean RSSI and the asserted radio parameters (dB)
pub fn measured_loss_db(link: &AssertedLink, rssi_mean_dbm: f64) -> f64 {
    -(rssi_mean_dbm - link.witness_gain_db() - link.beaconer_tx_power_dbm - link.beaconer_gain_db())
}

/// Evaluates links against the terrain model
pub struct ClassificationEngine<'a> {
    terrain: &'a dyn TerrainModel,
    grid: &'a dyn HexGrid,
    validator: LinkValidator,
    params: ClassificationParams,
}

impl<'a> ClassificationEngine<'a> {
    pub fn new(terrain: &'a dyn TerrainModel, grid: &'a dyn HexGrid, params: ClassificationParams) -> Self {
        Self {
            terrain,
            grid,
            validator: LinkValidator::new(),
            params,
        }
    }

    /// Classify one link. Any failure skips the link, not the batch.
    pub fn classify(&self, link: &AssertedLink) -> Result<ClassificationResult, LinkError> {
        let tx_height_m = clamp_antenna_height(link.beaconer_elevation_m);
        let rx_height_m = clamp_antenna_height(link.witness_elevation_m);

        let (b, w) = (&link.beaconer_location, &link.witness_location);
        self.validator
            .validate_endpoint(Endpoint::Beaconer, b.lat, b.lon, tx_height_m)?;
        self.validator
            .validate_endpoint(Endpoint::Witness, w.lat, w.lon, rx_height_m)?;
        self.validator.validate_frequency(link.frequency_hz)?;
        self.validator.validate_histogram(&link.signal_hist)?;

        let refiner = GeospatialRefiner::new(self.grid, self.terrain, self.params.grid_resolution);
        let radius = self.params.search_radius_cells;
        let tx = refiner.refine(b.lon, b.lat, tx_height_m, radius, Endpoint::Beaconer)?;
        let rx = refiner.refine(w.lon, w.lat, rx_height_m, radius, Endpoint::Witness)?;
        self.validator
            .validate_endpoint(Endpoint::Beaconer, tx.lat, tx.lon, tx.height_m)?;
        self.validator
            .validate_endpoint(Endpoint::Witness, rx.lat, rx.lon, rx.height_m)?;

        let profile = self
            .terrain
            .profile(&tx, &rx)
            .map_err(LinkError::computation("terrain profile"))?;
        self.validator.validate_profile(profile.as_ref())?;
        let Some(profile) = profile else {
            return Err(ValidationError::MissingProfile.into());
        };

        let stats = aggregate(&link.signal_hist)?;

        let (model_loss_db, loss_profile_db) = if self.params.compute_loss_profile {
            let losses = self
                .terrain
                .profile_loss(&profile, link.frequency_hz)
                .map_err(LinkError::computation("profile loss"))?;
            let total = losses.last().copied().ok_or_else(|| {
                LinkError::computation("profile loss")(PropagationError::ModelFailure {
                    details: "empty loss profile".to_string(),
                })
            })?;
            (total, Some(losses))
        } else {
            let total = self
                .terrain
                .point_to_point_loss(&profile, link.frequency_hz)
                .map_err(LinkError::computation("point-to-point loss"))?;
            (total, None)
        };
        if !model_loss_db.is_finite() {
            return Err(LinkError::computation("path loss")(PropagationError::ModelFailure {
                details: format!("non-finite loss {}", model_loss_db),
            }));
        }

        let measured_loss_db = measured_loss_db(link, stats.mean_dbm);
        let residual_db = measured_loss_db - model_loss_db;
        let distance_km = profile.distance_km();
        let edge_flag = is_edge(stats.total_weight, residual_db, distance_km, &self.params);

        debug!(
            beaconer = %link.beaconer,
            witness = %link.witness,
            residual_db,
            distance_km,
            samples = stats.total_weight,
            edge_flag,
            "classified link"
        );

        Ok(ClassificationResult {
            beaconer: link.beaconer.clone(),
            witness: link.witness.clone(),
            transmit_power_dbm: link.beaconer_tx_power_dbm,
            frequency_hz: link.frequency_hz,
            measured_rssi_dbm: stats.mean_dbm,
            measured_loss_db,
            samples: stats.total_weight,
            std_dev_db: stats.std_dev_db,
            model_loss_db,
            loss_profile_db,
            residual_db,
            distance_km,
            terrain_profile: profile,
            tx_antenna_height_m: tx.height_m,
            rx_antenna_height_m: rx.height_m,
            tx_antenna_gain_db: link.beaconer_gain_db(),
            rx_antenna_gain_db: link.witness_gain_db(),
            edge_flag,
        })
    }
}
