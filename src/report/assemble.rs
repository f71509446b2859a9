//! Report geometry for a selected link: line of sight, Fresnel zone and RSSI

use crate::core::{
    ClassificationResult, HotspotId, CONCENTRATOR_SENSITIVITY_DBM, SPEED_OF_LIGHT_M_S,
};
use crate::propagation::PropagationError;
use crate::validation::error::{LinkError, ValidationError};
use serde::{Deserialize, Serialize};

/// Model RSSI at one point along the path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssiSample {
    pub distance_km: f64,
    pub rssi_dbm: f64,
}

/// Measured RSSI mean with a two-sigma band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssiBand {
    pub mean_dbm: f64,
    pub low_dbm: f64,
    pub high_dbm: f64,
}

/// Everything a renderer needs to draw one report card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub beaconer: HotspotId,
    pub witness: HotspotId,
    pub frequency_hz: f64,
    pub frequency_mhz: f64,
    pub transmit_power_dbm: f64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub tx_antenna_height_m: f64,
    pub rx_antenna_height_m: f64,
    pub measured_rssi_dbm: f64,
    pub std_dev_db: f64,
    pub samples: u64,
    pub distance_km: f64,

    pub distances_km: Vec<f64>,
    pub terrain_elevations_m: Vec<f64>,
    /// Straight line between the two antenna tips (meters)
    pub line_of_sight_m: Vec<f64>,
    /// First Fresnel zone radius at each sample (meters)
    pub fresnel_radius_m: Vec<f64>,
    pub fresnel_upper_m: Vec<f64>,
    pub fresnel_lower_m: Vec<f64>,

    /// Negated cumulative model loss against distance
    pub rssi_profile: Vec<RssiSample>,
    pub sensitivity_dbm: f64,
    pub measured_rssi_band: RssiBand,
    pub model_loss_db: f64,
    pub estimated_rssi_dbm: f64,
    /// Estimated minus measured RSSI (dB)
    pub residual_db: f64,
}

/// `n` evenly spaced values from `start` to `end`, both included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// First Fresnel zone radius `d1` meters from the transmitter on a path of `total_m`
pub fn fresnel_radius_m(wavelength_m: f64, d1_m: f64, total_m: f64) -> f64 {
    let d2_m = total_m - d1_m;
    (wavelength_m * d1_m * d2_m / total_m).max(0.0).sqrt()
}

/// Build report data for a selected link from its full loss profile
pub fn assemble_report(result: &ClassificationResult, loss_profile_db: &[f64]) -> Result<ReportData, LinkError> {
    let profile = &result.terrain_profile;
    let n = profile.len();
    if n < 2 {
        return Err(ValidationError::ProfileTooShort { samples: n }.into());
    }
    // one loss value per sample after the transmitter
    if loss_profile_db.len() != n - 1 {
        return Err(LinkError::computation("profile loss")(PropagationError::ModelFailure {
            details: format!(
                "expected {} loss values for {} profile samples, got {}",
                n - 1,
                n,
                loss_profile_db.len()
            ),
        }));
    }
    let model_loss_db = loss_profile_db[n - 2];

    let distances_m = &profile.distances_m[..n];
    let elevations_m = &profile.elevations_m[..n];
    let total_m = profile.total_distance_m();
    let wavelength_m = SPEED_OF_LIGHT_M_S / result.frequency_hz;

    let line_of_sight_m = linspace(
        elevations_m[0] + result.tx_antenna_height_m,
        elevations_m[n - 1] + result.rx_antenna_height_m,
        n,
    );
    let fresnel_radius_m: Vec<f64> = distances_m
        .iter()
        .map(|&d1| fresnel_radius_m(wavelength_m, d1, total_m))
        .collect();
    let fresnel_upper_m = line_of_sight_m.iter().zip(&fresnel_radius_m).map(|(l, r)| l + r).collect();
    let fresnel_lower_m = line_of_sight_m.iter().zip(&fresnel_radius_m).map(|(l, r)| l - r).collect();

    let rssi_profile = distances_m[1..]
        .iter()
        .zip(loss_profile_db)
        .map(|(&d, &loss)| RssiSample {
            distance_km: d / 1e3,
            rssi_dbm: -loss,
        })
        .collect();

    let estimated_rssi_dbm =
        result.transmit_power_dbm + result.tx_antenna_gain_db + result.rx_antenna_gain_db - model_loss_db;
    let band = 2.0 * result.std_dev_db;

    Ok(ReportData {
        beaconer: result.beaconer.clone(),
        witness: result.witness.clone(),
        frequency_hz: result.frequency_hz,
        frequency_mhz: result.frequency_hz / 1e6,
        transmit_power_dbm: result.transmit_power_dbm,
        tx_gain_db: result.tx_antenna_gain_db,
        rx_gain_db: result.rx_antenna_gain_db,
        tx_antenna_height_m: result.tx_antenna_height_m,
        rx_antenna_height_m: result.rx_antenna_height_m,
        measured_rssi_dbm: result.measured_rssi_dbm,
        std_dev_db: result.std_dev_db,
        samples: result.samples,
        distance_km: total_m / 1e3,
        distances_km: distances_m.iter().map(|d| d / 1e3).collect(),
        terrain_elevations_m: elevations_m.to_vec(),
        line_of_sight_m,
        fresnel_radius_m,
        fresnel_upper_m,
        fresnel_lower_m,
        rssi_profile,
        sensitivity_dbm: CONCENTRATOR_SENSITIVITY_DBM,
        measured_rssi_band: RssiBand {
            mean_dbm: result.measured_rssi_dbm,
            low_dbm: result.measured_rssi_dbm - band,
            high_dbm: result.measured_rssi_dbm + band,
        },
        model_loss_db,
        estimated_rssi_dbm,
        residual_db: estimated_rssi_dbm - result.measured_rssi_dbm,
    })
}
