//! Core data types for link classification

use crate::core::constants::{EARTH_RADIUS_M, HOTSPOT_DOCUMENT_PREFIX, TENTHS_PER_UNIT};
use crate::validation::error::LinkError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hotspot public key with the registry document prefix removed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HotspotId(String);

impl HotspotId {
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_document_id(&key.into())
    }

    /// Strip an exact `hotspots/` prefix; keys without it are kept as-is
    pub fn from_document_id(id: &str) -> Self {
        let key = id.strip_prefix(HOTSPOT_DOCUMENT_PREFIX).unwrap_or(id);
        Self(key.trim().to_string())
    }

    pub fn document_id(&self) -> String {
        format!("{}{}", HOTSPOT_DOCUMENT_PREFIX, self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key can be used as a single file name component
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(|c: char| c == '/' || c == '\\' || c == '\0')
    }
}

impl From<String> for HotspotId {
    fn from(value: String) -> Self {
        Self::from_document_id(&value)
    }
}

impl From<&str> for HotspotId {
    fn from(value: &str) -> Self {
        Self::from_document_id(value)
    }
}

impl From<HotspotId> for String {
    fn from(value: HotspotId) -> Self {
        value.0
    }
}

impl fmt::Display for HotspotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which end of a link a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Beaconer,
    Witness,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Beaconer => write!(f, "beaconer"),
            Endpoint::Witness => write!(f, "witness"),
        }
    }
}

/// Geodetic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle (haversine) distance in meters
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Point at fraction `t` of the way to `other`, linear in degrees
    pub fn interpolate(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

/// Antenna location picked from the neighbourhood of an asserted coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinedLocation {
    pub lat: f64,
    pub lon: f64,
    /// Antenna height above ground (meters)
    pub height_m: f64,
}

impl RefinedLocation {
    pub fn new(point: GeoPoint, height_m: f64) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            height_m,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Sampled ground elevation along the path between two antennas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainProfile {
    /// Distance of each sample from the transmitter (meters)
    pub distances_m: Vec<f64>,
    /// Ground elevation at each sample (meters)
    pub elevations_m: Vec<f64>,
    /// Transmitter antenna height above ground (meters)
    pub tx_height_m: f64,
    /// Receiver antenna height above ground (meters)
    pub rx_height_m: f64,
}

impl TerrainProfile {
    pub fn new(distances_m: Vec<f64>, elevations_m: Vec<f64>, tx_height_m: f64, rx_height_m: f64) -> Self {
        Self {
            distances_m,
            elevations_m,
            tx_height_m,
            rx_height_m,
        }
    }

    pub fn len(&self) -> usize {
        self.distances_m.len().min(self.elevations_m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_distance_m(&self) -> f64 {
        self.distances_m.last().copied().unwrap_or(0.0)
    }

    pub fn distance_km(&self) -> f64 {
        self.total_distance_m() / 1e3
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.distances_m.windows(2).all(|pair| pair[1] > pair[0])
    }
}

/// Observed RSSI histogram: tenths-of-dBm bin -> occurrence count
///
/// Counts coming from the registry may be integers, floats or null. Integral
/// and finite non-negative floats are rounded to the nearest count; anything
/// else is read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<i32, serde_json::Value>", into = "BTreeMap<i32, u64>")]
pub struct SignalHistogram {
    bins: BTreeMap<i32, u64>,
}

impl SignalHistogram {
    pub fn new(bins: BTreeMap<i32, u64>) -> Self {
        Self { bins }
    }

    pub fn from_pairs<I: IntoIterator<Item = (i32, u64)>>(pairs: I) -> Self {
        Self {
            bins: pairs.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of counts, saturating at `u64::MAX`
    pub fn total_weight(&self) -> u64 {
        self.bins.values().fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// Bins converted to dBm with their counts
    pub fn iter_dbm(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.bins
            .iter()
            .map(|(&bin, &count)| (bin as f64 / TENTHS_PER_UNIT, count))
    }
}

fn raw_count(value: &serde_json::Value) -> u64 {
    if let Some(count) = value.as_u64() {
        return count;
    }
    match value.as_f64() {
        Some(count) if count.is_finite() && count >= 0.0 => count.round().min(u64::MAX as f64) as u64,
        _ => 0,
    }
}

impl From<BTreeMap<i32, serde_json::Value>> for SignalHistogram {
    fn from(raw: BTreeMap<i32, serde_json::Value>) -> Self {
        Self {
            bins: raw.iter().map(|(&bin, count)| (bin, raw_count(count))).collect(),
        }
    }
}

impl From<SignalHistogram> for BTreeMap<i32, u64> {
    fn from(histogram: SignalHistogram) -> Self {
        histogram.bins
    }
}

/// Asserted link parameters as stored in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertedPair {
    /// Beaconer location as (lon, lat)
    pub beaconer_geo_loc: (f64, f64),
    /// Witness location as (lon, lat)
    pub witness_geo_loc: (f64, f64),
    /// Asserted antenna elevation above ground (meters)
    pub beaconer_elevation: f64,
    pub witness_elevation: f64,
    /// Antenna gains in tenths of dB
    pub beaconer_gain: f64,
    pub witness_gain: f64,
    pub beaconer_tx_power: f64,
    pub beaconer_freq: f64,
    pub signal_hist: SignalHistogram,
}

/// One row returned by a link source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub beaconer: HotspotId,
    pub witness: HotspotId,
    #[serde(default)]
    pub asserted_pair: Option<AssertedPair>,
}

impl LinkRow {
    /// Resolve the row into a link; rows without an asserted pair are skipped
    pub fn to_link(&self) -> Result<AssertedLink, LinkError> {
        match &self.asserted_pair {
            Some(pair) => Ok(AssertedLink::from_pair(
                self.beaconer.clone(),
                self.witness.clone(),
                pair,
            )),
            None => Err(LinkError::MissingAssertion {
                beaconer: self.beaconer.clone(),
                witness: self.witness.clone(),
            }),
        }
    }
}

/// Beaconer -> witness link with everything the classifier needs
#[derive(Debug, Clone, PartialEq)]
pub struct AssertedLink {
    pub beaconer: HotspotId,
    pub witness: HotspotId,
    pub beaconer_location: GeoPoint,
    pub witness_location: GeoPoint,
    pub beaconer_elevation_m: f64,
    pub witness_elevation_m: f64,
    pub beaconer_gain_tenths_db: f64,
    pub witness_gain_tenths_db: f64,
    pub beaconer_tx_power_dbm: f64,
    pub frequency_hz: f64,
    pub signal_hist: SignalHistogram,
}

impl AssertedLink {
    pub fn from_pair(beaconer: HotspotId, witness: HotspotId, pair: &AssertedPair) -> Self {
        let (b_lon, b_lat) = pair.beaconer_geo_loc;
        let (w_lon, w_lat) = pair.witness_geo_loc;
        Self {
            beaconer,
            witness,
            beaconer_location: GeoPoint::new(b_lat, b_lon),
            witness_location: GeoPoint::new(w_lat, w_lon),
            beaconer_elevation_m: pair.beaconer_elevation,
            witness_elevation_m: pair.witness_elevation,
            beaconer_gain_tenths_db: pair.beaconer_gain,
            witness_gain_tenths_db: pair.witness_gain,
            beaconer_tx_power_dbm: pair.beaconer_tx_power,
            frequency_hz: pair.beaconer_freq,
            signal_hist: pair.signal_hist.clone(),
        }
    }

    pub fn beaconer_gain_db(&self) -> f64 {
        self.beaconer_gain_tenths_db / TENTHS_PER_UNIT
    }

    pub fn witness_gain_db(&self) -> f64 {
        self.witness_gain_tenths_db / TENTHS_PER_UNIT
    }
}

/// Weighted RSSI statistics of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStatistics {
    pub mean_dbm: f64,
    pub variance: f64,
    pub std_dev_db: f64,
    pub total_weight: u64,
}

/// Outcome of classifying one link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub beaconer: HotspotId,
    pub witness: HotspotId,
    pub transmit_power_dbm: f64,
    pub frequency_hz: f64,
    pub measured_rssi_dbm: f64,
    pub measured_loss_db: f64,
    pub samples: u64,
    pub std_dev_db: f64,
    pub model_loss_db: f64,
    /// Cumulative model loss along the profile, only when requested
    pub loss_profile_db: Option<Vec<f64>>,
    pub residual_db: f64,
    pub distance_km: f64,
    pub terrain_profile: TerrainProfile,
    pub tx_antenna_height_m: f64,
    pub rx_antenna_height_m: f64,
    pub tx_antenna_gain_db: f64,
    pub rx_antenna_gain_db: f64,
    pub edge_flag: bool,
}

/// Two-column output record for a flagged link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub beaconer: HotspotId,
    pub witness: HotspotId,
}

impl From<&ClassificationResult> for EdgeRecord {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            beaconer: result.beaconer.clone(),
            witness: result.witness.clone(),
        }
    }
}
