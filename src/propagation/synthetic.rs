//! Substitute terrain and grid backends for testing and development
//!
//! [`FlatEarthTerrain`] samples an elevation function along a straight line and
//! uses free-space path loss as its model. [`PlanarHexGrid`] lays an axial hex
//! grid over an equirectangular projection with H3-like edge lengths.

use crate::core::{GeoPoint, RefinedLocation, TerrainProfile, EARTH_RADIUS_M, SPEED_OF_LIGHT_M_S};
use crate::propagation::{CellId, HexGrid, PropagationError, PropagationResult, TerrainModel};
use nalgebra::{Matrix2, Vector2};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

/// Average edge length of a resolution-0 cell (meters); each finer level divides by sqrt(7)
const RES0_EDGE_LENGTH_M: f64 = 1_107_712.591;
const MAX_RESOLUTION: u8 = 15;

const AXIS_BITS: u32 = 28;
const AXIS_MASK: u64 = (1 << AXIS_BITS) - 1;
const AXIS_OFFSET: i64 = 1 << (AXIS_BITS - 1);
const RESOLUTION_SHIFT: u32 = 2 * AXIS_BITS;

/// Axial neighbour offsets, walked in order around a ring
const DIRECTIONS: [(i64, i64); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Free-space path loss (dB)
pub fn free_space_loss_db(distance_m: f64, frequency_hz: f64) -> PropagationResult<f64> {
    if !(distance_m > 0.0) || !(frequency_hz > 0.0) {
        return Err(PropagationError::ModelFailure {
            details: format!(
                "free-space loss needs positive distance and frequency (d={} m, f={} Hz)",
                distance_m, frequency_hz
            ),
        });
    }
    Ok(20.0 * (4.0 * PI * distance_m * frequency_hz / SPEED_OF_LIGHT_M_S).log10())
}

type ElevationFn = dyn Fn(&GeoPoint) -> f64 + Send + Sync;

/// Terrain backend driven by an elevation function
pub struct FlatEarthTerrain {
    elevation_fn: Box<ElevationFn>,
    sample_spacing_m: f64,
    excess_loss_db: f64,
    fixed_loss_db: Option<f64>,
    fail_model: bool,
    available: bool,
}

impl FlatEarthTerrain {
    /// Level ground at a constant elevation
    pub fn flat(elevation_m: f64) -> Self {
        Self::with_elevation_fn(move |_| elevation_m)
    }

    /// Ground elevation given by `f(point)`
    pub fn with_elevation_fn<F>(f: F) -> Self
    where
        F: Fn(&GeoPoint) -> f64 + Send + Sync + 'static,
    {
        Self {
            elevation_fn: Box::new(f),
            sample_spacing_m: 30.0,
            excess_loss_db: 0.0,
            fixed_loss_db: None,
            fail_model: false,
            available: true,
        }
    }

    /// Distance between profile samples (meters)
    pub fn with_sample_spacing(mut self, spacing_m: f64) -> Self {
        self.sample_spacing_m = spacing_m.max(1.0);
        self
    }

    /// Loss added on top of free space, e.g. for obstructed terrain
    pub fn with_excess_loss(mut self, excess_db: f64) -> Self {
        self.excess_loss_db = excess_db;
        self
    }

    /// Report the same total loss for every path
    pub fn with_fixed_loss(mut self, loss_db: f64) -> Self {
        self.fixed_loss_db = Some(loss_db);
        self
    }

    /// Make every loss computation fail
    pub fn simulate_model_failure(mut self, enable: bool) -> Self {
        self.fail_model = enable;
        self
    }

    /// Simulate the terrain data source being unreachable
    pub fn disconnect(&mut self) {
        self.available = false;
    }

    fn check_model(&self, profile: &TerrainProfile) -> PropagationResult<()> {
        if self.fail_model {
            return Err(PropagationError::ModelFailure {
                details: "simulated model failure".to_string(),
            });
        }
        if profile.len() < 2 {
            return Err(PropagationError::ModelFailure {
                details: format!("profile has {} samples", profile.len()),
            });
        }
        Ok(())
    }

    fn loss_at(&self, distance_m: f64, frequency_hz: f64) -> PropagationResult<f64> {
        match self.fixed_loss_db {
            Some(loss) => Ok(loss),
            None => Ok(free_space_loss_db(distance_m, frequency_hz)? + self.excess_loss_db),
        }
    }
}

impl fmt::Debug for FlatEarthTerrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatEarthTerrain")
            .field("sample_spacing_m", &self.sample_spacing_m)
            .field("excess_loss_db", &self.excess_loss_db)
            .field("fixed_loss_db", &self.fixed_loss_db)
            .field("fail_model", &self.fail_model)
            .field("available", &self.available)
            .finish()
    }
}

impl TerrainModel for FlatEarthTerrain {
    fn elevation(&self, point: &GeoPoint) -> PropagationResult<f64> {
        if !self.available {
            return Err(PropagationError::TilesUnavailable {
                details: "terrain source disconnected".to_string(),
            });
        }
        Ok((self.elevation_fn)(point))
    }

    fn profile(&self, from: &RefinedLocation, to: &RefinedLocation) -> PropagationResult<Option<TerrainProfile>> {
        let start = from.point();
        let end = to.point();
        let total_m = start.distance_to(&end);
        if !(total_m > 0.0) {
            return Ok(None);
        }

        let samples = ((total_m / self.sample_spacing_m).ceil() as usize + 1).max(2);
        let last = (samples - 1) as f64;
        let mut distances = Vec::with_capacity(samples);
        let mut elevations = Vec::with_capacity(samples);
        for i in 0..samples {
            let t = i as f64 / last;
            distances.push(if i + 1 == samples { total_m } else { total_m * t });
            elevations.push(self.elevation(&start.interpolate(&end, t))?);
        }

        Ok(Some(TerrainProfile::new(distances, elevations, from.height_m, to.height_m)))
    }

    fn point_to_point_loss(&self, profile: &TerrainProfile, frequency_hz: f64) -> PropagationResult<f64> {
        self.check_model(profile)?;
        self.loss_at(profile.total_distance_m(), frequency_hz)
    }

    fn profile_loss(&self, profile: &TerrainProfile, frequency_hz: f64) -> PropagationResult<Vec<f64>> {
        self.check_model(profile)?;
        profile.distances_m[1..]
            .iter()
            .map(|&d| self.loss_at(d, frequency_hz))
            .collect()
    }

    fn ensure_available(&self) -> PropagationResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(PropagationError::TilesUnavailable {
                details: "terrain source disconnected".to_string(),
            })
        }
    }
}

/// Axial hex grid over an equirectangular projection
#[derive(Debug, Clone, Default)]
pub struct PlanarHexGrid {
    edge_length_override_m: Option<f64>,
    degenerate: HashSet<CellId>,
}

impl PlanarHexGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the same edge length at every resolution
    pub fn with_edge_length(mut self, edge_m: f64) -> Self {
        self.edge_length_override_m = Some(edge_m);
        self
    }

    /// Rings around this cell come back empty, like distorted cells near pentagons
    pub fn with_degenerate_cell(mut self, cell: CellId) -> Self {
        self.degenerate.insert(cell);
        self
    }

    pub fn edge_length_m(&self, resolution: u8) -> f64 {
        self.edge_length_override_m
            .unwrap_or_else(|| RES0_EDGE_LENGTH_M / 7f64.sqrt().powi(resolution as i32))
    }

    /// Axial (q, r) -> planar meters, pointy-top orientation
    fn basis(&self, resolution: u8) -> Matrix2<f64> {
        let size = self.edge_length_m(resolution);
        let sqrt3 = 3f64.sqrt();
        Matrix2::new(sqrt3 * size, sqrt3 / 2.0 * size, 0.0, 1.5 * size)
    }

    fn encode(resolution: u8, q: i64, r: i64) -> PropagationResult<CellId> {
        let (q_off, r_off) = (q + AXIS_OFFSET, r + AXIS_OFFSET);
        if q_off < 0 || r_off < 0 || q_off as u64 > AXIS_MASK || r_off as u64 > AXIS_MASK {
            return Err(PropagationError::InvalidResolution { resolution });
        }
        Ok(CellId(
            ((resolution as u64) << RESOLUTION_SHIFT) | ((q_off as u64) << AXIS_BITS) | r_off as u64,
        ))
    }

    fn decode(cell: CellId) -> PropagationResult<(u8, i64, i64)> {
        let resolution = (cell.0 >> RESOLUTION_SHIFT) as u8;
        if resolution > MAX_RESOLUTION || cell.0 >> (RESOLUTION_SHIFT + 4) != 0 {
            return Err(PropagationError::InvalidCell { cell: cell.0 });
        }
        let q = ((cell.0 >> AXIS_BITS) & AXIS_MASK) as i64 - AXIS_OFFSET;
        let r = (cell.0 & AXIS_MASK) as i64 - AXIS_OFFSET;
        Ok((resolution, q, r))
    }

    /// Round fractional axial coordinates to the containing hex
    fn round_axial(q: f64, r: f64) -> (i64, i64) {
        let s = -q - r;
        let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
        let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
        if dq > dr && dq > ds {
            rq = -rr - rs;
        } else if dr > ds {
            rr = -rq - rs;
        }
        (rq as i64, rr as i64)
    }
}

impl HexGrid for PlanarHexGrid {
    fn cell_for(&self, point: &GeoPoint, resolution: u8) -> PropagationResult<CellId> {
        if resolution > MAX_RESOLUTION {
            return Err(PropagationError::InvalidResolution { resolution });
        }
        if !point.lat.is_finite() || !point.lon.is_finite() {
            return Err(PropagationError::OutOfCoverage {
                lat: point.lat,
                lon: point.lon,
            });
        }
        let planar = Vector2::new(point.lon.to_radians() * EARTH_RADIUS_M, point.lat.to_radians() * EARTH_RADIUS_M);
        let inverse = self
            .basis(resolution)
            .try_inverse()
            .ok_or(PropagationError::InvalidResolution { resolution })?;
        let axial = inverse * planar;
        let (q, r) = Self::round_axial(axial.x, axial.y);
        Self::encode(resolution, q, r)
    }

    fn ring(&self, cell: CellId, radius: u32) -> PropagationResult<Vec<CellId>> {
        let (resolution, q, r) = Self::decode(cell)?;
        if self.degenerate.contains(&cell) {
            return Ok(Vec::new());
        }
        if radius == 0 {
            return Ok(vec![cell]);
        }

        let k = radius as i64;
        let (mut hq, mut hr) = (q + DIRECTIONS[4].0 * k, r + DIRECTIONS[4].1 * k);
        let mut cells = Vec::with_capacity(6 * radius as usize);
        for (dq, dr) in DIRECTIONS {
            for _ in 0..radius {
                cells.push(Self::encode(resolution, hq, hr)?);
                hq += dq;
                hr += dr;
            }
        }
        Ok(cells)
    }

    fn center_of(&self, cell: CellId) -> PropagationResult<GeoPoint> {
        let (resolution, q, r) = Self::decode(cell)?;
        let planar = self.basis(resolution) * Vector2::new(q as f64, r as f64);
        Ok(GeoPoint::new(
            (planar.y / EARTH_RADIUS_M).to_degrees(),
            (planar.x / EARTH_RADIUS_M).to_degrees(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_distance(grid_cell_a: CellId, grid_cell_b: CellId) -> i64 {
        let (_, qa, ra) = PlanarHexGrid::decode(grid_cell_a).unwrap();
        let (_, qb, rb) = PlanarHexGrid::decode(grid_cell_b).unwrap();
        let (dq, dr) = (qa - qb, ra - rb);
        (dq.abs() + dr.abs() + (dq + dr).abs()) / 2
    }

    #[test]
    fn test_edge_length_matches_resolution_8() {
        let grid = PlanarHexGrid::new();
        assert!((grid.edge_length_m(8) - 461.35).abs() < 1.0);
        assert_eq!(PlanarHexGrid::new().with_edge_length(5.0).edge_length_m(8), 5.0);
    }

    #[test]
    fn test_cell_center_round_trip() {
        let grid = PlanarHexGrid::new();
        let cell = grid.cell_for(&GeoPoint::new(37.7749, -122.4194), 8).unwrap();
        let center = grid.center_of(cell).unwrap();
        assert_eq!(grid.cell_for(&center, 8).unwrap(), cell);
        assert!(center.distance_to(&GeoPoint::new(37.7749, -122.4194)) < 1000.0);
    }

    #[test]
    fn test_ring_is_hollow() {
        let grid = PlanarHexGrid::new();
        let origin = grid.cell_for(&GeoPoint::new(10.0, 20.0), 8).unwrap();

        assert_eq!(grid.ring(origin, 0).unwrap(), vec![origin]);
        for k in 1..=4u32 {
            let ring = grid.ring(origin, k).unwrap();
            assert_eq!(ring.len(), 6 * k as usize);
            let unique: HashSet<_> = ring.iter().collect();
            assert_eq!(unique.len(), ring.len());
            assert!(ring.iter().all(|&c| hex_distance(c, origin) == k as i64));
        }
    }

    #[test]
    fn test_degenerate_cell_has_empty_ring() {
        let probe = PlanarHexGrid::new();
        let origin = probe.cell_for(&GeoPoint::new(0.0, 0.0), 8).unwrap();
        let grid = PlanarHexGrid::new().with_degenerate_cell(origin);
        assert!(grid.ring(origin, 2).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let grid = PlanarHexGrid::new();
        assert!(matches!(
            grid.cell_for(&GeoPoint::new(0.0, 0.0), 16),
            Err(PropagationError::InvalidResolution { resolution: 16 })
        ));
    }

    #[test]
    fn test_free_space_loss_1km_900mhz() {
        // 20log10(4*pi*d*f/c) at 1 km, 900 MHz is about 91.5 dB
        let loss = free_space_loss_db(1000.0, 900e6).unwrap();
        assert!((loss - 91.5).abs() < 0.1);
        assert!(free_space_loss_db(0.0, 900e6).is_err());
    }

    #[test]
    fn test_profile_samples_are_strictly_increasing() {
        let terrain = FlatEarthTerrain::with_elevation_fn(|p| p.lat * 1000.0).with_sample_spacing(100.0);
        let from = RefinedLocation::new(GeoPoint::new(0.0, 0.0), 10.0);
        let to = RefinedLocation::new(GeoPoint::new(0.01, 0.0), 5.0);
        let profile = terrain.profile(&from, &to).unwrap().unwrap();

        assert!(profile.len() >= 2);
        assert!(profile.is_strictly_increasing());
        assert_eq!(profile.distances_m[0], 0.0);
        assert!((profile.total_distance_m() - from.point().distance_to(&to.point())).abs() < 1e-9);
        assert_eq!(profile.tx_height_m, 10.0);
        assert_eq!(profile.rx_height_m, 5.0);
        assert!((profile.elevations_m.last().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_colocated_points_have_no_profile() {
        let terrain = FlatEarthTerrain::flat(0.0);
        let here = RefinedLocation::new(GeoPoint::new(1.0, 1.0), 5.0);
        assert!(terrain.profile(&here, &here).unwrap().is_none());
    }

    #[test]
    fn test_profile_loss_ends_at_point_to_point_loss() {
        let terrain = FlatEarthTerrain::flat(0.0).with_excess_loss(12.0);
        let from = RefinedLocation::new(GeoPoint::new(0.0, 0.0), 10.0);
        let to = RefinedLocation::new(GeoPoint::new(0.02, 0.0), 10.0);
        let profile = terrain.profile(&from, &to).unwrap().unwrap();

        let total = terrain.point_to_point_loss(&profile, 915e6).unwrap();
        let cumulative = terrain.profile_loss(&profile, 915e6).unwrap();
        assert_eq!(cumulative.len(), profile.len() - 1);
        assert_eq!(*cumulative.last().unwrap(), total);
        assert!(cumulative.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_disconnected_terrain_is_unavailable() {
        let mut terrain = FlatEarthTerrain::flat(0.0);
        assert!(terrain.ensure_available().is_ok());
        terrain.disconnect();
        assert!(matches!(
            terrain.ensure_available(),
            Err(PropagationError::TilesUnavailable { .. })
        ));
        assert!(terrain.elevation(&GeoPoint::new(0.0, 0.0)).is_err());
    }
}
