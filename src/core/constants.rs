//! Physical constants and model limits

/// Speed of light used for Fresnel-zone wavelengths (m/s)
pub const SPEED_OF_LIGHT_M_S: f64 = 2.998e8;

/// Mean Earth radius for great-circle distances (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Antenna heights outside this band are not accepted by the terrain model
pub const MIN_ANTENNA_HEIGHT_M: f64 = 1.0;
pub const MAX_ANTENNA_HEIGHT_M: f64 = 50.0;

/// Open interval of carrier frequencies accepted for classification (Hz)
pub const MIN_FREQUENCY_HZ: f64 = 400e6;
pub const MAX_FREQUENCY_HZ: f64 = 1000e6;

/// Histogram bins and antenna gains are stored in tenths
pub const TENTHS_PER_UNIT: f64 = 10.0;

/// Hex grid resolution used to model asserted-location uncertainty
pub const DEFAULT_GRID_RESOLUTION: u8 = 8;

/// Registry document prefix carried by hotspot identifiers from the link source
pub const HOTSPOT_DOCUMENT_PREFIX: &str = "hotspots/";

/// Packet-forwarder concentrator sensitivity drawn on reports (dBm)
pub const CONCENTRATOR_SENSITIVITY_DBM: f64 = -138.0;
