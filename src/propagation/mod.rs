//! Terrain, propagation and hex-grid backends
//!
//! The classifier only talks to the [`TerrainModel`] and [`HexGrid`] traits so it
//! can run against the real terrain data source or the substitutes in [`synthetic`].

pub mod interface;
pub mod synthetic;
pub mod error;

pub use interface::{CellId, HexGrid, TerrainModel};
pub use synthetic::{free_space_loss_db, FlatEarthTerrain, PlanarHexGrid};
pub use error::{PropagationError, PropagationResult};
