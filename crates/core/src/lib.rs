//! # OpenRES Core
//!
//! Core types, traits and I/O shared by the OpenRES feature-extraction engine.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid used for DEM, precipitation and masks
//! - `GeoTransform`: affine transformation for georeferencing
//! - `CRS`: coordinate reference system identity, used to reject mismatched layers
//! - Vector features (`Feature`, `FeatureCollection`) with typed attributes
//! - The collaborator traits the engine consumes (`PointSampler`, `AttributeLookup`)
//! - GeoTIFF and GeoJSON I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod sample;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Neighborhood, Raster, RasterElement};
pub use sample::{AttributeLookup, PointSampler};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Neighborhood, Raster, RasterElement};
    pub use crate::sample::{AttributeLookup, PointSampler};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for the named processing steps of OpenRES.
///
/// Each step is a pure function from explicit inputs and parameters to an
/// output; nothing is read from ambient state.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
