//! Reading and writing layers
//!
//! Rasters travel as GeoTIFF, vector layers as GeoJSON.

mod geojson;
mod native;

pub use geojson::{
    feature_collection_from_str, feature_collection_to_string, read_geojson, write_geojson,
};
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
