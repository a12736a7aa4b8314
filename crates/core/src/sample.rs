//! Collaborator interfaces consumed by the engine.
//!
//! Point sampling of rasters (elevation, precipitation) and attribute lookup
//! in polygon layers (geology) are simple glue. The engine only depends on
//! these traits so hosts can plug in their own sources; in-memory
//! implementations are provided for [`Raster`].

use crate::raster::{Raster, RasterElement};
use crate::vector::AttributeValue;

/// Sample a continuous surface at a map point.
///
/// Returns `None` for no-data or points outside the surface.
pub trait PointSampler: Sync {
    fn sample(&self, x: f64, y: f64) -> Option<f64>;
}

/// Look up a categorical attribute at a map point.
///
/// Returns `None` when no feature covers the point or the feature carries
/// no value for the bound field.
pub trait AttributeLookup: Sync {
    fn lookup(&self, x: f64, y: f64) -> Option<AttributeValue>;
}

impl<T: RasterElement> PointSampler for Raster<T> {
    fn sample(&self, x: f64, y: f64) -> Option<f64> {
        self.value_at(x, y)
            .and_then(RasterElement::to_f64)
            .filter(|v| v.is_finite())
    }
}

impl<S: PointSampler + ?Sized> PointSampler for &S {
    fn sample(&self, x: f64, y: f64) -> Option<f64> {
        (**self).sample(x, y)
    }
}
