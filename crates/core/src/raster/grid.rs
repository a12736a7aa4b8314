//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Neighborhood, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// Holds DEM and precipitation surfaces, channel masks and valley-floor
/// masks. Data is stored row-major as `(row, col)`.
///
/// # Example
///
/// ```ignore
/// use openres_core::Raster;
///
/// let mut dem: Raster<f64> = Raster::filled(100, 100, 250.0);
/// dem.set(10, 20, 251.5)?;
/// let z = dem.value_at(dem.pixel_to_geo(20, 10))?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a zeroed raster of another element type sharing this grid's
    /// shape, transform and CRS
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array2::zeros(self.data.dim()),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with `SizeMismatch` unless `other` has the same shape
    pub fn ensure_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    /// Valid (non-no-data) value at (row, col), `None` when out of bounds or no-data
    pub fn valid(&self, row: usize, col: usize) -> Option<T> {
        let value = self.data.get((row, col)).copied()?;
        (!self.is_nodata(value)).then_some(value)
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// In-bounds neighbors of (row, col) for the given neighborhood, with the
    /// horizontal step length in cell units
    pub fn neighbors(
        &self,
        row: usize,
        col: usize,
        neighborhood: Neighborhood,
    ) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let (rows, cols) = self.shape();
        neighborhood.steps().into_iter().filter_map(move |step| {
            let r = row as isize + step.dr;
            let c = col as isize + step.dc;
            if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
                None
            } else {
                Some((r as usize, c as usize, step.distance))
            }
        })
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Map coordinates of the center of (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Cell (row, col) containing the map point, if inside the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Valid value of the cell containing the map point
    pub fn value_at(&self, x: f64, y: f64) -> Option<T> {
        let (row, col) = self.cell_at(x, y)?;
        self.valid(row, col)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dem() -> Raster<f64> {
        let mut r = Raster::filled(4, 5, 100.0);
        r.set_transform(GeoTransform::new(1000.0, 2000.0, 10.0, -10.0));
        r.set_nodata(Some(-9999.0));
        r
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_out_of_bounds_set_is_an_error() {
        let mut raster: Raster<u8> = Raster::new(3, 3);
        assert!(raster.set(3, 0, 1).is_err());
        assert!(raster.set(2, 2, 1).is_ok());
    }

    #[test]
    fn test_value_at_map_point() {
        let mut r = dem();
        r.set(1, 2, 105.0).unwrap();
        // Cell (row 1, col 2) spans x 1020..1030, y 1980..1990
        assert_eq!(r.cell_at(1025.0, 1985.0), Some((1, 2)));
        assert_eq!(r.value_at(1025.0, 1985.0), Some(105.0));
        assert_eq!(r.value_at(999.0, 1985.0), None);
    }

    #[test]
    fn test_nodata_cells_are_not_valid() {
        let mut r = dem();
        r.set(0, 0, -9999.0).unwrap();
        assert_eq!(r.valid(0, 0), None);
        assert_eq!(r.valid(0, 1), Some(100.0));
    }

    #[test]
    fn test_corner_neighbors_are_clipped() {
        let r = dem();
        assert_eq!(r.neighbors(0, 0, Neighborhood::Rook).count(), 2);
        assert_eq!(r.neighbors(0, 0, Neighborhood::Queen).count(), 3);
        assert_eq!(r.neighbors(1, 1, Neighborhood::Queen).count(), 8);
    }
}
