//! Polygon attribute lookup (geology at segment centers)

use geo::{Geometry, Intersects, MultiPolygon, Point, Polygon};
use openres_core::vector::{AttributeValue, FeatureCollection};
use openres_core::{AttributeLookup, Error, Result};

/// A polygon layer bound to one attribute field.
///
/// Lookup returns the field value of the first polygon, in input order,
/// that contains or touches the query point.
#[derive(Debug, Clone)]
pub struct PolygonAttributeLayer {
    field: String,
    entries: Vec<(MultiPolygon<f64>, AttributeValue)>,
}

impl PolygonAttributeLayer {
    /// Bind `field` of a polygon layer.
    ///
    /// Fails with [`Error::UnknownField`] when no feature carries the field.
    /// Non-polygon features are ignored.
    pub fn new(features: &FeatureCollection, field: &str) -> Result<Self> {
        if !features.iter().any(|f| f.get_property(field).is_some()) {
            return Err(Error::UnknownField(field.to_string()));
        }
        let entries = features
            .iter()
            .filter_map(|f| {
                let polygons = match f.geometry.as_ref()? {
                    Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
                    Geometry::MultiPolygon(mp) => mp.clone(),
                    _ => return None,
                };
                let value = f.get_property(field).cloned().unwrap_or(AttributeValue::Null);
                Some((polygons, value))
            })
            .collect::<Vec<_>>();
        tracing::debug!(field, polygons = entries.len(), "polygon attribute layer bound");
        Ok(Self {
            field: field.to_string(),
            entries,
        })
    }

    /// Build directly from polygons and values
    pub fn from_polygons(field: &str, entries: Vec<(Polygon<f64>, AttributeValue)>) -> Self {
        Self {
            field: field.to_string(),
            entries: entries
                .into_iter()
                .map(|(p, v)| (MultiPolygon::new(vec![p]), v))
                .collect(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AttributeLookup for PolygonAttributeLayer {
    fn lookup(&self, x: f64, y: f64) -> Option<AttributeValue> {
        let point = Point::new(x, y);
        self.entries
            .iter()
            .find(|(polygons, _)| polygons.intersects(&point))
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use openres_core::Feature;

    fn square(x0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, 0.0),
                (x0 + size, 0.0),
                (x0 + size, size),
                (x0, size),
                (x0, 0.0),
            ]),
            vec![],
        )
    }

    fn geology() -> FeatureCollection {
        vec![
            Feature::new(square(0.0, 10.0)).with_property("UNIT", "granite"),
            Feature::new(square(5.0, 10.0)).with_property("UNIT", "schist"),
            Feature::new(square(20.0, 10.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_first_polygon_in_input_order_wins() {
        let layer = PolygonAttributeLayer::new(&geology(), "UNIT").unwrap();
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.lookup(7.0, 5.0), Some(AttributeValue::from("granite")));
        assert_eq!(layer.lookup(12.0, 5.0), Some(AttributeValue::from("schist")));
    }

    #[test]
    fn test_outside_and_missing_values_are_none() {
        let layer = PolygonAttributeLayer::new(&geology(), "UNIT").unwrap();
        assert_eq!(layer.lookup(100.0, 5.0), None);
        assert_eq!(layer.lookup(25.0, 5.0), None);
    }

    #[test]
    fn test_boundary_point_matches() {
        let layer = PolygonAttributeLayer::new(&geology(), "UNIT").unwrap();
        assert_eq!(layer.lookup(0.0, 5.0), Some(AttributeValue::from("granite")));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(matches!(
            PolygonAttributeLayer::new(&geology(), "LITHO"),
            Err(Error::UnknownField(f)) if f == "LITHO"
        ));
    }
}
