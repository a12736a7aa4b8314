//! Vector features: geometry plus typed attributes
//!
//! Stream networks, boundary-line layers, geology polygons and every
//! output layer of the engine travel as a `FeatureCollection`.

use geo_types::{Geometry, LineString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value; integers widen, strings parse
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer view of the value; floats must be integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// A geographic feature with geometry and attributes.
///
/// Properties are kept in a `BTreeMap` so that serialized output has a
/// stable field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Line parts of the geometry; a MultiLineString yields each part
    pub fn line_strings(&self) -> Vec<&LineString<f64>> {
        match &self.geometry {
            Some(Geometry::LineString(ls)) => vec![ls],
            Some(Geometry::MultiLineString(mls)) => mls.0.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Collection of features, optionally tagged with a CRS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Every line part of every feature, flattened, in feature order
    pub fn line_strings(&self) -> Vec<LineString<f64>> {
        self.features
            .iter()
            .flat_map(|f| f.line_strings().into_iter().cloned())
            .collect()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
            crs: None,
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, MultiLineString};

    #[test]
    fn test_attribute_numeric_views() {
        assert_eq!(AttributeValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(AttributeValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(AttributeValue::Float(3.5).as_i64(), None);
        assert_eq!(AttributeValue::from(" 12 ").as_i64(), Some(12));
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn test_multiline_parts_are_flattened() {
        let mls = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0)],
        ]);
        let fc: FeatureCollection = vec![
            Feature::new(mls),
            Feature::new(line_string![(x: 5.0, y: 5.0), (x: 6.0, y: 6.0)]),
        ]
        .into_iter()
        .collect();
        assert_eq!(fc.line_strings().len(), 3);
    }
}
