//! GeoJSON reading/writing for vector layers.
//!
//! Handles the geometry types the engine exchanges with its host: points,
//! lines and polygons (single and multi). A named `crs` member, when present,
//! is carried through so mismatched layers can be rejected up front.

use std::fs;
use std::path::Path;

use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use serde_json::{json, Map, Value};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};

/// Read a GeoJSON FeatureCollection from a file
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    feature_collection_from_str(&text)
}

/// Write a FeatureCollection as GeoJSON
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    fs::write(path.as_ref(), feature_collection_to_string(collection)?)?;
    Ok(())
}

/// Parse a GeoJSON FeatureCollection
pub fn feature_collection_from_str(text: &str) -> Result<FeatureCollection> {
    let root: Value = serde_json::from_str(text)?;
    if root.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(Error::UnsupportedGeometry(
            "top-level object must be a FeatureCollection".into(),
        ));
    }

    let crs = root
        .pointer("/crs/properties/name")
        .and_then(Value::as_str)
        .map(|name| CRS::from_identifier(name.trim_start_matches("urn:ogc:def:crs:").replace("::", ":").as_str()));

    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::UnsupportedGeometry("missing 'features' array".into()))?
        .iter()
        .map(parse_feature)
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection { features, crs })
}

/// Serialize a FeatureCollection to a GeoJSON string
pub fn feature_collection_to_string(collection: &FeatureCollection) -> Result<String> {
    let features: Vec<Value> = collection.features.iter().map(feature_to_value).collect();
    let mut root = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(crs) = &collection.crs {
        root["crs"] = json!({
            "type": "name",
            "properties": { "name": crs.identifier() },
        });
    }
    Ok(serde_json::to_string_pretty(&root)?)
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let geometry = match value.get("geometry") {
        None | Some(Value::Null) => None,
        Some(g) => Some(parse_geometry(g)?),
    };
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.clone(), attribute_from_json(v)))
                .collect()
        })
        .unwrap_or_default();
    Ok(Feature {
        geometry,
        properties,
    })
}

fn attribute_from_json(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map(AttributeValue::Float).unwrap_or(AttributeValue::Null),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => json!(b),
        AttributeValue::Int(i) => json!(i),
        // JSON has no NaN/Inf
        AttributeValue::Float(f) if !f.is_finite() => Value::Null,
        AttributeValue::Float(f) => json!(f),
        AttributeValue::String(s) => json!(s),
    }
}

fn coord(value: &Value) -> Result<Coord<f64>> {
    let pair = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| Error::UnsupportedGeometry(format!("bad position: {}", value)))?;
    match (pair[0].as_f64(), pair[1].as_f64()) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(Error::UnsupportedGeometry(format!("bad position: {}", value))),
    }
}

fn array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::UnsupportedGeometry(format!("{} must be an array", what)))
}

fn line_string(value: &Value) -> Result<LineString<f64>> {
    array(value, "line coordinates")?
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value, "polygon rings")?
        .iter()
        .map(line_string)
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| Error::UnsupportedGeometry("polygon without exterior ring".into()))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    let coords = value.get("coordinates").unwrap_or(&Value::Null);
    let geometry = match kind {
        "Point" => Geometry::Point(Point(coord(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            array(coords, "points")?
                .iter()
                .map(|c| coord(c).map(Point))
                .collect::<Result<Vec<_>>>()?,
        )),
        "LineString" => Geometry::LineString(line_string(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            array(coords, "lines")?
                .iter()
                .map(line_string)
                .collect::<Result<Vec<_>>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            array(coords, "polygons")?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => return Err(Error::UnsupportedGeometry(other.to_string())),
    };
    Ok(geometry)
}

fn position(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn line_positions(ls: &LineString<f64>) -> Value {
    Value::Array(ls.0.iter().map(position).collect())
}

fn polygon_positions(p: &Polygon<f64>) -> Value {
    Value::Array(
        std::iter::once(p.exterior())
            .chain(p.interiors())
            .map(line_positions)
            .collect(),
    )
}

fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
    let (kind, coordinates) = match geometry {
        Geometry::Point(p) => ("Point", position(&p.0)),
        Geometry::MultiPoint(mp) => (
            "MultiPoint",
            Value::Array(mp.0.iter().map(|p| position(&p.0)).collect()),
        ),
        Geometry::LineString(ls) => ("LineString", line_positions(ls)),
        Geometry::Line(l) => ("LineString", json!([[l.start.x, l.start.y], [l.end.x, l.end.y]])),
        Geometry::MultiLineString(mls) => (
            "MultiLineString",
            Value::Array(mls.0.iter().map(line_positions).collect()),
        ),
        Geometry::Polygon(p) => ("Polygon", polygon_positions(p)),
        Geometry::MultiPolygon(mp) => (
            "MultiPolygon",
            Value::Array(mp.0.iter().map(polygon_positions).collect()),
        ),
        Geometry::Rect(r) => ("Polygon", polygon_positions(&r.to_polygon())),
        Geometry::Triangle(t) => ("Polygon", polygon_positions(&t.to_polygon())),
        Geometry::GeometryCollection(_) => ("GeometryCollection", Value::Null),
    };
    json!({ "type": kind, "coordinates": coordinates })
}

fn feature_to_value(feature: &Feature) -> Value {
    let properties: Map<String, Value> = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();
    json!({
        "type": "Feature",
        "geometry": feature.geometry.as_ref().map(geometry_to_value),
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAMS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32611" } },
        "features": [
            { "type": "Feature",
              "geometry": { "type": "LineString", "coordinates": [[0, 0], [100.5, 0]] },
              "properties": { "t_ID": 3, "name": "reach a", "q": 1.5 } },
            { "type": "Feature", "geometry": null, "properties": {} }
        ]
    }"#;

    #[test]
    fn test_parse_streams_with_crs() {
        let fc = feature_collection_from_str(STREAMS).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.crs.as_ref().and_then(CRS::epsg), Some(32611));

        let first = &fc.features[0];
        assert_eq!(first.get_property("t_ID"), Some(&AttributeValue::Int(3)));
        assert_eq!(first.get_property("q"), Some(&AttributeValue::Float(1.5)));
        assert_eq!(first.line_strings()[0].0[1].x, 100.5);
        assert!(fc.features[1].geometry.is_none());
    }

    #[test]
    fn test_non_finite_floats_are_written_as_null() {
        let fc: FeatureCollection = vec![Feature::new(Point::new(1.0, 2.0))
            .with_property("RAT", f64::NAN)]
        .into_iter()
        .collect();
        let text = feature_collection_to_string(&fc).unwrap();
        let back = feature_collection_from_str(&text).unwrap();
        assert_eq!(back.features[0].get_property("RAT"), Some(&AttributeValue::Null));
    }

    #[test]
    fn test_unknown_geometry_type_is_rejected() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Circle","coordinates":[0,0]},"properties":{}}]}"#;
        assert!(matches!(
            feature_collection_from_str(text),
            Err(Error::UnsupportedGeometry(_))
        ));
    }
}
