//! File-based I/O round trips for the layers the CLI exchanges.

use geo_types::{line_string, polygon, Geometry};
use openres_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff};
use openres_core::{AttributeValue, Feature, FeatureCollection, GeoTransform, Raster, CRS};

#[test]
fn geojson_file_roundtrip_preserves_attributes_and_crs() {
    let mut fc = FeatureCollection::with_crs(Some(CRS::from_epsg(26910)));
    fc.push(
        Feature::new(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 5.0), (x: 20.0, y: 5.0)])
            .with_property("t_ID", 1u32)
            .with_property("side", "LEFT"),
    );
    fc.push(
        Feature::new(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
            .with_property("GEO", "alluvium"),
    );

    let tmp = tempfile::NamedTempFile::with_suffix(".geojson").unwrap();
    write_geojson(&fc, tmp.path()).expect("write failed");
    let back = read_geojson(tmp.path()).expect("read failed");

    assert_eq!(back.len(), 2);
    assert_eq!(back.crs.as_ref().and_then(CRS::epsg), Some(26910));
    assert_eq!(back.features[0].get_property("t_ID"), Some(&AttributeValue::Int(1)));
    assert!(matches!(back.features[1].geometry, Some(Geometry::Polygon(_))));
    assert_eq!(back.features[0].line_strings()[0].0.len(), 3);
}

#[test]
fn geotiff_file_roundtrip() {
    let mut mask: Raster<u8> = Raster::new(6, 8);
    mask.set_transform(GeoTransform::new(10.0, 60.0, 10.0, -10.0));
    for col in 2..6 {
        mask.set(3, col, 1).unwrap();
    }

    let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
    write_geotiff(&mask, tmp.path()).expect("write failed");
    let back: Raster<u8> = read_geotiff(tmp.path()).expect("read failed");

    assert_eq!(back.shape(), (6, 8));
    assert_eq!(back.get(3, 4).unwrap(), 1);
    assert_eq!(back.get(0, 0).unwrap(), 0);
    assert_eq!(back.transform().cell_size(), 10.0);
    assert_eq!(back.transform(), mask.transform());
    assert_eq!(back.cell_at(45.0, 25.0), Some((3, 3)));
}
