//! GeoJSON export of feature collections

use crate::error::Result;
use crate::vector::{Feature, FeatureCollection};
use geojson::{GeoJson, Geometry, JsonObject};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn to_geojson_feature(feature: &Feature) -> Result<geojson::Feature> {
    // serde_json is built with preserve_order, so attributes keep their order
    let mut properties = JsonObject::new();
    for (key, value) in &feature.properties {
        properties.insert(key.clone(), serde_json::to_value(value)?);
    }
    Ok(geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| Geometry::new(geojson::Value::from(g))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Convert a collection to a GeoJSON `FeatureCollection`
pub fn to_geojson(fc: &FeatureCollection) -> Result<geojson::FeatureCollection> {
    let features = fc.iter().map(to_geojson_feature).collect::<Result<Vec<_>>>()?;
    Ok(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Write a collection to a `.geojson` file
pub fn write_geojson<P: AsRef<Path>>(fc: &FeatureCollection, path: P) -> Result<()> {
    let layer = GeoJson::FeatureCollection(to_geojson(fc)?);
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &layer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry as GeoGeometry, MultiPolygon};
    use serde_json::{json, Value};

    fn square_feature() -> Feature {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        Feature::new(GeoGeometry::MultiPolygon(MultiPolygon(vec![square])))
            .with("ARCID", 12_i64)
            .with("Width", 41.5)
            .with("Missing", f64::NAN)
    }

    #[test]
    fn test_properties_keep_order_and_nan_becomes_null() {
        let mut fc = FeatureCollection::new();
        fc.push(square_feature());
        let layer = to_geojson(&fc).unwrap();

        let props = layer.features[0].properties.as_ref().unwrap();
        let keys: Vec<_> = props.keys().cloned().collect();
        assert_eq!(keys, vec!["ARCID", "Width", "Missing"]);
        assert!(props["Missing"].is_null());
        assert_eq!(props["ARCID"], json!(12));

        let geometry = layer.features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            geojson::Value::MultiPolygon(polys) => {
                assert_eq!(polys.len(), 1);
                assert_eq!(polys[0][0][0], vec![0.0, 0.0]);
                // rings are closed
                assert_eq!(polys[0][0].first(), polys[0][0].last());
            }
            other => panic!("expected a MultiPolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_write_geojson_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.geojson");
        let mut fc = FeatureCollection::new();
        fc.push(square_feature());
        write_geojson(&fc, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "MultiPolygon");
        assert_eq!(value["features"][0]["properties"]["Width"], json!(41.5));

        let parsed: GeoJson = text.parse().unwrap();
        assert!(matches!(parsed, GeoJson::FeatureCollection(ref c) if c.features.len() == 1));
    }
}
