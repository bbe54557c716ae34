//! GeoJSON export

use serde_json::{Map, Value as Json, json};

use crate::feature::{Feature, Geometry, LayerInfo, Value};

fn geometry_json(geometry: &Geometry) -> Json {
    match geometry {
        Geometry::Point(c) => json!({ "type": "Point", "coordinates": [c.x, c.y] }),
        Geometry::LineString(coords) => json!({
            "type": "LineString",
            "coordinates": coords.iter().map(|c| [c.x, c.y]).collect::<Vec<_>>(),
        }),
    }
}

fn value_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(i) => json!(i),
        Value::Real(r) => json!(r),
        Value::Text(s) => json!(s),
    }
}

/// Render a layer as a GeoJSON FeatureCollection.
///
/// Every schema field appears in each feature's properties (null when unset).
/// The layer CRS is carried in the legacy named `crs` member.
pub fn to_feature_collection(info: &LayerInfo, features: &[Feature]) -> Json {
    let features: Vec<Json> = features
        .iter()
        .map(|f| {
            let mut props = Map::new();
            for field in &info.fields {
                props.insert(field.name.clone(), value_json(f.get(&field.name)));
            }
            json!({
                "type": "Feature",
                "id": f.id,
                "geometry": geometry_json(&f.geometry),
                "properties": props,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "name": info.name,
        "crs": { "type": "name", "properties": { "name": info.crs } },
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FieldType, GeometryKind, LayerSpec, NewFeature};

    #[test]
    fn test_feature_collection_shape() {
        let info = LayerInfo::from_spec(
            &LayerSpec::new("Outbreak_Points", GeometryKind::Point, "EPSG:4326")
                .field("Species", FieldType::Text)
                .field("Cases", FieldType::Integer),
        );
        let features = vec![
            NewFeature::new(Geometry::point(38.74, 9.03))
                .with("Species", "Cattle")
                .into_feature(1),
        ];

        let fc = to_feature_collection(&info, &features);
        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["crs"]["properties"]["name"], "EPSG:4326");
        let f = &fc["features"][0];
        assert_eq!(f["geometry"]["coordinates"][0], 38.74);
        assert_eq!(f["geometry"]["coordinates"][1], 9.03);
        assert_eq!(f["properties"]["Species"], "Cattle");
        assert!(f["properties"]["Cases"].is_null());
    }
}
