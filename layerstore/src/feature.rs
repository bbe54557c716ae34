//! Feature, geometry and schema types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::StoreError;

/// Identifier of a feature within its layer (1-based, assigned on append)
pub type FeatureId = u64;

/// A coordinate pair in layer units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate
    pub fn distance(&self, other: &Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Geometry type a layer is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    LineString,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::LineString => write!(f, "linestring"),
        }
    }
}

/// Feature geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
}

impl Geometry {
    /// Point geometry from x (longitude/easting) and y (latitude/northing)
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(Coord::new(x, y))
    }

    /// Two-vertex line from `from` to `to`
    pub fn line(from: Coord, to: Coord) -> Self {
        Self::LineString(vec![from, to])
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
        }
    }

    /// The point coordinate, if this is a point
    pub fn as_point(&self) -> Option<Coord> {
        match self {
            Self::Point(c) => Some(*c),
            Self::LineString(_) => None,
        }
    }

    /// Distance from `target` to the nearest vertex of this geometry
    pub fn distance_to(&self, target: &Coord) -> f64 {
        match self {
            Self::Point(c) => c.distance(target),
            Self::LineString(coords) => coords
                .iter()
                .map(|c| c.distance(target))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn coords(&self) -> &[Coord] {
        match self {
            Self::Point(c) => std::slice::from_ref(c),
            Self::LineString(coords) => coords,
        }
    }

    /// Check coordinates are finite and lines have at least two vertices
    pub fn check(&self) -> Result<(), StoreError> {
        if !self.coords().iter().all(Coord::is_finite) {
            return Err(StoreError::InvalidGeometry("non-finite coordinate".to_string()));
        }
        if let Self::LineString(coords) = self
            && coords.len() < 2
        {
            return Err(StoreError::InvalidGeometry(format!(
                "linestring needs at least 2 vertices, got {}",
                coords.len()
            )));
        }
        Ok(())
    }
}

/// Bounding box of a set of geometries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounds enclosing all given geometries, or None when there are none
    pub fn of<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for coord in geometries.into_iter().flat_map(|g| g.coords()) {
            bounds = Some(match bounds {
                None => Bounds {
                    min_x: coord.x,
                    min_y: coord.y,
                    max_x: coord.x,
                    max_y: coord.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(coord.x),
                    min_y: b.min_y.min(coord.y),
                    max_x: b.max_x.max(coord.x),
                    max_y: b.max_y.max(coord.y),
                },
            });
        }
        bounds
    }
}

/// Attribute field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Real,
    /// Timestamp stored as text (RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]`)
    DateTime,
}

impl FieldType {
    /// Check whether a value may be stored in a field of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Integer, Value::Integer(_)) => true,
            // JSON has no NaN or infinity
            (Self::Real, Value::Real(r)) => r.is_finite(),
            (Self::Real, Value::Integer(_)) => true,
            (Self::DateTime, Value::Text(s)) => parse_timestamp(s).is_some(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::DateTime => write!(f, "datetime"),
        }
    }
}

/// An attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; text is parsed after trimming
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Null => None,
        }
    }

    /// Timestamp view of the value (text only)
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        self.as_text().and_then(parse_timestamp)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Text(ts.to_rfc3339())
    }
}

/// Parse the timestamp formats accepted by `DateTime` fields
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A named, typed attribute field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Requested shape of a layer for get-or-create
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub geometry: GeometryKind,
    pub crs: String,
    pub fields: Vec<FieldDef>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, geometry: GeometryKind, crs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry,
            crs: crs.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (builder style)
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }
}

/// Stored layer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub geometry: GeometryKind,
    pub crs: String,
    pub fields: Vec<FieldDef>,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

impl LayerInfo {
    pub(crate) fn from_spec(spec: &LayerSpec) -> Self {
        Self {
            name: spec.name.clone(),
            geometry: spec.geometry,
            crs: spec.crs.clone(),
            fields: spec.fields.clone(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Check a feature against this layer's geometry kind and schema
    pub fn check(&self, feature: &NewFeature) -> Result<(), StoreError> {
        feature.geometry.check()?;
        if feature.geometry.kind() != self.geometry {
            return Err(StoreError::GeometryMismatch {
                layer: self.name.clone(),
                expected: self.geometry,
                actual: feature.geometry.kind(),
            });
        }
        for (name, value) in &feature.attributes {
            let def = self.field(name).ok_or_else(|| StoreError::UnknownField {
                layer: self.name.clone(),
                field: name.clone(),
            })?;
            if !def.field_type.accepts(value) {
                return Err(StoreError::TypeMismatch {
                    layer: self.name.clone(),
                    field: name.clone(),
                    expected: def.field_type,
                    value: serde_json::to_string(value)?,
                });
            }
        }
        Ok(())
    }
}

/// A feature to be appended; the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeature {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, Value>,
}

impl NewFeature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub(crate) fn into_feature(self, id: FeatureId) -> Feature {
        Feature {
            id,
            geometry: self.geometry,
            attributes: self.attributes,
        }
    }
}

/// A stored feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    /// Attribute value, `Null` when unset
    pub fn get(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbreak_layer() -> LayerInfo {
        LayerInfo::from_spec(
            &LayerSpec::new("Outbreak_Points", GeometryKind::Point, "EPSG:4326")
                .field("Species", FieldType::Text)
                .field("Cases", FieldType::Integer)
                .field("Event_Date", FieldType::DateTime),
        )
    }

    #[test]
    fn test_value_json_shapes() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(3),
            Value::Real(2.5),
            Value::from("Boran"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,2.5,"Boran"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], Value::Integer(3));
        assert_eq!(back[2], Value::Real(2.5));
    }

    #[test]
    fn test_value_as_f64_coerces_text() {
        assert_eq!(Value::from(" 12 ").as_f64(), Some(12.0));
        assert_eq!(Value::from("twelve").as_f64(), None);
        assert_eq!(Value::from("NaN").as_f64(), None);
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-10-03").is_some());
        assert!(parse_timestamp("2024-10-03 14:00:00").is_some());
        assert!(parse_timestamp("2024-10-03T14:00:00+03:00").is_some());
        assert!(parse_timestamp("03/10/2024").is_none());
    }

    #[test]
    fn test_check_accepts_conforming_feature() {
        let layer = outbreak_layer();
        let feature = NewFeature::new(Geometry::point(38.74, 9.03))
            .with("Species", "Cattle")
            .with("Cases", 4i64)
            .with("Event_Date", "2024-10-03");
        assert!(layer.check(&feature).is_ok());
    }

    #[test]
    fn test_check_rejects_unknown_field() {
        let layer = outbreak_layer();
        let feature = NewFeature::new(Geometry::point(38.74, 9.03)).with("Colour", "red");
        let err = layer.check(&feature).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { ref field, .. } if field == "Colour"));
    }

    #[test]
    fn test_check_rejects_wrong_type_and_geometry() {
        let layer = outbreak_layer();
        let feature = NewFeature::new(Geometry::point(38.74, 9.03)).with("Cases", "many");
        assert!(matches!(layer.check(&feature), Err(StoreError::TypeMismatch { .. })));

        let line = NewFeature::new(Geometry::line(Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)));
        assert!(matches!(layer.check(&line), Err(StoreError::GeometryMismatch { .. })));

        let bad = NewFeature::new(Geometry::point(f64::NAN, 9.0));
        assert!(matches!(layer.check(&bad), Err(StoreError::InvalidGeometry(_))));
    }

    #[test]
    fn test_real_field_rejects_non_finite() {
        assert!(FieldType::Real.accepts(&Value::Real(2.5)));
        assert!(FieldType::Real.accepts(&Value::Integer(2)));
        assert!(!FieldType::Real.accepts(&Value::Real(f64::NAN)));
        assert!(!FieldType::Real.accepts(&Value::Real(f64::INFINITY)));

        let layer = LayerInfo::from_spec(
            &LayerSpec::new("Herds", GeometryKind::Point, "EPSG:4326").field("Attack_Rate", FieldType::Real),
        );
        let feature = NewFeature::new(Geometry::point(38.74, 9.03)).with("Attack_Rate", f64::NAN);
        assert!(matches!(layer.check(&feature), Err(StoreError::TypeMismatch { .. })));
    }

    #[test]
    fn test_bounds_and_distance() {
        let geoms = [Geometry::point(1.0, 5.0), Geometry::point(-2.0, 3.0)];
        let b = Bounds::of(&geoms).unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (-2.0, 3.0, 1.0, 5.0));
        assert!(Bounds::of(&Vec::<Geometry>::new()).is_none());

        let p = Geometry::point(3.0, 4.0);
        assert_eq!(p.distance_to(&Coord::new(0.0, 0.0)), 5.0);
    }

    #[test]
    fn test_feature_get_defaults_to_null() {
        let feature = NewFeature::new(Geometry::point(0.0, 0.0)).with("Notes", "x").into_feature(1);
        assert_eq!(feature.get("Notes"), &Value::from("x"));
        assert!(feature.get("Missing").is_null());
    }
}
