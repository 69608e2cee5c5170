//! Vector features produced by polygonizing raster masks
//!
//! Attributes keep insertion order so that exported layers list their
//! fields in a stable, documented order.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

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
    /// Numeric view of the value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            AttributeValue::Float(v)
        } else {
            AttributeValue::Null
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// A geographic feature with geometry and ordered attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Vec<(String, AttributeValue)>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Vec::new(),
        }
    }

    /// Set an attribute, replacing an existing value of the same name
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Builder-style `set_property`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Collection of features forming one output layer
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
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
}

impl Extend<Feature> for FeatureCollection {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.features.extend(iter);
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
    use geo_types::{point, Geometry};

    fn feature() -> Feature {
        Feature::new(Geometry::Point(point!(x: 1.0, y: 2.0)))
    }

    #[test]
    fn test_set_property_replaces_in_place() {
        let mut f = feature().with("ID", 7i64).with("Area", 12.5);
        f.set_property("ID", 9i64);
        let keys: Vec<&str> = f.properties.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["ID", "Area"]);
        assert_eq!(f.get_property("ID"), Some(&AttributeValue::Int(9)));
        assert_eq!(f.get_property("Area").and_then(AttributeValue::as_f64), Some(12.5));
        assert!(f.get_property("missing").is_none());
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(AttributeValue::from(f64::NAN), AttributeValue::Null);
        assert_eq!(AttributeValue::from(f64::INFINITY), AttributeValue::Null);
        assert_eq!(AttributeValue::from("R").as_f64(), None);
    }

    #[test]
    fn test_collection_extend() {
        let mut layer = FeatureCollection::new();
        assert!(layer.is_empty());
        layer.push(feature());
        layer.extend(vec![feature(), feature()]);
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.iter().count(), 3);
        assert_eq!(layer.into_iter().count(), 3);
    }
}
