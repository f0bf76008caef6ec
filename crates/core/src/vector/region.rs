use crate::vector::AttributeValue;
use geo::{Area, BoundingRect, MultiPolygon, Polygon, Rect};
use std::collections::BTreeMap;

/// One polygonal unit of analysis (a national forest, a wildfire-priority
/// landscape, a state). Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Region made of a single polygon
    pub fn from_polygon(id: impl Into<String>, name: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::new(id, name, MultiPolygon::new(vec![polygon]))
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Envelope of the region geometry; `None` for an empty geometry
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Planar area of the region polygon in map units squared
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}
