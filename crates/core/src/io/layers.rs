//! GeoJSON import of regions and constraint layers, export of the
//! treatable-area layer

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, ProtectedArea, Region, TreatableFeature};
use geo::{Geometry, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fs;
use std::path::Path;

/// Property names used to build [`Region`]s
#[derive(Debug, Clone)]
pub struct RegionFields {
    /// Property holding the region identifier; the GeoJSON feature id or
    /// the feature's position is used when absent
    pub id_field: Option<String>,
    /// Property holding the display name
    pub name_field: String,
}

impl Default for RegionFields {
    fn default() -> Self {
        Self {
            id_field: None,
            name_field: "NAME".to_string(),
        }
    }
}

/// Property names used to build [`ProtectedArea`]s (PAD-US conventions)
#[derive(Debug, Clone)]
pub struct ProtectedAreaFields {
    pub status_field: String,
    pub designation_field: String,
}

impl Default for ProtectedAreaFields {
    fn default() -> Self {
        Self {
            status_field: "GAP_Sts".to_string(),
            designation_field: "Des_Tp".to_string(),
        }
    }
}

fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let text = fs::read_to_string(path)?;
    let parsed: GeoJson = text.parse()?;
    Ok(match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

fn feature_geometry(feature: &Feature) -> Result<Option<Geometry<f64>>> {
    match &feature.geometry {
        Some(g) => Ok(Some(Geometry::<f64>::try_from(g.clone())?)),
        None => Ok(None),
    }
}

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a JsonValue> {
    feature.properties.as_ref().and_then(|p| p.get(key))
}

fn property_string(feature: &Feature, key: &str) -> Option<String> {
    property(feature, key)
        .map(AttributeValue::from)
        .map(|v| v.to_string())
        .filter(|s| !s.is_empty())
}

/// Read regions of interest; every feature must be a (multi)polygon.
pub fn read_regions<P: AsRef<Path>>(path: P, fields: &RegionFields) -> Result<Vec<Region>> {
    let features = read_features(path.as_ref())?;
    let mut regions = Vec::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let id = fields
            .id_field
            .as_deref()
            .and_then(|key| property_string(feature, key))
            .or_else(|| match &feature.id {
                Some(Id::String(s)) => Some(s.clone()),
                Some(Id::Number(n)) => Some(n.to_string()),
                None => None,
            })
            .unwrap_or_else(|| index.to_string());
        let name = property_string(feature, &fields.name_field).unwrap_or_else(|| id.clone());

        let geometry = match feature_geometry(feature)? {
            Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
            Some(Geometry::MultiPolygon(mp)) => mp,
            Some(_) => {
                return Err(Error::Geometry {
                    region: id,
                    reason: "region geometry must be a Polygon or MultiPolygon".into(),
                })
            }
            None => {
                return Err(Error::Geometry {
                    region: id,
                    reason: "region has no geometry".into(),
                })
            }
        };

        let mut region = Region::new(id, name, geometry);
        if let Some(props) = &feature.properties {
            for (key, value) in props {
                region.attributes.insert(key.clone(), AttributeValue::from(value));
            }
        }
        regions.push(region);
    }

    Ok(regions)
}

/// Read a protected-lands layer.
///
/// GAP status codes are often stored as text and are parsed to integers.
pub fn read_protected_areas<P: AsRef<Path>>(
    path: P,
    fields: &ProtectedAreaFields,
) -> Result<Vec<ProtectedArea>> {
    let features = read_features(path.as_ref())?;
    let mut areas = Vec::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = feature_geometry(feature)? else {
            continue;
        };
        let status = property(feature, &fields.status_field)
            .map(AttributeValue::from)
            .and_then(|v| v.as_code())
            .and_then(|code| u8::try_from(code).ok())
            .ok_or_else(|| {
                Error::Format(format!(
                    "feature {} has no valid '{}' status code",
                    index, fields.status_field
                ))
            })?;
        let designation = property_string(feature, &fields.designation_field).unwrap_or_default();
        areas.push(ProtectedArea::new(geometry, status, designation));
    }

    Ok(areas)
}

/// Read every non-null geometry of a layer (roads, trails, hydrography,
/// critical habitat).
pub fn read_geometries<P: AsRef<Path>>(path: P) -> Result<Vec<Geometry<f64>>> {
    let features = read_features(path.as_ref())?;
    let mut geometries = Vec::with_capacity(features.len());
    for feature in &features {
        if let Some(g) = feature_geometry(feature)? {
            geometries.push(g);
        }
    }
    Ok(geometries)
}

/// Build the treatable-area layer: one feature per polygon with
/// `istreatable` (0/1), `region_id`, `cell_count` and `area_m2`.
pub fn treatable_feature_collection(features: &[TreatableFeature]) -> FeatureCollection {
    let features = features
        .iter()
        .map(|f| {
            let mut properties = JsonMap::new();
            properties.insert("istreatable".into(), JsonValue::from(u8::from(f.treatable)));
            properties.insert("region_id".into(), JsonValue::from(f.region_id.clone()));
            properties.insert("cell_count".into(), JsonValue::from(f.cell_count));
            properties.insert("area_m2".into(), JsonValue::from(f.area_m2));
            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write the treatable-area layer as a GeoJSON FeatureCollection
pub fn write_treatable_geojson<P: AsRef<Path>>(path: P, features: &[TreatableFeature]) -> Result<()> {
    let collection = GeoJson::FeatureCollection(treatable_feature_collection(features));
    fs::write(path.as_ref(), collection.to_string())?;
    Ok(())
}
