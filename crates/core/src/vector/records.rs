use geo::{Geometry, Polygon};

/// A protected-lands polygon with its GAP status and designation type
#[derive(Debug, Clone)]
pub struct ProtectedArea {
    pub geometry: Geometry<f64>,
    pub gap_status: u8,
    pub designation_type: String,
}

impl ProtectedArea {
    pub fn new(geometry: Geometry<f64>, gap_status: u8, designation_type: impl Into<String>) -> Self {
        Self {
            geometry,
            gap_status,
            designation_type: designation_type.into(),
        }
    }

    /// Inventoried roadless area
    pub fn is_roadless(&self) -> bool {
        self.designation_type == "IRA"
    }
}

/// One polygon of the final treatable-area layer.
///
/// Covers 4-connected candidate cells sharing the same treatable state.
#[derive(Debug, Clone)]
pub struct TreatableFeature {
    pub region_id: String,
    pub treatable: bool,
    pub geometry: Polygon<f64>,
    pub cell_count: usize,
    pub area_m2: f64,
}
