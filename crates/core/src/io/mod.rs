//! Reading rasters and vector layers, writing the treatable-area layer

mod layers;
mod native;

pub use layers::{
    read_geometries, read_protected_areas, read_regions, treatable_feature_collection,
    write_treatable_geojson, ProtectedAreaFields, RegionFields,
};
pub use native::{read_geotiff, read_geotiff_from_buffer};
