//! External data seams
//!
//! Every dataset the pipeline reads sits behind a small trait so tests can
//! inject fakes and the CLI can hand in file-backed layers. `Ok(None)` or an
//! empty feature list means the dataset has nothing for the region; `Err`
//! is a failed fetch and aborts only the region being processed.

use crate::terrain::{slope, SlopeParams};
use forestmgmt_core::{ProtectedArea, Raster, RasterElement, Region, Result};
use geo::{BoundingRect, Geometry, Intersects, Rect};

/// Land-cover classification at a fixed ground resolution
pub trait LandCoverSource: Send + Sync {
    /// Class codes covering (at least) the region's envelope
    fn classify(&self, region: &Region) -> Result<Option<Raster<u16>>>;
}

/// Slope in percent rise
pub trait SlopeSource: Send + Sync {
    fn slope_percent(&self, region: &Region) -> Result<Option<Raster<f64>>>;
}

/// Vector dataset queried by search rectangle
pub trait FeatureSource<T>: Send + Sync {
    /// Features whose envelope intersects `bounds`
    fn query(&self, bounds: &Rect<f64>) -> Result<Vec<T>>;
}

/// Records a [`FeatureLayer`] can prefilter by envelope
pub trait HasEnvelope {
    /// `None` for an empty geometry
    fn envelope(&self) -> Option<Rect<f64>>;
}

impl HasEnvelope for Geometry<f64> {
    fn envelope(&self) -> Option<Rect<f64>> {
        self.bounding_rect()
    }
}

impl HasEnvelope for ProtectedArea {
    fn envelope(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

impl HasEnvelope for Region {
    fn envelope(&self) -> Option<Rect<f64>> {
        self.bounding_rect()
    }
}

/// In-memory raster answering with the window under the region envelope
#[derive(Debug, Clone)]
pub struct RasterLayer<T: RasterElement> {
    raster: Raster<T>,
}

impl<T: RasterElement> RasterLayer<T> {
    pub fn new(raster: Raster<T>) -> Self {
        Self { raster }
    }

    pub fn raster(&self) -> &Raster<T> {
        &self.raster
    }

    fn window(&self, region: &Region) -> Option<Raster<T>> {
        let bbox = region.bounding_rect()?;
        self.raster
            .window_for_bounds(bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y)
    }
}

impl LandCoverSource for RasterLayer<u16> {
    fn classify(&self, region: &Region) -> Result<Option<Raster<u16>>> {
        Ok(self.window(region))
    }
}

impl SlopeSource for RasterLayer<f64> {
    fn slope_percent(&self, region: &Region) -> Result<Option<Raster<f64>>> {
        Ok(self.window(region))
    }
}

/// Slope derived on demand from an elevation model
#[derive(Debug, Clone)]
pub struct DemSlope {
    dem: Raster<f64>,
    params: SlopeParams,
}

impl DemSlope {
    /// Cells of context read around the region so the Horn window is full
    /// at the region edge
    const MARGIN_CELLS: f64 = 2.0;

    pub fn new(dem: Raster<f64>) -> Self {
        Self {
            dem,
            params: SlopeParams::default(),
        }
    }

    pub fn with_z_factor(mut self, z_factor: f64) -> Self {
        self.params.z_factor = z_factor;
        self
    }
}

impl SlopeSource for DemSlope {
    fn slope_percent(&self, region: &Region) -> Result<Option<Raster<f64>>> {
        let Some(bbox) = region.bounding_rect() else {
            return Ok(None);
        };
        let m = Self::MARGIN_CELLS * self.dem.cell_size();
        let Some(window) = self
            .dem
            .window_for_bounds(bbox.min().x - m, bbox.min().y - m, bbox.max().x + m, bbox.max().y + m)
        else {
            return Ok(None);
        };
        slope(&window, self.params.clone()).map(Some)
    }
}

/// In-memory vector dataset with an envelope prefilter
#[derive(Debug, Clone)]
pub struct FeatureLayer<T> {
    features: Vec<(T, Rect<f64>)>,
}

impl<T: HasEnvelope> FeatureLayer<T> {
    /// Features without an envelope (empty geometries) are dropped
    pub fn new(features: Vec<T>) -> Self {
        let features = features
            .into_iter()
            .filter_map(|f| {
                let bbox = f.envelope()?;
                Some((f, bbox))
            })
            .collect();
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<T> FeatureSource<T> for FeatureLayer<T>
where
    T: HasEnvelope + Clone + Send + Sync,
{
    fn query(&self, bounds: &Rect<f64>) -> Result<Vec<T>> {
        Ok(self
            .features
            .iter()
            .filter(|(_, bbox)| bbox.intersects(bounds))
            .map(|(f, _)| f.clone())
            .collect())
    }
}

/// Every external dataset of a run.
///
/// Only land cover is required. Road and hydrography sources may be
/// given more than once; their features are unioned. Sub-regions are only
/// read by the overlay.
pub struct DataSources {
    pub landcover: Box<dyn LandCoverSource>,
    pub slope: Option<Box<dyn SlopeSource>>,
    pub protected: Option<Box<dyn FeatureSource<ProtectedArea>>>,
    pub habitat: Option<Box<dyn FeatureSource<Geometry<f64>>>>,
    pub hydrography: Vec<Box<dyn FeatureSource<Geometry<f64>>>>,
    pub roads: Vec<Box<dyn FeatureSource<Geometry<f64>>>>,
    pub subregions: Option<Box<dyn FeatureSource<Region>>>,
}

impl DataSources {
    pub fn new(landcover: impl LandCoverSource + 'static) -> Self {
        Self {
            landcover: Box::new(landcover),
            slope: None,
            protected: None,
            habitat: None,
            hydrography: Vec::new(),
            roads: Vec::new(),
            subregions: None,
        }
    }

    pub fn with_slope(mut self, source: impl SlopeSource + 'static) -> Self {
        self.slope = Some(Box::new(source));
        self
    }

    pub fn with_protected(mut self, source: impl FeatureSource<ProtectedArea> + 'static) -> Self {
        self.protected = Some(Box::new(source));
        self
    }

    pub fn with_habitat(mut self, source: impl FeatureSource<Geometry<f64>> + 'static) -> Self {
        self.habitat = Some(Box::new(source));
        self
    }

    pub fn with_hydrography(mut self, source: impl FeatureSource<Geometry<f64>> + 'static) -> Self {
        self.hydrography.push(Box::new(source));
        self
    }

    pub fn with_roads(mut self, source: impl FeatureSource<Geometry<f64>> + 'static) -> Self {
        self.roads.push(Box::new(source));
        self
    }

    pub fn with_subregions(mut self, source: impl FeatureSource<Region> + 'static) -> Self {
        self.subregions = Some(Box::new(source));
        self
    }
}
