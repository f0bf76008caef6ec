//! Non-fatal pipeline conditions

use serde::Serialize;
use std::fmt;

/// External datasets read by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    LandCover,
    ProtectedLands,
    Slope,
    CriticalHabitat,
    Hydrography,
    Roads,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dataset::LandCover => "land cover",
            Dataset::ProtectedLands => "protected lands",
            Dataset::Slope => "slope",
            Dataset::CriticalHabitat => "critical habitat",
            Dataset::Hydrography => "hydrography",
            Dataset::Roads => "roads",
        })
    }
}

/// Something worth reporting that did not stop the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The dataset had no coverage or no features for the region; its
    /// mask was built empty (or, for slope, left unconstrained)
    MissingExternalData { dataset: Dataset },
    /// No candidate land cover; retained fractions are undefined
    ZeroCandidateArea,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingExternalData { dataset } => write!(f, "no {} data for region", dataset),
            Diagnostic::ZeroCandidateArea => f.write_str("candidate land-cover area is zero"),
        }
    }
}
