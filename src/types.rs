use geo::{MultiLineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::spatial::CountyIndex;
use crate::topology::TopologyDocument;

/// One row of the education dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub fips: u32,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

/// Both datasets, fetched and parsed.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub education: Vec<EducationRecord>,
    pub topology: TopologyDocument,
}

/// A county boundary in map coordinates, tagged with its topology id.
#[derive(Debug, Clone)]
pub struct CountyShape {
    /// `None` for missing, string or negative ids. Such shapes never match a
    /// record.
    pub fips: Option<u32>,
    /// The id as written in the topology; empty when absent.
    pub label: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct RenderedCounty {
    pub fips: Option<u32>,
    pub label: String,
    pub geometry: MultiPolygon<f64>,
    pub record: Option<EducationRecord>,
    pub fill: &'static str,
}

impl RenderedCounty {
    /// The exposed percentage; counties without a record expose zero.
    pub fn education(&self) -> f64 {
        self.record.as_ref().map_or(0.0, |r| r.bachelors_or_higher)
    }
}

/// Everything the renderers need, computed once per session.
#[derive(Debug)]
pub struct MapModel {
    pub counties: Vec<RenderedCounty>,
    pub state_borders: MultiLineString<f64>,
    pub index: CountyIndex,
}

impl MapModel {
    pub fn county(&self, fips: u32) -> Option<&RenderedCounty> {
        self.counties.iter().find(|c| c.fips == Some(fips))
    }

    /// County under a point in map coordinates.
    pub fn county_at(&self, x: f64, y: f64) -> Option<&RenderedCounty> {
        self.index
            .locate(&self.counties, x, y)
            .and_then(|i| self.counties.get(i))
    }
}
