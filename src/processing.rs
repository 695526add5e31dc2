use crate::classify::{classify, FALLBACK_COLOR};
use crate::spatial::CountyIndex;
use crate::topology::{project_counties, state_borders, TopologyError};
use crate::types::{CountyShape, Datasets, EducationRecord, MapModel, RenderedCounty};
use std::collections::HashMap;
use tracing::{debug, info};

/// Project the topology and join every county shape with its record.
pub fn build_model(datasets: &Datasets) -> Result<MapModel, TopologyError> {
    let shapes = project_counties(&datasets.topology)?;
    let state_borders = state_borders(&datasets.topology)?;
    info!(
        counties = shapes.len(),
        border_lines = state_borders.0.len(),
        "projected topology"
    );

    let counties = join_counties(shapes, &datasets.education);
    let index = CountyIndex::build(&counties);

    Ok(MapModel {
        counties,
        state_borders,
        index,
    })
}

/// Pair each shape with its record by FIPS id and resolve its fill. Shapes
/// without a record get the fallback colour. Duplicate records: last wins.
pub fn join_counties(shapes: Vec<CountyShape>, records: &[EducationRecord]) -> Vec<RenderedCounty> {
    let by_fips: HashMap<u32, &EducationRecord> = records.iter().map(|r| (r.fips, r)).collect();

    let counties: Vec<RenderedCounty> = shapes
        .into_iter()
        .map(|shape| {
            let record = shape
                .fips
                .and_then(|fips| by_fips.get(&fips))
                .map(|r| (*r).clone());
            let fill = record
                .as_ref()
                .map_or(FALLBACK_COLOR, |r| classify(r.bachelors_or_higher));
            RenderedCounty {
                fips: shape.fips,
                label: shape.label,
                geometry: shape.geometry,
                record,
                fill,
            }
        })
        .collect();

    let unmatched = counties.iter().filter(|c| c.record.is_none()).count();
    debug!(unmatched, "joined counties with education records");
    counties
}
