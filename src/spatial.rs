use crate::types::RenderedCounty;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use std::fmt;

// Bounding box of one county, pointing back into the county list.
#[derive(Debug)]
pub struct CountyEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// R-tree over county bounding boxes for pointer hit testing.
pub struct CountyIndex {
    tree: RTree<CountyEnvelope>,
}

impl fmt::Debug for CountyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountyIndex").field("size", &self.tree.size()).finish()
    }
}

impl CountyIndex {
    pub fn build(counties: &[RenderedCounty]) -> Self {
        let items: Vec<CountyEnvelope> = counties
            .iter()
            .enumerate()
            .filter_map(|(index, county)| {
                // Empty geometries have no box and can never be hit.
                let rect = county.geometry.bounding_rect()?;
                Some(CountyEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Index of the county containing `(x, y)`, if any.
    pub fn locate(&self, counties: &[RenderedCounty], x: f64, y: f64) -> Option<usize> {
        let point = Point::new(x, y);
        let envelope = AABB::from_point([x, y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| counties.get(i).is_some_and(|c| c.geometry.contains(&point)))
            .min()
    }
}
