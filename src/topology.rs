//! TopoJSON decoding and the identity path generator.
//!
//! The county topology is already projected into the 960x600 viewport, so
//! decoded coordinates are drawn as-is. Two conversions are supported:
//! [`ArcTable::features`] turns areal geometries into id-tagged multipolygons,
//! and [`ArcTable::mesh`] extracts shared borders as stitched lines.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use thiserror::Error;

use crate::types::CountyShape;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("arc reference {0} is out of range")]
    ArcIndex(i64),
    #[error("arc {0} has no positions")]
    EmptyArc(usize),
    #[error("position {position} of arc {arc} has fewer than two coordinates")]
    Position { arc: usize, position: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyDocument {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub objects: TopologyObjects,
    pub arcs: Vec<Vec<Vec<f64>>>,
}

/// The two objects the map needs. Other objects (e.g. `nation`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyObjects {
    pub counties: TopoGeometry,
    pub states: TopoGeometry,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GeometryId {
    Number(i64),
    Text(String),
}

impl GeometryId {
    /// Only numeric ids join against education records. String ids never
    /// match, even when they look numeric.
    fn fips(&self) -> Option<u32> {
        match self {
            GeometryId::Number(n) => u32::try_from(*n).ok(),
            GeometryId::Text(_) => None,
        }
    }

    fn label(&self) -> String {
        match self {
            GeometryId::Number(n) => n.to_string(),
            GeometryId::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        #[serde(deserialize_with = "collection_members")]
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<Vec<Vec<i64>>>,
    },
    LineString {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<i64>,
    },
    MultiLineString {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<Vec<i64>>,
    },
    Point {
        #[serde(default)]
        id: Option<GeometryId>,
        coordinates: Vec<f64>,
    },
    MultiPoint {
        #[serde(default)]
        id: Option<GeometryId>,
        coordinates: Vec<Vec<f64>>,
    },
}

/// A collection member: `{"type": null}` is a valid placeholder with no
/// geometry.
#[derive(Deserialize)]
#[serde(untagged)]
enum Member {
    Null(NullGeometry),
    Geometry(TopoGeometry),
}

#[derive(Deserialize)]
struct NullGeometry {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    kind: (),
}

// Null members reference no arcs, so dropping them changes no mesh result.
fn collection_members<'de, D>(deserializer: D) -> Result<Vec<TopoGeometry>, D::Error>
where
    D: Deserializer<'de>,
{
    let members = Vec::<Member>::deserialize(deserializer)?;
    Ok(members
        .into_iter()
        .filter_map(|member| match member {
            Member::Null(_) => None,
            Member::Geometry(geometry) => Some(geometry),
        })
        .collect())
}

impl TopoGeometry {
    /// Every arc reference made by this geometry, in document order.
    fn arc_refs(&self) -> Vec<i64> {
        match self {
            TopoGeometry::Polygon { arcs, .. } | TopoGeometry::MultiLineString { arcs, .. } => {
                arcs.iter().flatten().copied().collect()
            }
            TopoGeometry::MultiPolygon { arcs, .. } => {
                arcs.iter().flatten().flatten().copied().collect()
            }
            TopoGeometry::LineString { arcs, .. } => arcs.clone(),
            TopoGeometry::GeometryCollection { geometries } => {
                geometries.iter().flat_map(|g| g.arc_refs()).collect()
            }
            TopoGeometry::Point { .. } | TopoGeometry::MultiPoint { .. } => Vec::new(),
        }
    }
}

/// Decoded arcs in absolute map coordinates.
#[derive(Debug, Clone)]
pub struct ArcTable {
    arcs: Vec<Vec<Coord<f64>>>,
}

impl TopologyDocument {
    pub fn decode_arcs(&self) -> Result<ArcTable, TopologyError> {
        let mut arcs = Vec::with_capacity(self.arcs.len());
        for (arc_idx, positions) in self.arcs.iter().enumerate() {
            let mut decoded = Vec::with_capacity(positions.len());
            // Quantized arcs are delta-encoded from the previous position.
            let (mut x, mut y) = (0.0, 0.0);
            for (pos_idx, position) in positions.iter().enumerate() {
                let (px, py) = match position.as_slice() {
                    [px, py, ..] => (*px, *py),
                    _ => {
                        return Err(TopologyError::Position {
                            arc: arc_idx,
                            position: pos_idx,
                        })
                    }
                };
                let coord = match &self.transform {
                    Some(t) => {
                        x += px;
                        y += py;
                        Coord {
                            x: x * t.scale[0] + t.translate[0],
                            y: y * t.scale[1] + t.translate[1],
                        }
                    }
                    None => Coord { x: px, y: py },
                };
                decoded.push(coord);
            }
            arcs.push(decoded);
        }
        Ok(ArcTable { arcs })
    }
}

impl ArcTable {
    fn arc(&self, reference: i64) -> Result<&[Coord<f64>], TopologyError> {
        // Negative references name arc !i traversed backwards.
        let index = if reference < 0 { !reference } else { reference };
        let arc = usize::try_from(index)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or(TopologyError::ArcIndex(reference))?;
        if arc.is_empty() {
            return Err(TopologyError::EmptyArc(index as usize));
        }
        Ok(arc.as_slice())
    }

    fn arc_ends(&self, reference: i64) -> Result<(Coord<f64>, Coord<f64>), TopologyError> {
        let arc = self.arc(reference)?;
        let (first, last) = (arc[0], arc[arc.len() - 1]);
        Ok(if reference < 0 { (last, first) } else { (first, last) })
    }

    /// Concatenate referenced arcs, emitting each joint point once.
    fn join(&self, refs: &[i64]) -> Result<Vec<Coord<f64>>, TopologyError> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &reference in refs {
            let arc = self.arc(reference)?;
            if !points.is_empty() {
                points.pop();
            }
            if reference < 0 {
                points.extend(arc.iter().rev().copied());
            } else {
                points.extend(arc.iter().copied());
            }
        }
        Ok(points)
    }

    /// A ring needs four positions to enclose an area. A degenerate exterior
    /// drops the whole polygon; degenerate holes are dropped on their own.
    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Option<Polygon<f64>>, TopologyError> {
        let Some((exterior, holes)) = rings.split_first() else {
            return Ok(None);
        };
        let exterior = self.join(exterior)?;
        let mut interiors = Vec::with_capacity(holes.len());
        for hole in holes {
            let points = self.join(hole)?;
            if points.len() >= 4 {
                interiors.push(LineString::from(points));
            }
        }
        if exterior.len() < 4 {
            return Ok(None);
        }
        Ok(Some(Polygon::new(LineString::from(exterior), interiors)))
    }

    /// Convert areal members of `object` into id-tagged county shapes.
    pub fn features(&self, object: &TopoGeometry) -> Result<Vec<CountyShape>, TopologyError> {
        let mut shapes = Vec::new();
        self.collect_features(object, &mut shapes)?;
        Ok(shapes)
    }

    fn collect_features(
        &self,
        object: &TopoGeometry,
        out: &mut Vec<CountyShape>,
    ) -> Result<(), TopologyError> {
        let (id, polygons) = match object {
            TopoGeometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    self.collect_features(geometry, out)?;
                }
                return Ok(());
            }
            TopoGeometry::Polygon { id, arcs } => {
                (id, self.polygon(arcs)?.into_iter().collect::<Vec<_>>())
            }
            TopoGeometry::MultiPolygon { id, arcs } => {
                let mut polygons = Vec::with_capacity(arcs.len());
                for rings in arcs {
                    polygons.extend(self.polygon(rings)?);
                }
                (id, polygons)
            }
            _ => return Ok(()),
        };

        out.push(CountyShape {
            fips: id.as_ref().and_then(GeometryId::fips),
            label: id.as_ref().map(GeometryId::label).unwrap_or_default(),
            geometry: MultiPolygon::new(polygons),
        });
        Ok(())
    }

    /// Lines made of the arcs of `object` accepted by `filter`.
    ///
    /// `filter` receives the ordinal of the first and the last leaf geometry
    /// referencing an arc; an arc used by a single geometry gets the same
    /// ordinal twice.
    pub fn mesh<F>(&self, object: &TopoGeometry, filter: F) -> Result<MultiLineString<f64>, TopologyError>
    where
        F: Fn(usize, usize) -> bool,
    {
        let mut uses: Vec<Option<ArcUse>> = vec![None; self.arcs.len()];
        let mut next_geometry = 0;
        record_arc_uses(object, &mut next_geometry, &mut uses)?;

        let selected: Vec<i64> = uses
            .iter()
            .flatten()
            .filter(|u| filter(u.first, u.last))
            .map(|u| u.reference)
            .collect();

        let mut stitcher = Stitcher::default();
        for reference in selected {
            let (start, end) = self.arc_ends(reference)?;
            stitcher.push(reference, point_key(start), point_key(end));
        }

        let mut lines = Vec::new();
        for fragment in stitcher.into_fragments() {
            lines.push(LineString::from(self.join(&fragment)?));
        }
        Ok(MultiLineString::new(lines))
    }
}

#[derive(Debug, Clone, Copy)]
struct ArcUse {
    reference: i64,
    first: usize,
    last: usize,
}

fn record_arc_uses(
    object: &TopoGeometry,
    next_geometry: &mut usize,
    uses: &mut [Option<ArcUse>],
) -> Result<(), TopologyError> {
    if let TopoGeometry::GeometryCollection { geometries } = object {
        for geometry in geometries {
            record_arc_uses(geometry, next_geometry, uses)?;
        }
        return Ok(());
    }

    let geometry = *next_geometry;
    *next_geometry += 1;
    for reference in object.arc_refs() {
        let index = if reference < 0 { !reference } else { reference };
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| uses.get_mut(i))
            .ok_or(TopologyError::ArcIndex(reference))?;
        if let Some(arc_use) = slot.as_mut() {
            arc_use.last = geometry;
        } else {
            *slot = Some(ArcUse {
                reference,
                first: geometry,
                last: geometry,
            });
        }
    }
    Ok(())
}

type PointKey = (u64, u64);

fn point_key(c: Coord<f64>) -> PointKey {
    (c.x.to_bits(), c.y.to_bits())
}

#[derive(Debug)]
struct Fragment {
    arcs: Vec<i64>,
    start: PointKey,
    end: PointKey,
}

/// Joins arcs end-to-start into maximal continuous runs.
#[derive(Debug, Default)]
struct Stitcher {
    fragments: BTreeMap<usize, Fragment>,
    by_start: HashMap<PointKey, usize>,
    by_end: HashMap<PointKey, usize>,
    next_id: usize,
}

impl Stitcher {
    fn push(&mut self, reference: i64, start: PointKey, end: PointKey) {
        if let Some((id, mut f)) = self.take_ending_at(start) {
            f.arcs.push(reference);
            f.end = end;
            if let Some((_, g)) = self.take_starting_at(end) {
                f.arcs.extend(g.arcs);
                f.end = g.end;
            }
            self.insert(id, f);
        } else if let Some((id, mut f)) = self.take_starting_at(end) {
            f.arcs.insert(0, reference);
            f.start = start;
            if let Some((gid, mut g)) = self.take_ending_at(start) {
                g.arcs.extend(f.arcs);
                g.end = f.end;
                self.insert(gid, g);
            } else {
                self.insert(id, f);
            }
        } else {
            let id = self.next_id;
            self.next_id += 1;
            self.insert(
                id,
                Fragment {
                    arcs: vec![reference],
                    start,
                    end,
                },
            );
        }
    }

    fn take_ending_at(&mut self, key: PointKey) -> Option<(usize, Fragment)> {
        let id = self.by_end.remove(&key)?;
        let fragment = self.fragments.remove(&id)?;
        if self.by_start.get(&fragment.start) == Some(&id) {
            self.by_start.remove(&fragment.start);
        }
        Some((id, fragment))
    }

    fn take_starting_at(&mut self, key: PointKey) -> Option<(usize, Fragment)> {
        let id = self.by_start.remove(&key)?;
        let fragment = self.fragments.remove(&id)?;
        if self.by_end.get(&fragment.end) == Some(&id) {
            self.by_end.remove(&fragment.end);
        }
        Some((id, fragment))
    }

    fn insert(&mut self, id: usize, fragment: Fragment) {
        self.by_start.insert(fragment.start, id);
        self.by_end.insert(fragment.end, id);
        self.fragments.insert(id, fragment);
    }

    fn into_fragments(self) -> Vec<Vec<i64>> {
        self.fragments.into_values().map(|f| f.arcs).collect()
    }
}

/// Id-tagged county boundaries from the `counties` object.
pub fn project_counties(topology: &TopologyDocument) -> Result<Vec<CountyShape>, TopologyError> {
    topology.decode_arcs()?.features(&topology.objects.counties)
}

/// Borders between two different states. Coastlines and other edges that
/// belong to a single state are excluded.
pub fn state_borders(topology: &TopologyDocument) -> Result<MultiLineString<f64>, TopologyError> {
    topology
        .decode_arcs()?
        .mesh(&topology.objects.states, |a, b| a != b)
}

/// SVG path data for geometry already in output coordinates.
pub trait PathData {
    fn path_data(&self) -> String;
}

impl PathData for MultiPolygon<f64> {
    fn path_data(&self) -> String {
        let mut d = String::new();
        for polygon in self {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                // The closing point is implied by Z.
                let coords = &ring.0[..ring.0.len().saturating_sub(1)];
                write_run(&mut d, coords);
                if !coords.is_empty() {
                    d.push('Z');
                }
            }
        }
        d
    }
}

impl PathData for MultiLineString<f64> {
    fn path_data(&self) -> String {
        let mut d = String::new();
        for line in self {
            write_run(&mut d, &line.0);
        }
        d
    }
}

fn write_run(d: &mut String, coords: &[Coord<f64>]) {
    for (i, c) in coords.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{cmd}{},{}", fmt_number(c.x), fmt_number(c.y));
    }
}

/// Three decimals, trailing zeros trimmed.
pub fn fmt_number(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
