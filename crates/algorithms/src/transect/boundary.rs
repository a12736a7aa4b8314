//! Spatially indexed boundary line layer

use crate::geometry::{distance, segment_intersection};
use geo::{Coord, LineString};
use openres_core::vector::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};

/// Distance below which two crossings are considered the same place
pub const TIE_TOLERANCE: f64 = 1e-6;

/// One edge of a boundary polyline, as stored in the R-tree
#[derive(Debug, Clone)]
struct IndexedEdge {
    feature: usize,
    edge: usize,
    a: Coord<f64>,
    b: Coord<f64>,
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.a.x, self.a.y], [self.b.x, self.b.y])
    }
}

/// A crossing between a query segment and the layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub point: Coord<f64>,
    /// Distance from the query start
    pub distance: f64,
    /// Index of the boundary line in input order
    pub feature: usize,
    pub edge: usize,
}

/// A set of boundary polylines (valley walls or channel-belt lines) with an
/// R-tree over their edges.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    lines: Vec<LineString<f64>>,
    tree: RTree<IndexedEdge>,
}

impl BoundaryLayer {
    pub fn new(lines: Vec<LineString<f64>>) -> Self {
        let edges = lines
            .iter()
            .enumerate()
            .flat_map(|(feature, line)| {
                line.0
                    .windows(2)
                    .enumerate()
                    .filter(|(_, w)| w[0] != w[1])
                    .map(move |(edge, w)| IndexedEdge {
                        feature,
                        edge,
                        a: w[0],
                        b: w[1],
                    })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(edges),
            lines,
        }
    }

    /// Build from every line part of a feature collection
    pub fn from_features(collection: &FeatureCollection) -> Self {
        Self::new(collection.line_strings())
    }

    pub fn lines(&self) -> &[LineString<f64>] {
        &self.lines
    }

    pub fn line(&self, feature: usize) -> Option<&LineString<f64>> {
        self.lines.get(feature)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All crossings of the segment `from -> to` with the layer, sorted by
    /// distance from `from`.
    ///
    /// Crossings closer than [`TIE_TOLERANCE`] are ordered by input order
    /// (feature, then edge). A line passing through one of its own vertices
    /// on the query segment is reported once.
    pub fn crossings(&self, from: Coord<f64>, to: Coord<f64>) -> Vec<Crossing> {
        let envelope = AABB::from_corners([from.x, from.y], [to.x, to.y]);
        let query_len = distance(from, to);
        let mut hits: Vec<Crossing> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|e| {
                segment_intersection(from, to, e.a, e.b).map(|hit| Crossing {
                    point: hit.point,
                    distance: hit.t * query_len,
                    feature: e.feature,
                    edge: e.edge,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.feature.cmp(&b.feature))
                .then(a.edge.cmp(&b.edge))
        });
        order_clusters(&mut hits);

        let mut kept: Vec<Crossing> = Vec::with_capacity(hits.len());
        for hit in hits {
            let duplicate = kept.iter().any(|k| {
                k.feature == hit.feature && (k.distance - hit.distance).abs() <= TIE_TOLERANCE
            });
            if !duplicate {
                kept.push(hit);
            }
        }
        kept
    }
}

/// Within runs of near-coincident crossings, restore input order
fn order_clusters(hits: &mut [Crossing]) {
    let mut start = 0;
    while start < hits.len() {
        let mut end = start + 1;
        while end < hits.len() && hits[end].distance - hits[end - 1].distance <= TIE_TOLERANCE {
            end += 1;
        }
        if end - start > 1 {
            hits[start..end].sort_by(|a, b| a.feature.cmp(&b.feature).then(a.edge.cmp(&b.edge)));
        }
        start = end;
    }
}
