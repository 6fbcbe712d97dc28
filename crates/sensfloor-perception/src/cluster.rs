//! Blob clustering: active fields → connected clusters → outline polygons.
//!
//! Stateless, like any per-frame detector: [`find_blobs`] takes the fields
//! that are currently above threshold and returns one [`Blob`] per cluster,
//! in cluster-discovery order.
//!
//! # Algorithm
//!
//! 1. **Connectivity** – take the first unclustered field as a seed and keep
//!    absorbing every unclustered field that shares two vertex indices (a
//!    full triangle edge) with any field already in the cluster.  Sharing a
//!    single vertex does not connect.
//! 2. **Boundary** – count every canonical edge of the cluster's triangles.
//!    Edges seen once are on the boundary, edges seen twice are interior,
//!    and edges seen more often are non-manifold and dropped.
//! 3. **Outline** – start at the smallest boundary edge and repeatedly follow
//!    the first unvisited boundary edge touching the trailing vertex.  The
//!    loop is closed on the starting vertex.  One loop per cluster: edges of
//!    a second boundary (a hole) are left unvisited.

use std::collections::{BTreeMap, VecDeque};

use sensfloor_types::{Blob, FieldRef, FloorError, Triangle};
use tracing::{debug, warn};

/// An undirected mesh edge, stored low index first so both traversal
/// directions compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    low: usize,
    high: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    /// The endpoint opposite `v`, or `None` when `v` is not on this edge.
    pub fn other(&self, v: usize) -> Option<usize> {
        if v == self.low {
            Some(self.high)
        } else if v == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// The three edges of `t`.
pub fn triangle_edges(t: &Triangle) -> [Edge; 3] {
    let [a, b, c] = t.indices();
    [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)]
}

/// A field that is above threshold, together with its triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveField {
    pub field: FieldRef,
    pub triangle: Triangle,
}

// ────────────────────────────────────────────────────────────────────────────
// Phase A: connectivity
// ────────────────────────────────────────────────────────────────────────────

/// Partition `active` into edge-connected clusters.
pub fn cluster_fields(active: Vec<ActiveField>) -> Vec<Vec<ActiveField>> {
    let mut pending: VecDeque<ActiveField> = active.into();
    let mut clusters = Vec::new();

    while let Some(seed) = pending.pop_front() {
        let mut cluster = vec![seed];
        let mut frontier = vec![seed];

        while let Some(current) = frontier.pop() {
            let mut i = 0;
            while i < pending.len() {
                if pending[i].triangle.shared_vertices(&current.triangle) >= 2 {
                    if let Some(joined) = pending.remove(i) {
                        cluster.push(joined);
                        frontier.push(joined);
                    }
                } else {
                    i += 1;
                }
            }
        }

        clusters.push(cluster);
    }

    clusters
}

// ────────────────────────────────────────────────────────────────────────────
// Phase B: boundary extraction
// ────────────────────────────────────────────────────────────────────────────

/// Boundary edges of `cluster`, sorted.  Non-manifold edges are reported
/// through the log and left out.
pub fn boundary_edges(cluster: &[ActiveField]) -> Vec<Edge> {
    let mut counts: BTreeMap<Edge, usize> = BTreeMap::new();
    for f in cluster {
        for e in triangle_edges(&f.triangle) {
            *counts.entry(e).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter_map(|(e, count)| match count {
            1 => Some(e),
            2 => None,
            _ => {
                let fault = FloorError::NonManifoldBoundary {
                    a: e.low,
                    b: e.high,
                    count,
                };
                warn!(error = %fault, "excluding edge from outline");
                None
            }
        })
        .collect()
}

/// Walk `edges` into a single closed loop of vertex indices.
///
/// Returns an empty loop when `edges` is empty.
pub fn trace_outline(mut edges: Vec<Edge>) -> Vec<usize> {
    if edges.is_empty() {
        return Vec::new();
    }
    let first = edges.remove(0);
    let start = first.low;
    let mut indices = vec![first.low, first.high];
    let mut current = first.high;

    while let Some(pos) = edges.iter().position(|e| e.other(current).is_some()) {
        let edge = edges.remove(pos);
        if let Some(next) = edge.other(current) {
            indices.push(next);
            current = next;
        }
    }

    if current != start {
        indices.push(start);
    }
    if !edges.is_empty() {
        debug!(unvisited = edges.len(), "boundary has more than one loop");
    }
    indices
}

/// Cluster `active` and trace one outline per cluster.
pub fn find_blobs(active: Vec<ActiveField>) -> Vec<Blob> {
    cluster_fields(active)
        .into_iter()
        .filter_map(|cluster| {
            let indices = trace_outline(boundary_edges(&cluster));
            if indices.is_empty() {
                warn!(fields = cluster.len(), "cluster without boundary edges");
                return None;
            }
            Some(Blob {
                indices,
                fields: cluster.iter().map(|f| f.field).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensfloor_types::TileId;

    fn field(n: u8, a: usize, b: usize, c: usize) -> ActiveField {
        ActiveField {
            field: FieldRef::new(TileId(0, 0), n),
            triangle: Triangle::new(a, b, c),
        }
    }

    #[test]
    fn edge_is_canonical() {
        assert_eq!(Edge::new(7, 3), Edge::new(3, 7));
        assert_eq!(Edge::new(7, 3).low(), 3);
        assert_eq!(Edge::new(3, 7).other(3), Some(7));
        assert_eq!(Edge::new(3, 7).other(5), None);
    }

    #[test]
    fn single_shared_vertex_does_not_connect() {
        let clusters = cluster_fields(vec![field(0, 0, 1, 2), field(1, 0, 3, 4)]);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn shared_edge_connects() {
        let clusters = cluster_fields(vec![field(0, 0, 1, 2), field(1, 0, 2, 3)]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
    }

    #[test]
    fn connectivity_is_transitive_and_order_independent() {
        // a-b share an edge, b-c share an edge, a-c only a vertex; d is apart.
        let a = field(0, 0, 1, 2);
        let b = field(1, 0, 2, 3);
        let c = field(2, 0, 3, 4);
        let d = field(3, 10, 11, 12);

        for order in [vec![a, b, c, d], vec![c, d, a, b], vec![a, c, d, b]] {
            let clusters = cluster_fields(order);
            let mut sizes: Vec<_> = clusters.iter().map(Vec::len).collect();
            sizes.sort();
            assert_eq!(sizes, vec![1, 3]);
        }
    }

    #[test]
    fn isolated_field_outline_is_its_triangle() {
        let blobs = find_blobs(vec![field(0, 4, 9, 2)]);
        assert_eq!(blobs.len(), 1);
        let blob = &blobs[0];
        assert!(blob.is_closed());
        assert_eq!(blob.indices.len(), 4);
        let mut corners = blob.indices[..3].to_vec();
        corners.sort();
        assert_eq!(corners, vec![2, 4, 9]);
    }

    #[test]
    fn shared_edge_is_interior() {
        let cluster = vec![field(0, 0, 5, 4), field(1, 0, 4, 3)];
        let edges = boundary_edges(&cluster);
        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(&Edge::new(0, 4)));

        assert_eq!(trace_outline(edges), vec![0, 3, 4, 5, 0]);
    }

    #[test]
    fn full_fan_outline_skips_centre() {
        // Eight fields around centre 0 with rim 1..=8.
        let fan: Vec<_> = (0..8)
            .map(|i| field(i as u8, 0, 1 + i, 1 + (i + 1) % 8))
            .collect();
        let blobs = find_blobs(fan);
        assert_eq!(blobs.len(), 1);
        let blob = &blobs[0];
        assert!(blob.is_closed());
        assert_eq!(blob.indices.len(), 9);
        assert!(!blob.indices.contains(&0));
        assert_eq!(blob.fields.len(), 8);
    }

    #[test]
    fn non_manifold_edge_is_excluded() {
        let cluster = vec![field(0, 0, 1, 2), field(1, 0, 1, 3), field(2, 0, 1, 4)];
        let edges = boundary_edges(&cluster);
        assert_eq!(edges.len(), 6);
        assert!(!edges.contains(&Edge::new(0, 1)));
    }

    #[test]
    fn outline_stops_after_one_loop() {
        // Two disjoint triangles' edges: only the first loop is traced.
        let mut edges: Vec<Edge> = triangle_edges(&Triangle::new(0, 1, 2)).to_vec();
        edges.extend(triangle_edges(&Triangle::new(5, 6, 7)));
        edges.sort();
        assert_eq!(trace_outline(edges), vec![0, 1, 2, 0]);
    }

    #[test]
    fn blobs_follow_cluster_discovery_order() {
        let blobs = find_blobs(vec![field(0, 10, 11, 12), field(1, 0, 1, 2)]);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].fields[0].field, 0);
        assert_eq!(blobs[1].fields[0].field, 1);
    }

    #[test]
    fn no_active_fields_no_blobs() {
        assert!(find_blobs(Vec::new()).is_empty());
    }
}
