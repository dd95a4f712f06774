//! Planar graph construction: segment noding and face extraction
//!
//! Every polygon operation of the planar provider goes through the same two
//! steps:
//!
//! 1. **Noding**: all input segments are cut at every mutual intersection
//!    (proper crossings, T-junctions and collinear overlaps) and their end
//!    points are snapped to shared nodes. Candidate pairs come from an R*-tree
//!    over segment envelopes.
//! 2. **Polygonizing**: dangling edges are pruned, the remaining half-edges
//!    are sorted by angle around each node and traced into rings. Rings with
//!    positive signed area are faces; negative rings are component outlines
//!    and become holes of the smallest face that strictly contains them.
//!
//! Because neighboring faces come out of one graph, their shared edges are
//! bit-identical, which keeps later adjacency tests exact.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{
    Area, Contains, Coord, Distance, Euclidean, Length, Line, LineLocatePoint, LineString, Point, Polygon,
};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::collections::{HashMap, VecDeque};

use super::segments::padded_rect;

/// An undirected edge of the noded graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodedEdge {
    pub from: usize,
    pub to: usize,
    /// How many input segments produced this edge
    pub multiplicity: usize,
}

/// Result of noding: snapped nodes plus deduplicated edges
#[derive(Debug, Clone, Default)]
pub struct NodedGraph {
    pub nodes: Vec<Coord<f64>>,
    pub edges: Vec<NodedEdge>,
}

impl NodedGraph {
    /// Keep only the edges matching `keep`
    pub fn retain_edges(&mut self, keep: impl Fn(&NodedEdge) -> bool) {
        self.edges.retain(|e| keep(e));
    }
}

/// Snaps coordinates within `tolerance` of each other onto one node
struct NodeSnapper {
    tolerance: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    nodes: Vec<Coord<f64>>,
}

impl NodeSnapper {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            cells: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    fn cell(&self, c: Coord<f64>) -> (i64, i64) {
        (
            (c.x / self.tolerance).floor() as i64,
            (c.y / self.tolerance).floor() as i64,
        )
    }

    fn node_for(&mut self, c: Coord<f64>) -> usize {
        let (cx, cy) = self.cell(c);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(ids) = self.cells.get(&(cx + dx, cy + dy)) {
                    for &id in ids {
                        let n = self.nodes[id];
                        if (n.x - c.x).abs() <= self.tolerance && (n.y - c.y).abs() <= self.tolerance {
                            return id;
                        }
                    }
                }
            }
        }
        let id = self.nodes.len();
        self.nodes.push(c);
        self.cells.entry((cx, cy)).or_default().push(id);
        id
    }
}

/// Cut segments at all mutual intersections and build a deduplicated graph.
///
/// Segments shorter than `tolerance` are ignored. Edges produced by several
/// input segments (shared polygon boundaries) keep a multiplicity count.
pub fn node_segments(segments: &[Line<f64>], tolerance: f64) -> NodedGraph {
    let segments: Vec<Line<f64>> = segments
        .iter()
        .copied()
        .filter(|s| s.length::<Euclidean>() > tolerance)
        .collect();

    let entries: Vec<GeomWithData<Rectangle<[f64; 2]>, usize>> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let r = padded_rect(s, tolerance);
            GeomWithData::new(
                Rectangle::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]),
                i,
            )
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut cuts: Vec<Vec<Coord<f64>>> = vec![Vec::new(); segments.len()];
    for (i, seg) in segments.iter().enumerate() {
        let r = padded_rect(seg, tolerance);
        let envelope = AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]);
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            let j = candidate.data;
            if j <= i {
                continue;
            }
            let other = &segments[j];
            match line_intersection(*seg, *other) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    cuts[i].push(intersection);
                    cuts[j].push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    for p in [intersection.start, intersection.end] {
                        cuts[i].push(p);
                        cuts[j].push(p);
                    }
                }
                None => {}
            }
            // near misses that the exact predicate does not see
            for p in [other.start, other.end] {
                if Euclidean::distance(p, seg) <= tolerance {
                    cuts[i].push(p);
                }
            }
            for p in [seg.start, seg.end] {
                if Euclidean::distance(p, other) <= tolerance {
                    cuts[j].push(p);
                }
            }
        }
    }

    let mut snapper = NodeSnapper::new(tolerance);
    let mut index: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edges: Vec<NodedEdge> = Vec::new();

    for (seg, seg_cuts) in segments.iter().zip(cuts) {
        let mut stops: Vec<(f64, Coord<f64>)> = seg_cuts
            .into_iter()
            .filter_map(|c| seg.line_locate_point(&Point::from(c)).map(|t| (t, c)))
            .filter(|(t, _)| *t > 0.0 && *t < 1.0)
            .collect();
        stops.push((0.0, seg.start));
        stops.push((1.0, seg.end));
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));

        let ids: Vec<usize> = stops.iter().map(|(_, c)| snapper.node_for(*c)).collect();
        for pair in ids.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            match index.get(&key) {
                Some(&k) => edges[k].multiplicity += 1,
                None => {
                    index.insert(key, edges.len());
                    edges.push(NodedEdge {
                        from: key.0,
                        to: key.1,
                        multiplicity: 1,
                    });
                }
            }
        }
    }

    NodedGraph {
        nodes: snapper.nodes,
        edges,
    }
}

/// Trace the bounded faces of a noded graph.
///
/// Faces narrower than `tolerance` squared in area are discarded as noise.
pub fn polygonize(graph: &NodedGraph, tolerance: f64) -> Vec<Polygon<f64>> {
    let nodes = &graph.nodes;
    let edges = &graph.edges;

    let alive = prune_dangles(nodes.len(), edges);

    // half-edge 2k runs from -> to, 2k + 1 runs to -> from
    let origin = |he: usize| if he % 2 == 0 { edges[he / 2].from } else { edges[he / 2].to };
    let dest = |he: usize| if he % 2 == 0 { edges[he / 2].to } else { edges[he / 2].from };

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (k, _) in edges.iter().enumerate().filter(|(k, _)| alive[*k]) {
        outgoing[edges[k].from].push(2 * k);
        outgoing[edges[k].to].push(2 * k + 1);
    }

    let angle = |he: usize| {
        let a = nodes[origin(he)];
        let b = nodes[dest(he)];
        (b.y - a.y).atan2(b.x - a.x)
    };

    let mut position = vec![0usize; edges.len() * 2];
    for list in outgoing.iter_mut() {
        list.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
        for (p, &he) in list.iter().enumerate() {
            position[he] = p;
        }
    }

    // next half-edge keeps the face on the left: at the far node take the
    // edge immediately clockwise from the way back
    let next = |he: usize| {
        let v = dest(he);
        let list = &outgoing[v];
        let p = position[he ^ 1];
        list[(p + list.len() - 1) % list.len()]
    };

    let mut visited = vec![false; edges.len() * 2];
    let mut shells: Vec<Polygon<f64>> = Vec::new();
    let mut outlines: Vec<LineString<f64>> = Vec::new();
    let min_area = tolerance * tolerance;

    for start in 0..edges.len() * 2 {
        if !alive[start / 2] || visited[start] {
            continue;
        }
        let mut ring: Vec<Coord<f64>> = Vec::new();
        let mut he = start;
        let mut closed = false;
        for _ in 0..=edges.len() * 2 {
            visited[he] = true;
            ring.push(nodes[origin(he)]);
            he = next(he);
            if he == start {
                closed = true;
                break;
            }
        }
        if !closed || ring.len() < 3 {
            continue;
        }
        ring.push(ring[0]);

        let face = Polygon::new(LineString::from(ring), vec![]);
        let signed = face.signed_area();
        if signed > min_area {
            shells.push(face);
        } else if signed < -min_area {
            outlines.push(face.into_inner().0);
        }
    }

    assign_holes(shells, outlines)
}

/// Iteratively drop edges that end in a node of degree one
fn prune_dangles(node_count: usize, edges: &[NodedEdge]) -> Vec<bool> {
    let mut alive = vec![true; edges.len()];
    let mut degree = vec![0usize; node_count];
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (k, e) in edges.iter().enumerate() {
        degree[e.from] += 1;
        degree[e.to] += 1;
        incident[e.from].push(k);
        incident[e.to].push(k);
    }

    let mut queue: VecDeque<usize> = (0..node_count).filter(|&n| degree[n] == 1).collect();
    while let Some(n) = queue.pop_front() {
        if degree[n] != 1 {
            continue;
        }
        let Some(&k) = incident[n].iter().find(|&&k| alive[k]) else {
            continue;
        };
        alive[k] = false;
        let other = if edges[k].from == n { edges[k].to } else { edges[k].from };
        degree[n] -= 1;
        degree[other] -= 1;
        if degree[other] == 1 {
            queue.push_back(other);
        }
    }
    alive
}

/// Attach each component outline to the smallest face that strictly contains it
fn assign_holes(shells: Vec<Polygon<f64>>, outlines: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for outline in outlines {
        let inside = Point::from(outline.0[0]);
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.contains(&inside))
            .min_by(|a, b| a.1.unsigned_area().total_cmp(&b.1.unsigned_area()))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            holes[i].push(outline);
        }
    }

    shells
        .into_iter()
        .zip(holes)
        .map(|(shell, interiors)| Polygon::new(shell.into_inner().0, interiors))
        .collect()
}
