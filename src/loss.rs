use crate::config::StructuralTarget;
use crate::focal::FocalRegion;
use crate::geometry::{Point, length, orientation, segment_intersection_params};
use crate::graph::Edge;

/// A loss vector attributed to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeLoss {
    pub node: usize,
    pub loss: Point,
}

/// Per-edge targets for the structural term, fixed for a session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralReference {
    pub orientations: Vec<Point>,
    pub lengths: Vec<f64>,
}

impl StructuralReference {
    /// Orientation comes from `target`'s layout; length always comes from the
    /// fisheye layout so edges can grow towards the lens while keeping shape.
    pub fn new(original: &[Point], fisheye: &[Point], edges: &[Edge], target: StructuralTarget) -> Self {
        let angles_from = match target {
            StructuralTarget::Original => original,
            StructuralTarget::Fisheye => fisheye,
        };
        let orientations = edges
            .iter()
            .map(|e| orientation(angles_from[e.start], angles_from[e.end]))
            .collect();
        let lengths = edges
            .iter()
            .map(|e| length(fisheye[e.start], fisheye[e.end]))
            .collect();
        Self {
            orientations,
            lengths,
        }
    }
}

/// Deviation of every edge's vector from its reference orientation scaled to
/// the fisheye length. Applies to all edges.
///
/// Edges whose reference orientation is degenerate contribute nothing.
pub fn structural_loss(
    left: &[Point],
    right: &[Point],
    edges: &[Edge],
    reference: &StructuralReference,
    weight: f64,
) -> Vec<NodeLoss> {
    edges
        .iter()
        .enumerate()
        .filter(|(idx, _)| reference.orientations[*idx] != Point::ZERO)
        .map(|(idx, edge)| {
            let target = reference.orientations[idx] * reference.lengths[idx];
            NodeLoss {
                node: edge.start,
                loss: (left[idx] - right[idx] - target).squared() * weight,
            }
        })
        .collect()
}

/// Virtual springs between focal nodes closer than `node_radius`, pulling each
/// pair towards `separation` along their connecting line.
///
/// Every overlapping ordered pair `(a, b)` is attached to `a`. Coincident nodes
/// have no connecting line and contribute nothing.
pub fn overlap_loss(
    positions: &[Point],
    region: &FocalRegion,
    node_radius: f64,
    separation: f64,
    weight: f64,
) -> Vec<NodeLoss> {
    let mut out = Vec::new();
    for &a in &region.nodes {
        for &b in &region.nodes {
            if a == b {
                continue;
            }
            let (pa, pb) = (positions[a], positions[b]);
            if length(pa, pb) >= node_radius {
                continue;
            }
            let dir = orientation(pa, pb);
            if dir == Point::ZERO {
                continue;
            }
            out.push(NodeLoss {
                node: a,
                loss: (pa - pb - dir * separation).squared() * weight,
            });
        }
    }
    out
}

/// Whether two segments cross away from their endpoints.
///
/// Both intersection parameters must lie strictly inside
/// `(margin, 1 - margin)`, which keeps edges sharing a vertex from counting.
pub fn edges_cross(a1: Point, a2: Point, b1: Point, b2: Point, margin: f64) -> bool {
    let inside = |p: f64| p > margin && p < 1.0 - margin;
    match segment_intersection_params(a1, a2, b1, b2) {
        Some((t, u)) => inside(t) && inside(u),
        None => false,
    }
}

/// Penalizes shallow crossings between focal edges.
///
/// For every ordered crossing pair `(i, j)`, edge `i` is pulled towards its own
/// orientation rotated by `+angle` and edge `j` towards `-angle`, each scaled
/// to the edge's current length.
pub fn crossing_loss(
    left: &[Point],
    right: &[Point],
    edges: &[Edge],
    region: &FocalRegion,
    margin: f64,
    angle: f64,
    weight: f64,
) -> Vec<NodeLoss> {
    let rotated_deviation = |idx: usize, angle: f64| {
        let vector = left[idx] - right[idx];
        let target = orientation(left[idx], right[idx]).rotated(angle) * vector.norm();
        NodeLoss {
            node: edges[idx].start,
            loss: (vector - target).squared() * weight,
        }
    };

    let mut out = Vec::new();
    for &i in &region.edges {
        for &j in &region.edges {
            if i == j || !edges_cross(left[i], right[i], left[j], right[j], margin) {
                continue;
            }
            out.push(rotated_deviation(i, angle));
            out.push(rotated_deviation(j, -angle));
        }
    }
    out
}

/// Sums attributed losses into one loss vector per node.
pub fn accumulate(node_count: usize, contributions: &[NodeLoss]) -> Vec<Point> {
    let mut totals = vec![Point::ZERO; node_count];
    for c in contributions {
        totals[c.node] = totals[c.node] + c.loss;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn region(nodes: Vec<usize>, edges: Vec<usize>) -> FocalRegion {
        FocalRegion { nodes, edges }
    }

    #[test]
    fn structural_loss_vanishes_on_target() {
        let original = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let fisheye = vec![Point::new(0.0, 0.0), Point::new(150.0, 0.0)];
        let edges = vec![Edge::new(0, 1)];
        let reference = StructuralReference::new(&original, &fisheye, &edges, StructuralTarget::Original);

        // Reference orientation is (-1, 0) with length 150: L - R must be (-150, 0).
        let left = vec![Point::new(10.0, 5.0)];
        let right = vec![Point::new(160.0, 5.0)];
        let losses = structural_loss(&left, &right, &edges, &reference, 1.0);
        assert_eq!(losses, vec![NodeLoss { node: 0, loss: Point::ZERO }]);
    }

    #[test]
    fn structural_loss_is_weighted_and_componentwise() {
        let original = vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)];
        let edges = vec![Edge::new(0, 1)];
        let reference = StructuralReference::new(&original, &original, &edges, StructuralTarget::Original);

        let left = vec![Point::new(3.0, 0.0)];
        let right = vec![Point::new(0.0, 12.0)];
        let losses = structural_loss(&left, &right, &edges, &reference, 2.0);
        // L - R = (3, -12); target = (0, -10).
        assert_abs_diff_eq!(losses[0].loss.x, 18.0);
        assert_abs_diff_eq!(losses[0].loss.y, 8.0);
    }

    #[test]
    fn structural_loss_skips_degenerate_reference() {
        let original = vec![Point::new(5.0, 5.0), Point::new(5.0, 5.0)];
        let edges = vec![Edge::new(0, 1)];
        let reference = StructuralReference::new(&original, &original, &edges, StructuralTarget::Original);
        let losses = structural_loss(&[Point::new(0.0, 0.0)], &[Point::new(40.0, 0.0)], &edges, &reference, 1.0);
        assert!(losses.is_empty());
    }

    #[test]
    fn fisheye_target_uses_fisheye_angles() {
        let original = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let fisheye = vec![Point::new(0.0, 0.0), Point::new(0.0, 20.0)];
        let edges = vec![Edge::new(0, 1)];
        let reference = StructuralReference::new(&original, &fisheye, &edges, StructuralTarget::Fisheye);
        assert_eq!(reference.orientations[0], Point::new(0.0, -1.0));
        assert_eq!(reference.lengths[0], 20.0);
    }

    #[test]
    fn distant_focal_nodes_do_not_overlap() {
        let positions = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 25.0)];
        let losses = overlap_loss(&positions, &region(vec![0, 1, 2], vec![]), 10.0, 30.0, 3.0);
        assert!(losses.is_empty());
    }

    #[test]
    fn overlap_grows_as_nodes_close_in() {
        let focal = region(vec![0, 1], vec![]);
        let mut previous = 0.0;
        for gap in [9.0, 6.0, 3.0, 0.5] {
            let positions = vec![Point::new(gap, 0.0), Point::new(0.0, 0.0)];
            let losses = overlap_loss(&positions, &focal, 10.0, 30.0, 3.0);
            assert_eq!(losses.len(), 2);
            let on_first = losses.iter().find(|l| l.node == 0).unwrap().loss.x;
            assert!(on_first > previous);
            previous = on_first;
        }
    }

    #[test]
    fn overlap_ignores_nodes_outside_region() {
        let positions = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let losses = overlap_loss(&positions, &region(vec![0], vec![]), 10.0, 30.0, 3.0);
        assert!(losses.is_empty());
    }

    #[test]
    fn coincident_nodes_contribute_nothing() {
        let positions = vec![Point::new(4.0, 4.0), Point::new(4.0, 4.0)];
        let losses = overlap_loss(&positions, &region(vec![0, 1], vec![]), 10.0, 30.0, 3.0);
        assert!(losses.is_empty());
    }

    #[test]
    fn shared_vertex_is_not_a_crossing() {
        let a = Point::new(0.0, 0.0);
        assert!(!edges_cross(a, Point::new(10.0, 0.0), a, Point::new(0.0, 10.0), 0.05));
        assert!(edges_cross(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
            0.05
        ));
    }

    #[test]
    fn crossing_pair_penalizes_both_edges() {
        let left = vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)];
        let right = vec![Point::new(10.0, 2.0), Point::new(10.0, 0.0)];
        let edges = vec![Edge::new(0, 1), Edge::new(2, 3)];
        let angle = std::f64::consts::FRAC_PI_4;
        let losses = crossing_loss(&left, &right, &edges, &region(vec![], vec![0, 1]), 0.05, angle, 1.0);

        // (0, 1): edge 0 at +45°, edge 1 at -45°; then (1, 0) the other way round.
        // Edge 0 is (-10, -2), edge 1 is (-10, 10).
        let expected = [
            (0, Point::new(18.862915010152392, 42.05887450304571)),
            (2, Point::new(100.0, 17.157287525380994)),
            (2, Point::new(17.157287525380994, 100.0)),
            (0, Point::new(2.294372515228591, 58.62741699796951)),
        ];
        assert_eq!(losses.len(), expected.len());
        for (got, (node, loss)) in losses.iter().zip(expected) {
            assert_eq!(got.node, node);
            assert_abs_diff_eq!(got.loss.x, loss.x, epsilon = 1e-9);
            assert_abs_diff_eq!(got.loss.y, loss.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn crossing_loss_scales_with_weight() {
        let left = vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)];
        let right = vec![Point::new(10.0, 2.0), Point::new(10.0, 0.0)];
        let edges = vec![Edge::new(0, 1), Edge::new(2, 3)];
        let focal = region(vec![], vec![0, 1]);
        let angle = std::f64::consts::FRAC_PI_4;
        let once = crossing_loss(&left, &right, &edges, &focal, 0.05, angle, 1.0);
        let thrice = crossing_loss(&left, &right, &edges, &focal, 0.05, angle, 3.0);
        for (a, b) in once.iter().zip(&thrice) {
            assert_abs_diff_eq!(b.loss.x, 3.0 * a.loss.x, epsilon = 1e-9);
            assert_abs_diff_eq!(b.loss.y, 3.0 * a.loss.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn non_crossing_edges_have_no_crossing_loss() {
        let left = vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)];
        let right = vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let edges = vec![Edge::new(0, 1), Edge::new(2, 3)];
        let losses = crossing_loss(&left, &right, &edges, &region(vec![], vec![0, 1]), 0.05, 0.78, 1.0);
        assert!(losses.is_empty());
    }

    #[test]
    fn accumulate_sums_per_node() {
        let totals = accumulate(
            3,
            &[
                NodeLoss { node: 2, loss: Point::new(1.0, 2.0) },
                NodeLoss { node: 0, loss: Point::new(0.5, 0.0) },
                NodeLoss { node: 2, loss: Point::new(3.0, 1.0) },
            ],
        );
        assert_eq!(totals, vec![Point::new(0.5, 0.0), Point::ZERO, Point::new(4.0, 3.0)]);
    }
}
