use crate::geometry::{Point, length};
use crate::graph::Edge;

/// Nodes and edges currently inside the lens.
///
/// Rebuilt from scratch every step; membership changes continuously while
/// nodes move, so nothing is carried over between steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocalRegion {
    /// Indices of nodes strictly inside the radius, ascending.
    pub nodes: Vec<usize>,
    /// Indices of edges whose both endpoints are focal nodes, ascending.
    pub edges: Vec<usize>,
}

impl FocalRegion {
    pub fn extract(positions: &[Point], edges: &[Edge], focal_point: Point, radius: f64) -> Self {
        let inside: Vec<bool> = positions
            .iter()
            .map(|&p| length(p, focal_point) < radius)
            .collect();

        let nodes = inside
            .iter()
            .enumerate()
            .filter_map(|(idx, &is_inside)| is_inside.then_some(idx))
            .collect();

        let edges = edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| inside[edge.start] && inside[edge.end])
            .map(|(idx, _)| idx)
            .collect();

        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
