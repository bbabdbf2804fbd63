use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::Point;

/// A connection between two node indices. Serialized as `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Edge {
    pub start: usize,
    pub end: usize,
}

impl Edge {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<[usize; 2]> for Edge {
    fn from(value: [usize; 2]) -> Self {
        Edge::new(value[0], value[1])
    }
}

impl From<Edge> for [usize; 2] {
    fn from(value: Edge) -> Self {
        [value.start, value.end]
    }
}

/// Node positions plus edges addressed by position in `edges`.
///
/// A node's identity is its index. Parallel edges are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Point>,
    pub edges: Vec<Edge>,
    /// Cluster label per node, present for generated graphs.
    #[serde(
        default,
        rename = "nodeclusters",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub clusters: Vec<usize>,
}

/// The position-only payload sent after an optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct PositionsPayload<'a> {
    pub nodes: &'a [Point],
}

impl Graph {
    pub fn new(nodes: Vec<Point>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            clusters: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Checks that every edge references an existing node and that every
    /// position is finite.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let node_count = self.nodes.len();
        for (idx, edge) in self.edges.iter().enumerate() {
            for node in [edge.start, edge.end] {
                if node >= node_count {
                    return Err(LayoutError::EdgeOutOfRange {
                        edge: idx,
                        node,
                        node_count,
                    });
                }
            }
        }
        if let Some(node) = self.nodes.iter().position(|p| !p.is_finite()) {
            return Err(LayoutError::NonFinitePosition { node });
        }
        Ok(())
    }

    pub fn positions_payload(&self) -> PositionsPayload<'_> {
        PositionsPayload { nodes: &self.nodes }
    }
}
