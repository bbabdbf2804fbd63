use anyhow::{Result, bail};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::f64::consts::TAU;

use crate::geometry::{Point, length};
use crate::graph::{Edge, Graph};

/// Axis-aligned region cluster centres are drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 900.0,
            y_min: 0.0,
            y_max: 900.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    /// Requested node count. Rounding across clusters may yield slightly fewer.
    pub node_count: usize,
    pub cluster_count: usize,
    pub bounds: Bounds,
    /// Spread of each cluster; node offsets are normal with sigma `window / 2`.
    pub window: f64,
    /// Candidate neighbours sampled per node when choosing its edge.
    pub candidates: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            node_count: 500,
            cluster_count: 4,
            bounds: Bounds::default(),
            window: 500.0,
            candidates: 30,
            seed: None,
        }
    }
}

/// Random clustered graph with one roughly-nearest-neighbour edge per node.
pub fn generate_graph(options: &GeneratorOptions) -> Result<Graph> {
    if options.node_count == 0 {
        bail!("node count must be at least 1");
    }
    if options.cluster_count == 0 {
        bail!("cluster count must be at least 1");
    }
    if options.candidates == 0 {
        bail!("candidate count must be at least 1");
    }
    if !options.window.is_finite() || options.window <= 0.0 {
        bail!("cluster window must be a finite value > 0 (got {})", options.window);
    }
    let b = options.bounds;
    if !(b.x_max > b.x_min && b.y_max > b.y_min) {
        bail!("generator bounds must be non-empty");
    }

    let mut rng = match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let (nodes, clusters) = cluster_nodes(&mut rng, options);
    let edges = nearest_neighbour_edges(&mut rng, &nodes, options.candidates);

    Ok(Graph {
        nodes,
        edges,
        clusters,
    })
}

fn cluster_nodes(rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> (Vec<Point>, Vec<usize>) {
    let b = options.bounds;
    let weights: Vec<f64> = (0..options.cluster_count)
        .map(|_| 0.1 + rng.r#gen::<f64>())
        .collect();
    let total: f64 = weights.iter().sum();

    let mut nodes = Vec::with_capacity(options.node_count);
    let mut clusters = Vec::with_capacity(options.node_count);
    for (label, weight) in weights.iter().enumerate() {
        let center = Point::new(
            b.x_min + rng.r#gen::<f64>() * (b.x_max - b.x_min),
            b.y_min + rng.r#gen::<f64>() * (b.y_max - b.y_min),
        );
        let count = (weight / total * options.node_count as f64) as usize;
        for _ in 0..count {
            let angle = rng.r#gen::<f64>() * TAU;
            let offset: f64 = rng.sample::<f64, _>(StandardNormal) * (options.window / 2.0);
            let p = center + Point::new(angle.cos(), angle.sin()) * offset;
            nodes.push(Point::new(p.x.trunc(), p.y.trunc()));
            clusters.push(label);
        }
    }
    (nodes, clusters)
}

/// Node `i` connects to the nearest of `candidates` sampled nodes, skipping a
/// candidate whose own edge already points back at `i` when another exists.
fn nearest_neighbour_edges(rng: &mut ChaCha8Rng, nodes: &[Point], candidates: usize) -> Vec<Edge> {
    let n = nodes.len();
    if n < 2 {
        return Vec::new();
    }

    let mut partner: Vec<Option<usize>> = vec![None; n];
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let lower_bias = i as f64 / (n - 1) as f64;
        let mut sampled: Vec<usize> = (0..candidates)
            .map(|_| {
                let pick_lower = i > 0 && (i + 1 == n || rng.r#gen::<f64>() < lower_bias);
                if pick_lower {
                    rng.gen_range(0..i)
                } else {
                    rng.gen_range(i + 1..n)
                }
            })
            .collect();
        sampled.sort_by(|&a, &b| {
            length(nodes[a], nodes[i]).total_cmp(&length(nodes[b], nodes[i]))
        });

        let selected = sampled
            .iter()
            .copied()
            .find(|&c| partner[c] != Some(i))
            .unwrap_or(sampled[0]);

        partner[selected] = Some(i);
        partner[i] = Some(selected);
        edges.push(Edge::new(i, selected));
    }
    edges
}
