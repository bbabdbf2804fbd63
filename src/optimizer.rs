use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config::{OptimizerConfig, StartLayout};
use crate::error::LayoutError;
use crate::fisheye::compute_fisheye_positions;
use crate::focal::FocalRegion;
use crate::geometry::{Point, edge_endpoint_positions};
use crate::graph::{Edge, Graph};
use crate::loss::{
    StructuralReference, accumulate, crossing_loss, overlap_loss, structural_loss,
};

/// Velocity caps by absolute loss, checked in order; later (smaller) bounds win.
const VELOCITY_ANNEALING: [(f64, f64); 3] = [(400.0, 0.6), (80.0, 0.4), (40.0, 0.2)];

/// Optimization state for one focal point on one graph.
///
/// Superseded by creating a new session; there is no teardown.
#[derive(Debug, Clone)]
pub struct Session {
    config: OptimizerConfig,
    focal_point: Point,
    radius: f64,
    edges: Vec<Edge>,
    original: Vec<Point>,
    fisheye: Vec<Point>,
    positions: Vec<Point>,
    reference: StructuralReference,
    direction: Vec<Point>,
    velocity: Vec<Point>,
    previous_loss: Vec<Point>,
    focal: FocalRegion,
    iteration: usize,
}

/// Velocity of one axis after its loss moved from `previous` to `loss`.
fn next_velocity(velocity: f64, loss: f64, previous: f64, factor: f64, threshold: f64) -> f64 {
    let mut next = if loss - previous <= 0.0 {
        velocity * factor
    } else {
        1.0
    };
    for (bound, cap) in VELOCITY_ANNEALING {
        if loss < bound {
            next = cap;
        }
    }
    if loss < threshold {
        next = 0.0;
    }
    next
}

/// Builds a session for `graph` around `focal_point`.
pub fn init_optimization(
    graph: &Graph,
    focal_point: Point,
    radius: f64,
    config: OptimizerConfig,
) -> Result<Session, LayoutError> {
    Session::new(graph, focal_point, radius, config)
}

impl Session {
    pub fn new(
        graph: &Graph,
        focal_point: Point,
        radius: f64,
        config: OptimizerConfig,
    ) -> Result<Self, LayoutError> {
        config.validate()?;
        if !focal_point.is_finite() {
            return Err(LayoutError::InvalidFocalPoint);
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(LayoutError::InvalidRadius(radius));
        }
        graph.validate()?;

        let original = graph.nodes.clone();
        let fisheye =
            compute_fisheye_positions(&original, focal_point, radius, config.magnification);
        let reference = StructuralReference::new(&original, &fisheye, &graph.edges, config.target);

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let step = config.gradient_step;
        let mut probe = || if rng.gen_bool(0.5) { step } else { -step };
        let direction = (0..original.len())
            .map(|_| Point::new(probe(), probe()))
            .collect();

        let positions = match config.start {
            StartLayout::Original => original.clone(),
            StartLayout::Fisheye => fisheye.clone(),
        };

        debug!(
            nodes = original.len(),
            edges = graph.edges.len(),
            focal_x = focal_point.x,
            focal_y = focal_point.y,
            radius,
            magnification = config.magnification,
            target = ?config.target,
            start = ?config.start,
            "initialized optimization session"
        );

        let node_count = original.len();
        Ok(Self {
            config,
            focal_point,
            radius,
            edges: graph.edges.clone(),
            original,
            fisheye,
            positions,
            reference,
            direction,
            velocity: vec![Point::new(1.0, 1.0); node_count],
            previous_loss: vec![Point::ZERO; node_count],
            focal: FocalRegion::default(),
            iteration: 0,
        })
    }

    /// Advances every node by one probe step and returns the new positions.
    ///
    /// Each axis keeps its probe sign while its loss falls and flips it
    /// otherwise; velocity accelerates on improvement, resets on regression and
    /// is capped by the absolute loss until the axis freezes.
    pub fn step(&mut self) -> &[Point] {
        let proposed: Vec<Point> = self
            .positions
            .iter()
            .zip(&self.direction)
            .zip(&self.velocity)
            .map(|((pos, dir), vel)| Point::new(pos.x + dir.x * vel.x, pos.y + dir.y * vel.y))
            .collect();

        let new_loss = self.evaluate(&proposed);

        for node in 0..proposed.len() {
            for axis in 0..2 {
                let loss = new_loss[node].axis(axis);
                let previous = self.previous_loss[node].axis(axis);

                let velocity = self.velocity[node].axis_mut(axis);
                *velocity = next_velocity(
                    *velocity,
                    loss,
                    previous,
                    self.config.velocity_factor,
                    self.config.loss_threshold,
                );

                let improved = loss < previous;
                if !improved {
                    let direction = self.direction[node].axis_mut(axis);
                    *direction = -*direction;
                }
            }
        }

        self.previous_loss = new_loss;
        self.positions = proposed;
        self.iteration += 1;

        trace!(
            iteration = self.iteration,
            total_loss = self.total_loss(),
            focal_nodes = self.focal.nodes.len(),
            focal_edges = self.focal.edges.len(),
            frozen_axes = self.frozen_axes(),
            "optimizer step"
        );

        &self.positions
    }

    /// Runs up to `max_steps` steps, stopping early once every axis is frozen.
    /// Returns the number of steps taken.
    pub fn run(&mut self, max_steps: usize) -> usize {
        for taken in 0..max_steps {
            if self.is_converged() {
                debug!(steps = taken, "optimizer converged");
                return taken;
            }
            self.step();
        }
        max_steps
    }

    fn evaluate(&mut self, positions: &[Point]) -> Vec<Point> {
        let (left, right) = edge_endpoint_positions(positions, &self.edges);
        let cfg = &self.config;
        let mut contributions = Vec::new();

        if cfg.structural_enabled {
            contributions.extend(structural_loss(
                &left,
                &right,
                &self.edges,
                &self.reference,
                cfg.structural_weight,
            ));
        }

        if cfg.overlap_enabled || cfg.crossing_enabled {
            self.focal = FocalRegion::extract(positions, &self.edges, self.focal_point, self.radius);
        } else {
            self.focal = FocalRegion::default();
        }

        if cfg.overlap_enabled {
            contributions.extend(overlap_loss(
                positions,
                &self.focal,
                cfg.node_radius,
                cfg.desired_separation(),
                cfg.readability_weight,
            ));
        }

        if cfg.crossing_enabled {
            contributions.extend(crossing_loss(
                &left,
                &right,
                &self.edges,
                &self.focal,
                cfg.crossing_margin,
                cfg.crossing_angle(),
                cfg.crossing_weight,
            ));
        }

        accumulate(positions.len(), &contributions)
    }

    /// True once every node's velocity is zero on both axes.
    pub fn is_converged(&self) -> bool {
        self.frozen_axes() == self.velocity.len() * 2
    }

    fn frozen_axes(&self) -> usize {
        self.velocity
            .iter()
            .map(|v| usize::from(v.x == 0.0) + usize::from(v.y == 0.0))
            .sum()
    }

    /// Copies the current positions into `graph`.
    pub fn write_positions(&self, graph: &mut Graph) {
        graph.nodes.clone_from(&self.positions);
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn original_positions(&self) -> &[Point] {
        &self.original
    }

    pub fn fisheye_positions(&self) -> &[Point] {
        &self.fisheye
    }

    /// Focal subset computed during the last step.
    pub fn focal_region(&self) -> &FocalRegion {
        &self.focal
    }

    /// Per-axis loss recorded at the last step.
    pub fn node_loss(&self) -> &[Point] {
        &self.previous_loss
    }

    pub fn total_loss(&self) -> f64 {
        self.previous_loss.iter().map(|l| l.x + l.y).sum()
    }

    pub fn velocity(&self) -> &[Point] {
        &self.velocity
    }

    pub fn direction(&self) -> &[Point] {
        &self.direction
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn focal_point(&self) -> Point {
        self.focal_point
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}
