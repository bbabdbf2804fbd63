use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Reference orientation the structural loss pulls edges towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StructuralTarget {
    /// Keep the angles of the original layout.
    #[default]
    Original,
    /// Follow the angles of the fully distorted layout.
    Fisheye,
}

/// Layout a session starts stepping from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StartLayout {
    #[default]
    Original,
    Fisheye,
}

/// Every knob of the optimizer. Passed into [`crate::Session::new`]; there is
/// no global optimizer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub structural_weight: f64,
    pub readability_weight: f64,
    pub crossing_weight: f64,
    /// Magnitude of the per-axis probe direction.
    pub gradient_step: f64,
    /// Velocity multiplier applied while a node keeps improving.
    pub velocity_factor: f64,
    /// Per-axis loss below which a node is frozen.
    pub loss_threshold: f64,
    pub magnification: f64,
    pub structural_enabled: bool,
    pub overlap_enabled: bool,
    pub crossing_enabled: bool,
    pub target: StructuralTarget,
    pub start: StartLayout,
    /// Focal nodes closer than this are overlapping.
    pub node_radius: f64,
    /// Extra clearance on top of two node radii when pushing overlaps apart.
    pub minimum_gap: f64,
    /// Intersection parameters within this distance of an endpoint do not count
    /// as crossings.
    pub crossing_margin: f64,
    pub crossing_angle_degrees: f64,
    /// Seed for the initial probe directions. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            structural_weight: 1.0,
            readability_weight: 3.0,
            crossing_weight: 1.0,
            gradient_step: 2.0,
            velocity_factor: 1.4,
            loss_threshold: 1.0,
            magnification: 4.0,
            structural_enabled: true,
            overlap_enabled: true,
            crossing_enabled: false,
            target: StructuralTarget::Original,
            start: StartLayout::Original,
            node_radius: 10.0,
            minimum_gap: 10.0,
            crossing_margin: 0.05,
            crossing_angle_degrees: 45.0,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    /// Reads a JSON config file. Missing fields take their defaults; unknown
    /// fields are an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config '{}'", path.display()))
    }

    /// Distance two overlapping nodes are pushed towards.
    pub fn desired_separation(&self) -> f64 {
        2.0 * self.node_radius + self.minimum_gap
    }

    pub fn crossing_angle(&self) -> f64 {
        self.crossing_angle_degrees.to_radians()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.magnification.is_finite() || self.magnification < 0.0 {
            return Err(ConfigError::InvalidMagnification(self.magnification));
        }
        if !self.gradient_step.is_finite() || self.gradient_step <= 0.0 {
            return Err(ConfigError::InvalidGradientStep(self.gradient_step));
        }
        if !self.velocity_factor.is_finite() || self.velocity_factor <= 0.0 {
            return Err(ConfigError::InvalidVelocityFactor(self.velocity_factor));
        }
        if !self.loss_threshold.is_finite() || self.loss_threshold < 0.0 {
            return Err(ConfigError::InvalidLossThreshold(self.loss_threshold));
        }
        for (name, value) in [
            ("structural", self.structural_weight),
            ("readability", self.readability_weight),
            ("crossing", self.crossing_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if !self.node_radius.is_finite() || self.node_radius <= 0.0 {
            return Err(ConfigError::InvalidNodeRadius(self.node_radius));
        }
        if !self.minimum_gap.is_finite() || self.minimum_gap < 0.0 {
            return Err(ConfigError::InvalidMinimumGap(self.minimum_gap));
        }
        if !(0.0..0.5).contains(&self.crossing_margin) {
            return Err(ConfigError::InvalidCrossingMargin(self.crossing_margin));
        }
        if !self.crossing_angle_degrees.is_finite() {
            return Err(ConfigError::InvalidCrossingAngle(self.crossing_angle_degrees));
        }
        Ok(())
    }
}
