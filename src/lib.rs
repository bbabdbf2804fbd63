pub mod config;
pub mod dataset;
pub mod error;
pub mod fisheye;
pub mod focal;
pub mod generator;
pub mod geometry;
pub mod graph;
pub mod logging;
pub mod loss;
pub mod optimizer;
pub mod protocol;

pub use config::{OptimizerConfig, StartLayout, StructuralTarget};
pub use error::{ConfigError, LayoutError, ProtocolError};
pub use fisheye::{compute_fisheye_positions, distorted_ratio};
pub use focal::FocalRegion;
pub use generator::{Bounds, GeneratorOptions, generate_graph};
pub use geometry::{Point, edge_endpoint_positions, length, orientation};
pub use graph::{Edge, Graph};
pub use optimizer::{Session, init_optimization};
pub use protocol::{Command, Controller, LensRequest, Reply};
