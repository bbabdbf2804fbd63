use thiserror::Error;

/// Rejected optimizer settings. Values are never clamped into range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("magnification must be a finite value >= 0 (got {0})")]
    InvalidMagnification(f64),
    #[error("gradient step must be a finite value > 0 (got {0})")]
    InvalidGradientStep(f64),
    #[error("velocity factor must be a finite value > 0 (got {0})")]
    InvalidVelocityFactor(f64),
    #[error("loss threshold must be a finite value >= 0 (got {0})")]
    InvalidLossThreshold(f64),
    #[error("{name} weight must be a finite value >= 0 (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("node radius must be a finite value > 0 (got {0})")]
    InvalidNodeRadius(f64),
    #[error("minimum gap must be a finite value >= 0 (got {0})")]
    InvalidMinimumGap(f64),
    #[error("crossing margin must lie in [0, 0.5) (got {0})")]
    InvalidCrossingMargin(f64),
    #[error("crossing angle must be a finite number of degrees (got {0})")]
    InvalidCrossingAngle(f64),
}

/// Errors raised while building an optimization session.
///
/// Stepping a session never fails; everything is checked up front.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("edge {edge} references node {node}, but the graph only has {node_count} nodes")]
    EdgeOutOfRange {
        edge: usize,
        node: usize,
        node_count: usize,
    },
    #[error("node {node} has a non-finite position")]
    NonFinitePosition { node: usize },
    #[error("focal point must have finite coordinates")]
    InvalidFocalPoint,
    #[error("fisheye radius must be a finite value > 0 (got {0})")]
    InvalidRadius(f64),
}

/// A command-channel line that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("command '{0}' requires a payload")]
    MissingPayload(String),
    #[error("invalid payload for '{command}': {reason}")]
    InvalidPayload { command: String, reason: String },
}
