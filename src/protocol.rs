use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::config::{OptimizerConfig, StructuralTarget};
use crate::error::ProtocolError;
use crate::generator::{GeneratorOptions, generate_graph};
use crate::geometry::Point;
use crate::graph::Graph;
use crate::optimizer::Session;

pub const CREATE_TAG: &str = "create";
pub const UPDATE_TAG: &str = "fupdate";

/// Steps run for a `fishdown` request.
pub const FISHEYE_STEPS: usize = 50;
/// Steps run for a `strucdown` request.
pub const STRUCTURAL_STEPS: usize = 100;

const DEFAULT_CLUSTERS: usize = 4;

/// Lens parameters carried by `fishdown` / `strucdown`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensRequest {
    pub focal: Point,
    pub radius: f64,
    pub magnification: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Rebuild the graph: `generate <nodes>[,<clusters>]`.
    Generate { nodes: usize, clusters: usize },
    /// Optimize towards the fisheye angles: `fishdown x,y,radius,magnification`.
    FishDown(LensRequest),
    /// Optimize towards the original angles: `strucdown x,y,radius,magnification`.
    StrucDown(LensRequest),
    /// Restore the positions the graph was generated with.
    Up,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (name, payload) = match line.split_once(' ') {
            Some((name, payload)) => (name, payload.trim()),
            None => (line, ""),
        };

        match name {
            "up" => Ok(Command::Up),
            "generate" => {
                let fields = fields(name, payload)?;
                let nodes = parse_field(name, &fields, 0, "node count")?;
                let clusters = match fields.get(1) {
                    Some(_) => parse_field(name, &fields, 1, "cluster count")?,
                    None => DEFAULT_CLUSTERS,
                };
                Ok(Command::Generate { nodes, clusters })
            }
            "fishdown" => Ok(Command::FishDown(parse_lens(name, payload)?)),
            "strucdown" => Ok(Command::StrucDown(parse_lens(name, payload)?)),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

fn fields<'a>(command: &str, payload: &'a str) -> Result<Vec<&'a str>, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::MissingPayload(command.to_string()));
    }
    Ok(payload.split(',').map(str::trim).collect())
}

fn parse_field<T: std::str::FromStr>(
    command: &str,
    fields: &[&str],
    idx: usize,
    what: &str,
) -> Result<T, ProtocolError> {
    let invalid = |reason: String| ProtocolError::InvalidPayload {
        command: command.to_string(),
        reason,
    };
    let raw = fields
        .get(idx)
        .ok_or_else(|| invalid(format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| invalid(format!("{what} '{raw}' is not a valid number")))
}

fn parse_lens(command: &str, payload: &str) -> Result<LensRequest, ProtocolError> {
    let fields = fields(command, payload)?;
    if fields.len() != 4 {
        return Err(ProtocolError::InvalidPayload {
            command: command.to_string(),
            reason: format!("expected 'x,y,radius,magnification', got {} fields", fields.len()),
        });
    }
    Ok(LensRequest {
        focal: Point::new(
            parse_field(command, &fields, 0, "focal x")?,
            parse_field(command, &fields, 1, "focal y")?,
        ),
        radius: parse_field(command, &fields, 2, "radius")?,
        magnification: parse_field(command, &fields, 3, "magnification")?,
    })
}

/// Which payload a handled command answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// `create` with the full graph.
    Create,
    /// `fupdate` with node positions only.
    Positions,
    /// `fupdate` with the full graph.
    Full,
}

/// Owns the displayed graph and applies commands to it.
#[derive(Debug, Clone)]
pub struct Controller {
    graph: Graph,
    original: Vec<Point>,
    config: OptimizerConfig,
    generator: GeneratorOptions,
    generation: u64,
}

impl Controller {
    /// Starts from a freshly generated graph.
    pub fn new(config: OptimizerConfig, generator: GeneratorOptions) -> Result<Self> {
        let graph = generate_graph(&generator).context("failed to generate initial graph")?;
        let mut controller = Self::with_graph(graph, config);
        controller.generator = generator;
        Ok(controller)
    }

    pub fn with_graph(graph: Graph, config: OptimizerConfig) -> Self {
        Self {
            original: graph.nodes.clone(),
            graph,
            config,
            generator: GeneratorOptions::default(),
            generation: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn apply(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Generate { nodes, clusters } => self.regenerate(nodes, clusters),
            Command::FishDown(lens) => self.optimize(lens, StructuralTarget::Fisheye, FISHEYE_STEPS),
            Command::StrucDown(lens) => {
                self.optimize(lens, StructuralTarget::Original, STRUCTURAL_STEPS)
            }
            Command::Up => {
                self.graph.nodes.clone_from(&self.original);
                Ok(Reply::Full)
            }
        }
    }

    fn regenerate(&mut self, nodes: usize, clusters: usize) -> Result<Reply> {
        self.generation += 1;
        let options = GeneratorOptions {
            node_count: nodes,
            cluster_count: clusters,
            seed: self.generator.seed.map(|s| s.wrapping_add(self.generation)),
            ..self.generator.clone()
        };
        self.graph = generate_graph(&options)?;
        self.original = self.graph.nodes.clone();
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            clusters,
            "generated graph"
        );
        Ok(Reply::Create)
    }

    /// Distorts the current layout, not the generated one, so successive
    /// lenses compound until `up` is sent.
    fn optimize(&mut self, lens: LensRequest, target: StructuralTarget, steps: usize) -> Result<Reply> {
        let config = OptimizerConfig {
            magnification: lens.magnification,
            target,
            ..self.config.clone()
        };
        let mut session = Session::new(&self.graph, lens.focal, lens.radius, config)?;
        let taken = session.run(steps);
        session.write_positions(&mut self.graph);
        info!(
            target = ?target,
            steps = taken,
            converged = session.is_converged(),
            total_loss = session.total_loss(),
            "optimized layout"
        );
        Ok(Reply::Positions)
    }

    pub fn write_reply<W: Write>(&self, reply: Reply, out: &mut W) -> Result<()> {
        match reply {
            Reply::Create => write_message(out, CREATE_TAG, &self.graph),
            Reply::Positions => write_message(out, UPDATE_TAG, &self.graph.positions_payload()),
            Reply::Full => write_message(out, UPDATE_TAG, &self.graph),
        }
    }

    /// Announces the current graph, then serves commands until `input` ends.
    ///
    /// Bad lines and failed commands are logged and skipped; only I/O errors
    /// end the loop.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        self.write_reply(Reply::Create, &mut out)?;

        for line in input.lines() {
            let line = line.context("failed to read command")?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(err) => {
                    warn!(error = %err, "ignoring command line");
                    continue;
                }
            };
            debug!(?command, "received command");
            match self.apply(command) {
                Ok(reply) => self.write_reply(reply, &mut out)?,
                Err(err) => warn!(error = %err, "command failed"),
            }
        }
        Ok(())
    }
}

/// Writes `<tag> <json>\n` and flushes.
pub fn write_message<W: Write, T: Serialize + ?Sized>(out: &mut W, tag: &str, payload: &T) -> Result<()> {
    let json = serde_json::to_string(payload).context("failed to serialize reply")?;
    writeln!(out, "{tag} {json}")?;
    out.flush()?;
    Ok(())
}
