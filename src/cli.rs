use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use lensgraph::dataset::load_graph;
use lensgraph::{
    Controller, GeneratorOptions, Graph, OptimizerConfig, Point, Session, StartLayout,
    StructuralTarget, generate_graph, logging,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "lensgraph",
    about = "Apply a structure-aware fisheye lens to a graph layout."
)]
pub struct LayoutArgs {
    /// Path to a JSON graph ({"nodes": [[x, y], ...], "edges": [[a, b], ...]}). Use '-' for stdin.
    #[arg(short = 'i', long = "input", conflicts_with_all = ["nodes", "edges"])]
    input: Option<String>,

    /// Node list of a text dataset ('id x y' per line).
    #[arg(long = "nodes", requires = "edges")]
    nodes: Option<PathBuf>,

    /// Edge list of a text dataset ('from to' per line).
    #[arg(long = "edges", requires = "nodes")]
    edges: Option<PathBuf>,

    /// Path to the output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Focal point of the lens as 'x,y'.
    #[arg(long = "focal", value_parser = parse_point, allow_hyphen_values = true)]
    focal: Point,

    /// Lens radius.
    #[arg(short = 'r', long = "radius")]
    radius: f64,

    /// Magnification factor (overrides the config file).
    #[arg(short = 'm', long = "magnification")]
    magnification: Option<f64>,

    /// Maximum optimizer steps; stops earlier once every node has settled.
    #[arg(long = "steps", default_value_t = 100)]
    steps: usize,

    /// Reference angles for the structural loss.
    #[arg(long = "target")]
    target: Option<StructuralTarget>,

    /// Layout the optimizer starts from.
    #[arg(long = "start")]
    start: Option<StartLayout>,

    /// Enable the edge-crossing term.
    #[arg(long = "crossings", action = ArgAction::SetTrue)]
    crossings: bool,

    /// Disable the node-overlap term.
    #[arg(long = "no-overlap", action = ArgAction::SetTrue)]
    no_overlap: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(name = "lensgraph generate", about = "Generate a random clustered graph as JSON.")]
pub struct GenerateArgs {
    /// Number of nodes to generate.
    #[arg(short = 'n', long = "nodes", default_value_t = 500)]
    nodes: usize,

    /// Number of clusters.
    #[arg(short = 'k', long = "clusters", default_value_t = 4)]
    clusters: usize,

    /// Spread of each cluster.
    #[arg(long = "window", default_value_t = 500.0)]
    window: f64,

    /// Candidate neighbours sampled per node when picking its edge.
    #[arg(long = "candidates", default_value_t = 30)]
    candidates: usize,

    /// Seed for reproducible output.
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Path to the output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Log progress to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "lensgraph serve",
    about = "Serve optimizer commands over stdin/stdout."
)]
pub struct ServeArgs {
    /// Start from this JSON graph instead of generating one.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Node count of the initial generated graph.
    #[arg(short = 'n', long = "nodes", default_value_t = 500)]
    nodes: usize,

    /// Cluster count of the initial generated graph.
    #[arg(short = 'k', long = "clusters", default_value_t = 4)]
    clusters: usize,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, clap::Args)]
struct CommonArgs {
    /// JSON file with optimizer settings.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Seed for probe directions and graph generation.
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Suppress informational output and log only errors.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,

    /// Log progress to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

impl CommonArgs {
    fn optimizer_config(&self) -> Result<OptimizerConfig> {
        let mut config = match &self.config {
            Some(path) => OptimizerConfig::from_path(path)?,
            None => OptimizerConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let sub_args = || std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned());
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => run_serve(ServeArgs::parse_from(sub_args())),
        Some("generate") => run_generate(GenerateArgs::parse_from(sub_args())),
        Some("layout") => run_layout(LayoutArgs::parse_from(sub_args())),
        _ => run_layout(LayoutArgs::parse_from(args.iter().cloned())),
    }
}

fn run_serve(cli: ServeArgs) -> Result<()> {
    logging::init(cli.common.verbose, cli.common.quiet);
    let config = cli.common.optimizer_config()?;

    let mut controller = match &cli.input {
        Some(path) => {
            let graph = read_graph_json(&load_definition(&InputSource::File(path.clone()))?)?;
            Controller::with_graph(graph, config)
        }
        None => {
            let generator = GeneratorOptions {
                node_count: cli.nodes,
                cluster_count: cli.clusters,
                seed: cli.common.seed,
                ..GeneratorOptions::default()
            };
            Controller::new(config, generator)?
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    controller.serve(stdin.lock(), stdout.lock())
}

fn run_generate(cli: GenerateArgs) -> Result<()> {
    logging::init(cli.verbose, cli.quiet);
    let options = GeneratorOptions {
        node_count: cli.nodes,
        cluster_count: cli.clusters,
        window: cli.window,
        candidates: cli.candidates,
        seed: cli.seed,
        ..GeneratorOptions::default()
    };
    let graph = generate_graph(&options)?;
    let json = serde_json::to_string_pretty(&graph)?;

    let dest = parse_output(cli.output.as_deref())?;
    write_output(dest, json.as_bytes(), cli.quiet, "Generated graph")
}

fn run_layout(cli: LayoutArgs) -> Result<()> {
    logging::init(cli.common.verbose, cli.common.quiet);

    let mut graph = match (&cli.nodes, &cli.edges) {
        (Some(nodes), Some(edges)) => load_graph(nodes, edges)?,
        _ => {
            let source = parse_input(cli.input.as_deref())?;
            read_graph_json(&load_definition(&source)?)?
        }
    };

    let mut config = cli.common.optimizer_config()?;
    if let Some(magnification) = cli.magnification {
        config.magnification = magnification;
    }
    if let Some(target) = cli.target {
        config.target = target;
    }
    if let Some(start) = cli.start {
        config.start = start;
    }
    if cli.crossings {
        config.crossing_enabled = true;
    }
    if cli.no_overlap {
        config.overlap_enabled = false;
    }

    let mut session = Session::new(&graph, cli.focal, cli.radius, config)?;
    let taken = session.run(cli.steps);
    session.write_positions(&mut graph);

    if !cli.common.quiet {
        eprintln!(
            "Ran {taken} step(s); converged: {}; total loss: {:.3}",
            session.is_converged(),
            session.total_loss()
        );
    }

    let json = serde_json::to_string_pretty(&graph)?;
    let dest = parse_output(cli.output.as_deref())?;
    write_output(dest, json.as_bytes(), cli.common.quiet, "Optimized layout")
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected 'x,y', got '{raw}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{v}' is not a number"))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") | None => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
    }
}

fn parse_output(output: Option<&str>) -> Result<OutputDestination> {
    match output {
        Some("-") | None => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
    }
}

fn load_definition(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            if buffer.trim().is_empty() {
                Err(anyhow!("no graph supplied on stdin"))
            } else {
                Ok(buffer)
            }
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if contents.trim().is_empty() {
                Err(anyhow!("input file '{}' was empty", path.display()))
            } else {
                Ok(contents)
            }
        }
    }
}

fn read_graph_json(contents: &str) -> Result<Graph> {
    let graph: Graph = serde_json::from_str(contents).context("failed to parse graph JSON")?;
    if graph.nodes.is_empty() {
        bail!("graph does not declare any nodes");
    }
    graph.validate()?;
    Ok(graph)
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool, what: &str) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("{what} -> {}", path.display());
            }
        }
    }
    Ok(())
}
