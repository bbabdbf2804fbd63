use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::geometry::Point;
use crate::graph::{Edge, Graph};

/// Reads a node list (`id x y` or `id label x y`) and an edge list (`from to`).
/// Node ids are remapped to dense indices in file order.
pub fn load_graph(nodes_path: &Path, edges_path: &Path) -> Result<Graph> {
    let nodes_src = fs::read_to_string(nodes_path)
        .with_context(|| format!("failed to read '{}'", nodes_path.display()))?;
    let edges_src = fs::read_to_string(edges_path)
        .with_context(|| format!("failed to read '{}'", edges_path.display()))?;

    let (ids, nodes) = parse_nodes(&nodes_src)
        .with_context(|| format!("invalid node list '{}'", nodes_path.display()))?;
    let edges = parse_edges(&edges_src, &ids)
        .with_context(|| format!("invalid edge list '{}'", edges_path.display()))?;

    let graph = Graph::new(nodes, edges);
    graph.validate()?;
    Ok(graph)
}

pub fn parse_nodes(source: &str) -> Result<(HashMap<String, usize>, Vec<Point>)> {
    let mut ids = HashMap::new();
    let mut nodes = Vec::new();

    for (line_no, line) in numbered_lines(source) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (id, x, y) = match fields.as_slice() {
            [id, x, y] => (*id, *x, *y),
            [id, _, x, y, ..] => (*id, *x, *y),
            _ => bail!("line {line_no}: expected 'id x y' or 'id label x y'"),
        };
        let point = Point::new(parse_coord(x, line_no)?, parse_coord(y, line_no)?);
        if ids.insert(id.to_string(), nodes.len()).is_some() {
            bail!("line {line_no}: duplicate node id '{id}'");
        }
        nodes.push(point);
    }

    Ok((ids, nodes))
}

pub fn parse_edges(source: &str, ids: &HashMap<String, usize>) -> Result<Vec<Edge>> {
    let lookup = |id: &str, line_no: usize| {
        ids.get(id)
            .copied()
            .ok_or_else(|| anyhow!("line {line_no}: unknown node id '{id}'"))
    };

    numbered_lines(source)
        .map(|(line_no, line)| -> Result<Edge> {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(from), Some(to)) => Ok(Edge::new(lookup(from, line_no)?, lookup(to, line_no)?)),
                _ => bail!("line {line_no}: expected 'from to'"),
            }
        })
        .collect()
}

fn numbered_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_coord(raw: &str, line_no: usize) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("line {line_no}: '{raw}' is not a number"))?;
    if !value.is_finite() {
        bail!("line {line_no}: coordinate '{raw}' is not finite");
    }
    Ok(value)
}
