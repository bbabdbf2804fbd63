use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const PAIR_GRAPH: &str = r#"{"nodes": [[0, 0], [100, 0]], "edges": [[0, 1]]}"#;

#[test]
fn generate_is_reproducible_with_a_seed() -> Result<(), Box<dyn std::error::Error>> {
    let run = || -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("lensgraph")?
            .args(["generate", "--nodes", "20", "--clusters", "2", "--seed", "7"])
            .output()?;
        assert!(output.status.success());
        Ok(output.stdout)
    };

    let first = run()?;
    assert_eq!(first, run()?);

    let graph: Value = serde_json::from_slice(&first)?;
    let nodes = graph["nodes"].as_array().map_or(0, Vec::len);
    assert!((18..=20).contains(&nodes), "unexpected node count {nodes}");
    assert_eq!(graph["nodeclusters"].as_array().map(Vec::len), Some(nodes));
    assert!(graph["edges"].is_array());
    Ok(())
}

#[test]
fn generate_writes_to_output_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let output_path = tmp.path().join("graph.json");

    Command::cargo_bin("lensgraph")?
        .args(["generate", "--nodes", "10", "--seed", "1", "--output"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated graph"));

    let graph: Value = serde_json::from_str(&fs::read_to_string(&output_path)?)?;
    let nodes = graph["nodes"].as_array().map_or(0, Vec::len);
    assert!((6..=10).contains(&nodes), "unexpected node count {nodes}");
    Ok(())
}

#[test]
fn serve_answers_each_valid_command() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("lensgraph")?
        .args(["serve", "--nodes", "30", "--seed", "1"])
        .write_stdin("fishdown 450,450,200,4\nbogus\nup\ngenerate 12,2\n")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let tags: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(tag, _)| tag))
        .collect();
    assert_eq!(tags, ["create", "fupdate", "fupdate", "create"]);

    let payloads = stdout
        .lines()
        .map(|line| serde_json::from_str(line.split_once(' ').map_or("", |(_, json)| json)))
        .collect::<Result<Vec<Value>, _>>()?;

    let created = payloads[0]["nodes"].as_array().map_or(0, Vec::len);
    assert!(created > 0);
    assert_eq!(payloads[1]["nodes"].as_array().map(Vec::len), Some(created));
    assert!(payloads[1].get("edges").is_none());
    assert_eq!(payloads[2]["nodes"], payloads[0]["nodes"]);

    let regenerated = payloads[3]["nodes"].as_array().map_or(0, Vec::len);
    assert!((10..=12).contains(&regenerated), "unexpected node count {regenerated}");
    Ok(())
}

#[test]
fn layout_writes_optimized_graph() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let input_path = tmp.path().join("pair.json");
    let output_path = tmp.path().join("out.json");
    fs::write(&input_path, PAIR_GRAPH)?;

    Command::cargo_bin("lensgraph")?
        .arg("layout")
        .arg("--input")
        .arg(&input_path)
        .args(["--focal", "0,0", "--radius", "200", "--seed", "3", "--steps", "500"])
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Optimized layout"))
        .stderr(predicate::str::contains("Ran "));

    let graph: Value = serde_json::from_str(&fs::read_to_string(&output_path)?)?;
    let nodes = graph["nodes"].as_array().ok_or("nodes missing")?;
    assert_eq!(nodes.len(), 2);
    assert_eq!(graph["edges"], serde_json::json!([[0, 1]]));
    Ok(())
}

#[test]
fn layout_is_the_default_command() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("lensgraph")?
        .args(["--focal", "0,0", "--radius", "200", "--seed", "3", "-q"])
        .write_stdin(PAIR_GRAPH)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodes\""));
    Ok(())
}

#[test]
fn layout_rejects_non_positive_radius() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("lensgraph")?
        .args(["layout", "--focal", "0,0", "--radius", "0"])
        .write_stdin(PAIR_GRAPH)
        .assert()
        .failure()
        .stderr(predicate::str::contains("radius"));
    Ok(())
}

#[test]
fn layout_reports_missing_input() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("lensgraph")?
        .args(["layout", "--input", "does-not-exist.json", "--focal", "0,0", "--radius", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn generate_rejects_non_finite_window() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("lensgraph")?
        .args(["generate", "--nodes", "10", "--window", "NaN"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("window"));
    Ok(())
}

#[test]
fn serve_quiet_silences_warnings() -> Result<(), Box<dyn std::error::Error>> {
    let run = |extra: &[&str]| -> Result<String, Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("lensgraph")?
            .args(["serve", "--nodes", "10", "--seed", "1"])
            .args(extra)
            .env_remove("LENSGRAPH_LOG")
            .write_stdin("bogus\n")
            .output()?;
        assert!(output.status.success());
        Ok(String::from_utf8(output.stderr)?)
    };

    assert!(run(&[])?.contains("ignoring command line"));
    assert!(run(&["-q"])?.is_empty());
    Ok(())
}
