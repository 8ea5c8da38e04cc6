use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;

const DIVIDER: &str = r#"{
    "components": [
        {"id": "V1", "type": "vsource", "x": 0, "y": 0, "waveType": "DC", "dc": "5"},
        {"id": "R1", "type": "resistor", "x": 100, "y": 0, "value": "10k"},
        {"id": "G1", "type": "ground", "x": 0, "y": 100}
    ],
    "connections": [
        {"from": "R1.1", "to": "V1.+"},
        {"from": "R1.2", "to": "V1.-"},
        {"from": "V1.-", "to": "G1.GND"}
    ]
}"#;

fn netforge(dir: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("netforge")?;
    cmd.current_dir(dir.path());
    Ok(cmd)
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().clone();
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(cmd: &mut Command) -> String {
    let output = cmd.assert().get_output().clone();
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn netlist_is_written_next_to_input() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("divider.json").write_str(DIVIDER)?;

    netforge(&temp)?
        .args(["netlist", "divider.json"])
        .assert()
        .success();

    let deck = std::fs::read_to_string(temp.child("divider.cir").path())?;
    assert!(deck.starts_with("* NETFORGE_CIRCUIT auto-generated netlist\n"));
    assert!(deck.contains("V1 N1 0 DC 5\nR1 N1 0 10k\n"));
    assert!(deck.contains("  tran 1m 1s\n"));
    assert!(deck.ends_with(".end\n"));
    Ok(())
}

#[test]
fn dash_output_prints_the_deck() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("divider.json").write_str(DIVIDER)?;

    let stdout = stdout_of(netforge(&temp)?.args([
        "netlist",
        "divider.json",
        "-o",
        "-",
        "--title",
        "DIV",
        "--op",
        "--ac",
        "dec",
        "10",
        "1",
        "1meg",
    ]));

    assert!(stdout.contains(".title DIV\n"));
    assert!(stdout.contains("  op\n  print all\n  ac dec 10 1 1meg\n"));
    assert!(!stdout.contains("tran"));
    assert!(!temp.child("divider.cir").path().exists());
    Ok(())
}

#[test]
fn config_file_beside_input_sets_title_and_analyses() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("divider.json").write_str(DIVIDER)?;
    temp.child("netforge.toml").write_str(
        r#"
title = "FROM_CONFIG"

[[analyses]]
type = "op"
"#,
    )?;

    let stdout = stdout_of(netforge(&temp)?.args(["netlist", "divider.json", "-o", "-"]));
    assert!(stdout.contains(".title FROM_CONFIG\n"));
    assert!(stdout.contains("  op\n"));

    let stdout = stdout_of(netforge(&temp)?.args([
        "netlist",
        "divider.json",
        "-o",
        "-",
        "--title",
        "FROM_FLAG",
    ]));
    assert!(stdout.contains(".title FROM_FLAG\n"));
    Ok(())
}

#[test]
fn check_json_lists_terminal_nodes() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("divider.json").write_str(DIVIDER)?;

    let stdout = stdout_of(netforge(&temp)?.args(["check", "divider.json", "--json"]));
    let report: serde_json::Value = serde_json::from_str(&stdout)?;

    let node_of = |terminal: &str| {
        report["nodes"]
            .as_array()
            .and_then(|nodes| nodes.iter().find(|n| n["terminal"] == terminal))
            .map(|n| n["node"].clone())
    };
    assert_eq!(node_of("R1.1"), Some("N1".into()));
    assert_eq!(node_of("R1.2"), Some("0".into()));
    assert_eq!(node_of("G1.GND"), Some("0".into()));
    assert_eq!(report["diagnostics"], serde_json::json!([]));
    Ok(())
}

#[test]
fn dropped_wire_is_a_warning_not_a_failure() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("broken.json")
        .write_str(&DIVIDER.replace("\"R1.1\"", "\"R1.9\""))?;

    let mut cmd = netforge(&temp)?;
    cmd.args(["netlist", "broken.json", "--no-normalize"]);
    cmd.assert().success();
    let stderr = stderr_of(&mut cmd);
    assert!(stderr.contains("Wire w1 dropped: R1.9"));
    assert!(temp.child("broken.cir").path().exists());
    Ok(())
}

#[test]
fn normalized_input_still_reports_dropped_items() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("messy.json").write_str(
        r#"{
            "components": [
                {"id": "R1", "type": "resistor", "x": 0, "y": 0},
                {"id": "R1", "type": "capacitor", "x": 200, "y": 0},
                {"id": "U7", "type": "flux_capacitor", "x": 400, "y": 0}
            ],
            "connections": [
                {"from": "R1.1", "to": "0"},
                {"from": "R1.2", "to": "U7.1"}
            ]
        }"#,
    )?;

    let stdout = stdout_of(netforge(&temp)?.args(["check", "messy.json", "--json"]));
    let report: serde_json::Value = serde_json::from_str(&stdout)?;
    let kinds: Vec<&str> = report["diagnostics"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|d| d["kind"].as_str())
        .collect();
    assert_eq!(
        kinds[..3],
        ["duplicate_component", "unknown_type", "invalid_wire_reference"]
    );

    let mut cmd = netforge(&temp)?;
    cmd.args(["netlist", "messy.json", "-o", "-"]);
    let stderr = stderr_of(&mut cmd);
    assert!(stderr.contains("Component U7 has unknown type 'flux_capacitor' and was dropped"));
    assert!(stderr.contains("Wire w2 dropped: U7.1 names no placed component"));
    Ok(())
}

#[test]
fn normalize_prints_canonical_json() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("generated.json").write_str(
        r#"{
            "components": [
                {"id": "R1", "type": "r", "x": 103, "y": 0}
            ],
            "connections": [{"from": "R1.a", "to": "0"}]
        }"#,
    )?;

    let stdout = stdout_of(netforge(&temp)?.args(["normalize", "generated.json"]));
    let normalized: serde_json::Value = serde_json::from_str(&stdout)?;

    assert_eq!(normalized["components"][0]["id"], "GND1");
    assert_eq!(normalized["components"][1]["type"], "resistor");
    assert_eq!(normalized["components"][1]["x"], 100.0);
    assert_eq!(normalized["connections"][0]["from"], "R1.1");
    assert_eq!(normalized["connections"][0]["to"], "GND1.GND");
    Ok(())
}

#[test]
fn symbols_prints_port_catalog() -> Result<()> {
    let temp = TempDir::new()?;
    let package = temp.child("lib");
    package.create_dir_all()?;
    package.child("fuse.json").write_str(
        r#"{"w": 60, "h": 20, "ports": [{"id": "1", "x": 0, "y": 10}, {"id": "2", "x": 60, "y": 10}]}"#,
    )?;

    let stdout = stdout_of(netforge(&temp)?.args(["symbols", "--symbols", "lib"]));
    let catalog: serde_json::Value = serde_json::from_str(&stdout)?;

    assert_eq!(catalog["npn"], serde_json::json!(["C", "B", "E"]));
    assert_eq!(catalog["fuse"], serde_json::json!(["1", "2"]));
    Ok(())
}

#[test]
fn malformed_json_fails() -> Result<()> {
    let temp = TempDir::new()?;
    temp.child("bad.json").write_str("{\n  \"components\": [,]\n}")?;

    let mut cmd = netforge(&temp)?;
    cmd.args(["netlist", "bad.json"]);
    cmd.assert().failure();
    assert!(stderr_of(&mut cmd).contains("Malformed circuit JSON"));
    assert!(!temp.child("bad.cir").path().exists());
    Ok(())
}
