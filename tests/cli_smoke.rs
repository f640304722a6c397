/// CLI smoke tests: invoke the compiled binary with the offline hashing
/// embedder, so no network or API key is needed.
use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;

#[allow(deprecated)]
fn scatterlens(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scatterlens").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("SCATTERLENS_CONFIG")
        .env_remove("SCATTERLENS_EMBED_PROVIDER")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    String::from_utf8_lossy(&cmd.assert().success().get_output().stdout).to_string()
}

const RESPONSES: &str = "1\tI love the school. It is great.\tparents\n\
2\tBad traffic at pick-up.\tparents\n\
3\tTeachers are great.\tstaff\n\
4\tMore sport please.\tstudents\n";

// ── Binary runs ──────────────────────────────────────────────────────────

#[test]
fn help_flag_exits_zero() {
    let home = TempDir::new().unwrap();
    scatterlens(&home).arg("--help").assert().success();
}

#[test]
fn version_flag_exits_zero() {
    let home = TempDir::new().unwrap();
    scatterlens(&home).arg("--version").assert().success();
}

#[test]
fn sample_prints_tab_separated_lines() {
    let home = TempDir::new().unwrap();
    let out = stdout_of(scatterlens(&home).arg("sample"));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 102);
    assert!(lines.iter().all(|l| l.split('\t').count() == 3));
}

#[test]
fn config_prints_defaults_as_json() {
    let home = TempDir::new().unwrap();
    let out = stdout_of(scatterlens(&home).arg("config"));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["embedding"]["provider"], "hashing");
    assert_eq!(value["frequency"]["min_display_count"], 5);
}

// ── Analysis ─────────────────────────────────────────────────────────────

#[test]
fn analyze_writes_bundle() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("responses.tsv");
    fs::write(&input, RESPONSES).unwrap();
    let out_dir = home.path().join("bundle");

    let out = stdout_of(scatterlens(&home).arg("analyze").arg(&input).args([
        "--provider",
        "hashing",
        "--min-count",
        "1",
        "--sentiment",
        "--out",
        out_dir.to_str().unwrap(),
    ]));
    assert!(out.contains("Done!"));

    for name in ["rows.json", "frequency.json", "plot.json", "summary.json"] {
        assert!(out_dir.join(name).exists(), "missing {}", name);
    }
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["status"], "complete");

    let freq: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("frequency.json")).unwrap()).unwrap();
    let roots: Vec<&str> = freq["alphabetical"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e[0].as_str().unwrap())
        .collect();
    assert!(roots.contains(&"traffic"));
    assert!(roots.contains(&"teacher"));
}

#[test]
fn analyze_exports_only_selected_rows() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("responses.tsv");
    fs::write(&input, RESPONSES).unwrap();
    let out_dir = home.path().join("bundle");

    stdout_of(scatterlens(&home).arg("analyze").arg(&input).args([
        "--provider",
        "hashing",
        "--select",
        "2-0",
        "--select",
        "4-0",
        "--out",
        out_dir.to_str().unwrap(),
    ]));

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("rows.json")).unwrap()).unwrap();
    let keys: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["2-0", "4-0"]);
}

#[test]
fn analyze_rejects_bad_rectangle() {
    let home = TempDir::new().unwrap();
    scatterlens(&home)
        .args(["analyze", "--provider", "hashing", "--select-rect", "1,2,3"])
        .assert()
        .failure();
}

#[test]
fn analyze_without_input_uses_sample() {
    let home = TempDir::new().unwrap();
    let out = stdout_of(scatterlens(&home).args(["analyze", "--provider", "hashing"]));
    assert!(out.contains("built-in sample"));
    assert!(out.contains("parents, staff, students"));
}

// ── Graceful errors ──────────────────────────────────────────────────────

#[test]
fn analyze_unusable_input_fails() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("bad.tsv");
    fs::write(&input, "no tabs on this line\n").unwrap();
    scatterlens(&home)
        .arg("analyze")
        .arg(&input)
        .args(["--provider", "hashing"])
        .assert()
        .failure();
}

#[test]
fn analyze_missing_file_fails() {
    let home = TempDir::new().unwrap();
    scatterlens(&home)
        .args(["analyze", "/nonexistent/responses.tsv"])
        .assert()
        .failure();
}

#[test]
fn unknown_sort_order_rejected_by_clap() {
    let home = TempDir::new().unwrap();
    scatterlens(&home)
        .args(["analyze", "--sort", "random"])
        .assert()
        .failure();
}
