// Integration tests for the `eprefs` binary.
// Run with: cargo test -p electric-prefs-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SCHEMA: &str = r#"
[[group]]
path = "tool/user"

[[group.pref]]
name = "gridSpacing"
type = "double"
default = 1.0

[[group.pref]]
name = "showGrid"
type = "bool"
default = true

[[group.pref]]
name = "units"
type = "string"
default = "lambda"

[[group]]
path = "technology/mocmos"
tech = true

[[group.pref]]
name = "metalLayers"
type = "int"
default = 6
server = true
"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
        fs::write(dir.path().join("registry.toml"), "").unwrap();
        Self { dir }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn eprefs(&self, store: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_eprefs"))
            .env_remove("EPREFS_SCHEMA")
            .env_remove("EPREFS_STORE")
            .arg("--schema")
            .arg(self.path("schema.toml"))
            .arg("--config")
            .arg(self.path("registry.toml"))
            .arg("--store")
            .arg(store)
            .args(args)
            .output()
            .expect("run eprefs")
    }

    fn run(&self, args: &[&str]) -> Output {
        self.eprefs(&self.store(), args)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ---------------------------------------------------------------------------
// get / set / reset
// ---------------------------------------------------------------------------

#[test]
fn get_returns_factory_value_on_empty_store() {
    let fx = Fixture::new();
    let output = fx.run(&["get", "tool/user", "gridSpacing"]);
    assert!(output.status.success(), "exit code was {:?}", output.status);
    assert_eq!(stdout(&output).trim(), "1");
}

#[test]
fn set_persists_across_runs() {
    let fx = Fixture::new();
    let output = fx.run(&["set", "tool/user", "gridSpacing=2.5", "showGrid=false"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(stdout(&fx.run(&["get", "tool/user", "gridSpacing"])).trim(), "2.5");
    assert_eq!(stdout(&fx.run(&["get", "tool/user", "showGrid"])).trim(), "false");

    let on_disk = fs::read_to_string(fx.store().join("tool/user/prefs.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert_eq!(json["gridSpacing"], "2.5");
}

#[test]
fn set_tech_setting() {
    let fx = Fixture::new();
    assert!(fx.run(&["set", "technology/mocmos", "metalLayers=8"]).status.success());
    assert_eq!(stdout(&fx.run(&["get", "technology/mocmos", "metalLayers"])).trim(), "8");
}

#[test]
fn reset_removes_override() {
    let fx = Fixture::new();
    fx.run(&["set", "tool/user", "units=microns"]);
    assert!(fx.run(&["reset", "tool/user", "units"]).status.success());
    assert_eq!(stdout(&fx.run(&["get", "tool/user", "units"])).trim(), "lambda");

    let on_disk = fs::read_to_string(fx.store().join("tool/user/prefs.json")).unwrap();
    assert!(!on_disk.contains("units"));
}

#[test]
fn reset_whole_group() {
    let fx = Fixture::new();
    fx.run(&["set", "tool/user", "units=microns", "gridSpacing=3"]);
    assert!(fx.run(&["reset", "tool/user"]).status.success());
    assert_eq!(stdout(&fx.run(&["changed"])), "");
}

// ---------------------------------------------------------------------------
// list / changed
// ---------------------------------------------------------------------------

#[test]
fn changed_lists_only_overrides() {
    let fx = Fixture::new();
    fx.run(&["set", "tool/user", "gridSpacing=0.5"]);
    let text = stdout(&fx.run(&["changed"]));
    assert_eq!(text, "tool/user/gridSpacing = 0.5 [factory 1]\n");
}

#[test]
fn list_json_includes_every_setting() {
    let fx = Fixture::new();
    let output = fx.run(&["list", "--json"]);
    assert!(output.status.success());
    let entries: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).expect("valid JSON array");
    assert_eq!(entries.len(), 4);
    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"metalLayers"));
    assert!(entries.iter().all(|e| e["is_default"] == true));
}

// ---------------------------------------------------------------------------
// export / import
// ---------------------------------------------------------------------------

#[test]
fn export_then_import_into_another_store() {
    let fx = Fixture::new();
    fx.run(&["set", "tool/user", "gridSpacing=4"]);
    let export = fx.path("export.json");
    assert!(fx.run(&["export", "-o", export.to_str().unwrap()]).status.success());

    let other = fx.path("other-store");
    let output = fx.eprefs(&other, &["import", export.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "Imported 1 node(s)");
    assert_eq!(stdout(&fx.eprefs(&other, &["get", "tool/user", "gridSpacing"])).trim(), "4");
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_setting_exits_3() {
    let fx = Fixture::new();
    let output = fx.run(&["get", "tool/user", "nope"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn bad_value_exits_2_and_writes_nothing() {
    let fx = Fixture::new();
    let output = fx.run(&["set", "tool/user", "gridSpacing=wide"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!fx.store().join("tool/user/prefs.json").exists());
}

#[test]
fn import_of_garbage_exits_4() {
    let fx = Fixture::new();
    let bad = fx.path("bad.json");
    fs::write(&bad, "not json").unwrap();
    let output = fx.run(&["import", bad.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
}
