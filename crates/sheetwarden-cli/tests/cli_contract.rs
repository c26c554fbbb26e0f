// Integration tests for the --json stdout contract and exit codes.
//
// Every --json invocation prints exactly one JSON value on stdout, success
// or failure. Exit code 2 means the formula policy rejected the request.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn sheetwarden() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sheetwarden"));
    cmd.env_remove("RUST_LOG");
    cmd.env("SHEETWARDEN_LOCK_TIMEOUT_MS", "500");
    cmd
}

fn run(args: &[&str]) -> Output {
    sheetwarden()
        .args(args)
        .arg("--json")
        .output()
        .expect("run sheetwarden")
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(
        !trimmed.is_empty(),
        "stdout should not be empty\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(trimmed.lines().count(), 1, "stdout:\n{}", trimmed);
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {}\n{}", e, trimmed))
}

fn success(args: &[&str]) -> Value {
    let output = run(args);
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let val = assert_single_json(&output);
    assert_eq!(val["status"], "success", "{}", val);
    val
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn create(path: &Path, sheets: &str) {
    success(&["create-new", "--output", path_str(path), "--sheets", sheets]);
}

// ===========================================================================
// create-new
// ===========================================================================

#[test]
fn create_new_reports_sheets_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");

    let val = success(&[
        "create-new",
        "--output",
        path_str(&path),
        "--sheets",
        "Inputs, Model ,Outputs",
    ]);
    assert_eq!(val["sheets"], json!(["Inputs", "Model", "Outputs"]));
    assert_eq!(val["sheet_count"], 3);
    assert_eq!(val["warnings"], json!([]));
    assert_eq!(
        val["file_size_bytes"].as_u64().unwrap(),
        std::fs::metadata(&path).unwrap().len()
    );
}

#[test]
fn create_new_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");

    let output = run(&[
        "create-new",
        "--output",
        path_str(&path),
        "--sheets",
        "Q1/Q2,Model",
        "--dry-run",
    ]);
    assert!(output.status.success());
    let val = assert_single_json(&output);
    assert_eq!(val["status"], "dry_run");
    assert_eq!(val["sheets"].as_array().unwrap().len(), 2);
    assert_eq!(val["warnings"].as_array().unwrap().len(), 1);
    assert!(!path.exists());
}

#[test]
fn create_new_duplicate_sheets_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");

    let output = run(&[
        "create-new",
        "--output",
        path_str(&path),
        "--sheets",
        "Model,Model",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let val = assert_single_json(&output);
    assert_eq!(val["status"], "error");
    assert_eq!(val["error_type"], "ValidationError");
    assert!(!path.exists());
}

// ===========================================================================
// set-value / add-formula / add-assumption / info
// ===========================================================================

#[test]
fn edit_then_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Assumptions,Model");
    let file = path_str(&path);

    let val = success(&[
        "set-value", "--file", file, "--sheet", "Model", "--cell", "B1", "--value", "1200",
    ]);
    assert_eq!(val["type"], "integer");
    assert_eq!(val["value"], "1200");
    assert_eq!(val["style"], Value::Null);

    let val = success(&[
        "add-assumption",
        "--file",
        file,
        "--sheet",
        "Assumptions",
        "--cell",
        "B2",
        "--value",
        "0.05",
        "--description",
        "Growth rate",
        "--format",
        "percent",
        "--decimals",
        "1",
    ]);
    assert_eq!(val["value"], json!(0.05));
    assert_eq!(val["style"], "assumption");
    assert_eq!(val["format"], "percent");

    let val = success(&[
        "add-formula",
        "--file",
        file,
        "--sheet",
        "Model",
        "--cell",
        "B2",
        "--formula",
        "B1*(1+Assumptions!B2)",
    ]);
    assert_eq!(val["formula"], "=B1*(1+Assumptions!B2)");
    assert_eq!(val["classification"], "safe");
    assert_eq!(val["referenced_sheets"], json!(["Assumptions"]));

    let val = success(&["info", "--file", file]);
    let sheets = val["sheets"].as_array().unwrap();
    assert_eq!(sheets.len(), 2);
    assert_eq!(sheets[0]["name"], "Assumptions");
    assert_eq!(sheets[0]["notes"], 1);
    assert_eq!(sheets[1]["formulas"], 1);
    assert_eq!(sheets[1]["used_range"], "B1:B2");
}

#[test]
fn set_value_rejects_bad_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Model");

    let output = run(&[
        "set-value",
        "--file",
        path_str(&path),
        "--sheet",
        "Model",
        "--cell",
        "A1",
        "--value",
        "abc",
        "--type",
        "number",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let val = assert_single_json(&output);
    assert_eq!(val["error_type"], "ValidationError");
}

#[test]
fn add_assumption_rejects_out_of_range_decimals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Model");

    let output = run(&[
        "add-assumption",
        "--file",
        path_str(&path),
        "--sheet",
        "Model",
        "--cell",
        "A1",
        "--value",
        "3",
        "--description",
        "Count",
        "--format",
        "number",
        "--decimals",
        "-1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(assert_single_json(&output)["error_type"], "ValidationError");
}

#[test]
fn blocked_function_exits_with_security_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Model");
    let before = std::fs::read(&path).unwrap();

    let output = run(&[
        "add-formula",
        "--file",
        path_str(&path),
        "--sheet",
        "Model",
        "--cell",
        "A1",
        "--formula",
        "=WEBSERVICE(\"http://example.com\")",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let val = assert_single_json(&output);
    assert_eq!(val["status"], "security_error");
    assert_eq!(val["error_type"], "SecurityError");
    assert!(val["hint"].as_str().unwrap().contains("--allow-external"));
    assert_eq!(std::fs::read(&path).unwrap(), before);

    let val = success(&[
        "add-formula",
        "--file",
        path_str(&path),
        "--sheet",
        "Model",
        "--cell",
        "A1",
        "--formula",
        "=WEBSERVICE(\"http://example.com\")",
        "--allow-external",
    ]);
    assert_eq!(val["classification"], "external_reference");
    assert!(!val["overrides"].as_array().unwrap().is_empty());
}

#[test]
fn unknown_sheet_reference_is_rejected_unless_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Model");
    let file = path_str(&path);

    let output = run(&[
        "add-formula", "--file", file, "--sheet", "Model", "--cell", "A1", "--formula",
        "=Missing!A1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(assert_single_json(&output)["error_type"], "InvalidReference");

    success(&[
        "add-formula",
        "--file",
        file,
        "--sheet",
        "Model",
        "--cell",
        "A1",
        "--formula",
        "=Missing!A1",
        "--no-validate-refs",
    ]);
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.xlsx");

    let output = run(&["info", "--file", path_str(&path)]);
    assert_eq!(output.status.code(), Some(1));
    let val = assert_single_json(&output);
    assert_eq!(val["status"], "error");
    assert_eq!(val["error_type"], "NotFoundError");
    assert!(val.get("hint").is_none());
}

// ===========================================================================
// export-sheet / clone-template
// ===========================================================================

#[test]
fn export_sheet_csv_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create(&path, "Model");
    let file = path_str(&path);
    success(&[
        "set-value", "--file", file, "--sheet", "Model", "--cell", "A1", "--value", "Units",
    ]);
    success(&[
        "set-value", "--file", file, "--sheet", "Model", "--cell", "B1", "--value", "40",
    ]);
    success(&[
        "add-formula", "--file", file, "--sheet", "Model", "--cell", "C1", "--formula", "=B1*2",
    ]);

    let csv = dir.path().join("model.csv");
    let val = success(&[
        "export-sheet",
        "--file",
        file,
        "--sheet",
        "Model",
        "--output",
        path_str(&csv),
        "--include-formulas",
    ]);
    assert_eq!(val["format"], "csv");
    assert_eq!(val["rows_exported"], 1);
    assert_eq!(val["range"], "A1:C1");
    assert_eq!(val["included_formulas"], true);
    assert_eq!(std::fs::read_to_string(&csv).unwrap(), "Units,40,=B1*2\n");

    let out = dir.path().join("model.data");
    let val = success(&[
        "export-sheet",
        "--file",
        file,
        "--sheet",
        "Model",
        "--output",
        path_str(&out),
        "--format",
        "json",
        "--range",
        "A1:B1",
    ]);
    assert_eq!(val["format"], "json");
    let exported: Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(exported, json!([["Units", 40.0]]));

    let output = run(&[
        "export-sheet",
        "--file",
        file,
        "--sheet",
        "Model",
        "--output",
        path_str(&dir.path().join("model.txt")),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(assert_single_json(&output)["error_type"], "ValidationError");
}

#[test]
fn clone_template_methods() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("template.xlsx");
    create(&source, "Inputs");
    success(&[
        "set-value",
        "--file",
        path_str(&source),
        "--sheet",
        "Inputs",
        "--cell",
        "A1",
        "--value",
        "7",
        "--style",
        "input",
    ]);

    let copy = dir.path().join("copy.xlsx");
    let val = success(&[
        "clone-template",
        "--source",
        path_str(&source),
        "--output",
        path_str(&copy),
        "--preserve-values",
        "--preserve-formulas",
    ]);
    assert_eq!(val["method"], "full_copy");
    assert_eq!(std::fs::read(&copy).unwrap(), std::fs::read(&source).unwrap());

    let blank = dir.path().join("blank.xlsx");
    let val = success(&[
        "clone-template",
        "--source",
        path_str(&source),
        "--output",
        path_str(&blank),
    ]);
    assert_eq!(val["method"], "selective_copy");
    assert_eq!(val["sheets"], json!(["Inputs"]));
    assert_eq!(
        val["preserved"],
        json!({"values": false, "formulas": false, "formatting": true})
    );

    let info = success(&["info", "--file", path_str(&blank)]);
    assert_eq!(info["sheets"][0]["cells"], 0);
}

// ===========================================================================
// human output
// ===========================================================================

#[test]
fn usage_errors_exit_one_and_keep_stdout_clean() {
    let output = sheetwarden()
        .args(["set-value", "--file", "x.xlsx"])
        .output()
        .expect("run sheetwarden");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn human_output_without_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");

    let output = sheetwarden()
        .args(["create-new", "--output", path_str(&path), "--sheets", "Model"])
        .output()
        .expect("run sheetwarden");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Created workbook: "));
    assert!(serde_json::from_str::<Value>(stdout.trim()).is_err());
}
