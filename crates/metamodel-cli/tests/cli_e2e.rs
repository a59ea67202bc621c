use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn metamodel_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_metamodel"))
}

fn crm_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../metamodel-core/tests/fixtures/crm.dom")
}

fn run(args: &[&str]) -> Output {
    Command::new(metamodel_bin())
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("run metamodel")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn validate_accepts_the_crm_module() {
    let fixture = crm_fixture();
    let output = run(&["validate", fixture.to_str().expect("utf8 path")]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("5 specifications"));
}

#[test]
fn validate_reports_failures_and_exits_nonzero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("broken.dom");
    fs::write(
        &input,
        "module Broken\n\n@DomainObject(nature = ENTITY)\nclass x.A:\n  public getName() -> String\n  public hideNothing() -> boolean\n",
    )
    .expect("write module");

    let output = run(&["validate", input.to_str().expect("utf8 path")]);
    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("[orphaned-support-method]"), "stdout: {out}");
    assert!(out.contains("x.A#hideNothing()"), "stdout: {out}");
}

#[test]
fn validate_honors_a_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("form.dom");
    fs::write(
        &input,
        "module Forms\n\n@DomainObject(nature = VIEW_MODEL)\nclass f.Form:\n  public getName() -> String\n  public hideNothing() -> boolean\n",
    )
    .expect("write module");
    let config = dir.path().join("introspection.toml");
    fs::write(&config, "policy = \"ANNOTATION_REQUIRED\"\n").expect("write config");

    // Unannotated support-looking methods are only orphans under the optional policy.
    let output = run(&[
        "validate",
        input.to_str().expect("utf8 path"),
        "--config",
        config.to_str().expect("utf8 path"),
    ]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
}

#[test]
fn describe_emits_json_for_one_type() {
    let fixture = crm_fixture();
    let output = run(&[
        "describe",
        fixture.to_str().expect("utf8 path"),
        "--type",
        "crm.Customer",
        "--json",
    ]);
    assert!(output.status.success());

    let described: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let customer = &described[0];
    assert_eq!(customer["type"], "crm.Customer");
    assert_eq!(customer["sort"], "Entity");
    assert_eq!(customer["superclass"], "crm.Party");
    let ids: Vec<&str> = customer["members"]
        .as_array()
        .expect("members")
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["name", "email", "active", "orders", "placeOrder"]);
}

#[test]
fn bookmark_uses_the_logical_type_name() {
    let fixture = crm_fixture();
    let output = run(&[
        "bookmark",
        fixture.to_str().expect("utf8 path"),
        "--type",
        "crm.Order",
        "--id",
        "1001",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "crm.Order:1001");

    let abstract_party = run(&[
        "bookmark",
        fixture.to_str().expect("utf8 path"),
        "--type",
        "crm.Party",
        "--id",
        "1",
    ]);
    assert!(!abstract_party.status.success());
}
