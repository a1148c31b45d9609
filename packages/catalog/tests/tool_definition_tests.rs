use std::{path::PathBuf, sync::Arc};

use lintcat_catalog::{FixedArtifactProvider, StrategyRegistry, ToolContext};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn bandit_definition() -> Value {
    json!({
        "name": "bandit",
        "command": {
            "strategy": "command_project_scanner",
            "config": {
                "base": ["bandit", "-f", "json", "-q"],
                "options": [{"setting": "confidence", "defaultFrom": "severity.bandit_confidence", "flag": "--confidence-level"}],
                "targets": {"settings": "targets", "fallback": ["."], "prefix": "-r"}
            }
        },
        "parser": {
            "strategy": "parser_json_diagnostics",
            "config": {
                "path": "results[*]",
                "mappings": {
                    "file": "filename",
                    "line": "line_number",
                    "column": "col_offset",
                    "code": "test_id",
                    "message": "issue_text",
                    "severity": {"path": "issue_severity", "map": {"low": "notice", "medium": "warning", "high": "error"}},
                    "tool": {"value": "bandit"}
                }
            }
        }
    })
}

#[test_log::test]
fn tool_definition_builds_and_parses() {
    let tool = StrategyRegistry::default()
        .compile_tool(&bandit_definition())
        .expect("definition should compile");
    assert_eq!(tool.name, "bandit");

    let ctx = ToolContext::builder("/repo").build();
    let command = tool
        .build_command(&ctx)
        .expect("command should build")
        .expect("tool should have a command");
    assert_eq!(
        command.to_string(),
        "bandit -f json -q --confidence-level medium -r /repo"
    );

    let diagnostics = tool.parse_output(
        r#"{"errors": [], "results": [{"filename": "app/db.py", "line_number": 12, "col_offset": 4, "test_id": "B608", "issue_text": "Possible SQL injection", "issue_severity": "MEDIUM"}]}"#,
        &ctx,
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("B608"));
    assert_eq!(diagnostics[0].severity.as_deref(), Some("warning"));
    assert_eq!(diagnostics[0].column, Some(4));
    assert_eq!(
        serde_json::to_value(&diagnostics[0]).expect("diagnostic should serialize"),
        json!({
            "file": "app/db.py",
            "line": 12,
            "column": 4,
            "severity": "warning",
            "message": "Possible SQL injection",
            "code": "B608",
            "tool": "bandit"
        })
    );
}

#[test_log::test]
fn installers_run_in_declared_order() {
    let cache = tempfile::tempdir().expect("Failed to create temp directory");
    let binary = cache.path().join("hadolint");
    std::fs::write(&binary, "").expect("Failed to write binary");

    let registry = StrategyRegistry::new(Arc::new(FixedArtifactProvider::new(&binary)));
    let tool = registry
        .compile_tool(&json!({
            "name": "hadolint",
            "installers": [
                {"strategy": "install_download_artifact", "config": {"download": {"name": "hadolint"}, "version": "2.12.0"}},
                {"strategy": "install_download_artifact", "config": {"download": {"name": "hadolint"}, "contextLabel": "hadolint.fallback"}}
            ]
        }))
        .expect("definition should compile");

    assert_eq!(tool.installers[1].context_label(), "hadolint.fallback");
    assert_eq!(
        tool.install(&ToolContext::builder(cache.path()).build())
            .expect("install should succeed"),
        vec![binary.clone(), binary]
    );
    assert!(tool.command.is_none());
}

#[test_log::test]
fn malformed_definitions_fail_at_compile_time() {
    let registry = StrategyRegistry::default();
    let reject = |definition: Value| {
        registry
            .compile_tool(&definition)
            .expect_err("definition should be rejected")
            .to_string()
    };

    assert_eq!(
        reject(json!({"name": "ruff", "command": {"strategy": "command_shell"}})),
        "strategy: unknown strategy 'command_shell'"
    );
    assert_eq!(
        reject(json!({"name": "ruff", "command": {"strategy": "command_option_map", "config": {"base": []}}})),
        "command_option_map: 'base' must contain at least one argument"
    );
    assert_eq!(
        reject(json!({"name": "ruff", "command": {
            "strategy": "command_option_map",
            "config": {"base": ["ruff"], "options": [{"setting": "x", "type": "toggle"}]}
        }})),
        "command_option_map.options[0]: unsupported option type 'toggle'"
    );
    assert_eq!(
        reject(json!({"name": "ruff", "command": {
            "strategy": "command_option_map",
            "config": {"base": ["ruff"], "options": [{"setting": "v", "type": "repeatFlag"}]}
        }})),
        "command_option_map.options[0]: repeatFlag requires a 'flag' entry"
    );
    assert_eq!(
        reject(json!({"name": "bandit", "parser": {
            "strategy": "parser_json_diagnostics",
            "config": {"mappings": {"message": "text", "url": "more_info"}}
        }})),
        "parser_json_diagnostics: unsupported field 'url' in mappings"
    );
    assert_eq!(
        reject(json!({"name": "bandit", "command": {
            "strategy": "command_project_scanner",
            "config": {"base": ["bandit"], "targets": {"settings": 1}}
        }})),
        "command_project_scanner.targets: settings must be string or array of strings"
    );
    assert_eq!(
        reject(json!({"name": "ruff", "parser": {"strategy": "json_parser", "config": {"transform": "rufff"}}})),
        "json_parser.transform: unknown transform 'rufff'"
    );
    assert_eq!(
        reject(json!({"name": "tsc", "parser": {"strategy": "text_parser", "config": {}}})),
        "text_parser: expected 'transform' to be a string"
    );
    assert_eq!(
        reject(json!({"name": "ruff", "installers": {}})),
        "ruff.installers: 'installers' must be an array"
    );
}

#[test_log::test]
fn runtime_values_never_fail_a_compiled_tool() {
    let tool = StrategyRegistry::default()
        .compile_tool(&json!({
            "name": "eslint",
            "command": {
                "strategy": "command_option_map",
                "config": {
                    "base": ["eslint", "--format", "json"],
                    "options": [
                        {"setting": "max-warnings", "flag": "--max-warnings"},
                        {"setting": "rules", "type": "args", "flag": "--rule"},
                        {"setting": "config", "type": "path", "flag": "--config"},
                        {"setting": "cache", "type": "flag", "flag": "--cache"}
                    ]
                }
            }
        }))
        .expect("definition should compile");

    let ctx = ToolContext::builder("/repo")
        .setting("max-warnings", json!({"nested": true}))
        .setting("rules", json!([null, 3, "no-console: off"]))
        .setting("config", Value::Null)
        .setting("cache", json!([]))
        .files([PathBuf::from("web/app.js")])
        .build();

    assert_eq!(
        tool.build_command(&ctx)
            .expect("command should build")
            .expect("tool should have a command")
            .into_args(),
        [
            "eslint",
            "--format",
            "json",
            "--max-warnings",
            "{\"nested\":true}",
            "--rule",
            "3",
            "--rule",
            "no-console: off",
            "web/app.js",
        ]
    );
}

#[test_log::test]
fn named_transforms_parse_tool_output() {
    let registry = StrategyRegistry::default();
    let ctx = ToolContext::builder("/repo").build();

    let ruff = registry
        .compile_tool(&json!({
            "name": "ruff",
            "command": {"strategy": "command_option_map", "config": {"base": ["ruff", "check", "--output-format", "json"]}},
            "parser": {"strategy": "json_parser", "config": {"transform": "ruff"}}
        }))
        .expect("definition should compile");

    let diagnostics = ruff.parse_output(
        r#"[{"filename": "/repo/app/main.py", "location": {"row": 2, "column": 1}, "code": "E402", "message": "Module level import not at top of file"}]"#,
        &ctx,
    );
    assert_eq!(
        serde_json::to_value(&diagnostics).expect("diagnostics should serialize"),
        json!([{
            "file": "app/main.py",
            "line": 2,
            "column": 1,
            "severity": "error",
            "message": "Module level import not at top of file",
            "code": "E402",
            "tool": "ruff"
        }])
    );

    let yamllint = registry
        .compile_tool(&json!({
            "name": "yamllint",
            "parser": {"strategy": "text_parser", "config": {"transform": "yamllint"}}
        }))
        .expect("definition should compile");

    let diagnostics = yamllint.parse_output(
        "config.yml:3:1: [error] duplication of key \"a\" in mapping (key-duplicates)\n",
        &ctx,
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("key-duplicates"));
    assert_eq!(diagnostics[0].severity.as_deref(), Some("error"));
}
