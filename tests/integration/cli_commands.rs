//! CLI routes driven through clap parsing, as the binary does.

use clap::Parser;
use pagehost::cli::{command_name, map_error, Cli, RunContext};
use pagehost::error::HostError;
use tempfile::TempDir;

use crate::integration::with_config_env;

fn context(temp: &TempDir, workspace_config: &str) -> RunContext {
    let workspace = temp.path().join("ws");
    std::fs::create_dir_all(workspace.join("config")).unwrap();
    std::fs::write(workspace.join("config/config.toml"), workspace_config).unwrap();
    with_config_env(temp, || RunContext::new(workspace.clone(), None).unwrap())
}

async fn run(ctx: &RunContext, args: &[&str]) -> Result<String, HostError> {
    let mut argv = vec!["pagehost"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    ctx.execute(&cli.command).await
}

#[tokio::test]
async fn sets_land_in_the_configured_directory() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "[storage]\nvariable_sets_dir = \"data/sets\"\n");

    run(&ctx, &["sets", "create", "--name", "checkout"]).await.unwrap();

    let dir = ctx.workspace_root().join("data/sets");
    let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(files.len(), 1);

    let listed = run(&ctx, &["sets", "list", "--format", "json"]).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&listed).unwrap();
    let sets = parsed.as_object().unwrap();
    assert_eq!(sets.len(), 1);
    let set = sets.values().next().unwrap();
    assert_eq!(set["name"], "checkout");
    assert_eq!(
        set["variables"],
        serde_json::json!({ "sessionData": null, "constants": null })
    );
}

#[tokio::test]
async fn missing_set_maps_to_friendly_error() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "");

    let err = run(&ctx, &["sets", "show", "12345"]).await.unwrap_err();
    assert_eq!(map_error(&err), "No variable set with id '12345'");
}

#[tokio::test]
async fn update_replaces_name_and_variables() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "");

    run(
        &ctx,
        &["sets", "update", "42", "--name", "renamed", "--variables", r#"{"b":true}"#],
    )
    .await
    .unwrap();
    let shown = run(&ctx, &["sets", "show", "42"]).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(parsed["id"], "42");
    assert_eq!(parsed["variable_set"]["name"], "renamed");
    assert_eq!(parsed["variable_set"]["variables"]["b"], true);
}

#[tokio::test]
async fn simulate_prints_the_event_log() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "");
    let pages = ctx.workspace_root().join("pages/welcome");
    std::fs::create_dir_all(&pages).unwrap();
    std::fs::write(pages.join("index.html"), "<html/>").unwrap();

    let script = temp.path().join("session.json");
    std::fs::write(
        &script,
        r#"{ "steps": [
            { "action": "select_page", "page": "welcome" },
            { "action": "emit", "event": { "event": "SUBMIT", "page": "welcome" } }
        ] }"#,
    )
    .unwrap();

    let out = run(&ctx, &["simulate", script.to_str().unwrap(), "--format", "json"])
        .await
        .unwrap();
    let events: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = events.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["READY", "message", "SUBMIT"]);
}

#[test]
fn command_names_follow_the_route_table() {
    let cli = Cli::try_parse_from(["pagehost", "sets", "--remote", "http://x.test", "list"]).unwrap();
    assert_eq!(command_name(&cli.command), "sets.list");
    let cli = Cli::try_parse_from(["pagehost", "simulate", "s.json"]).unwrap();
    assert_eq!(command_name(&cli.command), "simulate");
}
