//! End-to-end `eval` and `builtins` through the library entry points.

use autostage_cli::commands::{builtins, eval, EvalRequest};
use autostage_cli::config::AutostageConfig;
use autostage_cli::CliError;

fn request(source: &str) -> EvalRequest {
    EvalRequest {
        source: source.to_string(),
        ..EvalRequest::default()
    }
}

fn run(request: &EvalRequest, config: &AutostageConfig) -> Result<String, CliError> {
    let mut out = Vec::new();
    eval(request, config, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn host_expression() {
    let out = run(&request("abs(-3) + len([1, 2])"), &AutostageConfig::default()).unwrap();
    assert_eq!(out, "5\n");
}

#[test]
fn let_bindings_are_globals() {
    let mut req = request("total = len(xs) * k; total");
    req.lets = vec!["xs=[1, 2, 3]".into(), "k=10".into()];
    assert_eq!(run(&req, &AutostageConfig::default()).unwrap(), "30\n");
}

#[test]
fn staged_len_runs_with_feeds() {
    let mut req = request("len(x)");
    req.placeholders = vec!["x:f32:?,2".into()];
    req.feeds = vec!["x=[[1, 2], [3, 4], [5, 6]]".into()];
    let out = run(&req, &AutostageConfig::default()).unwrap();
    assert!(out.starts_with("<staged"), "unexpected output: {}", out);
    assert!(out.ends_with("=> 3\n"), "unexpected output: {}", out);
}

#[test]
fn staged_range_and_graph_listing() {
    let mut req = request("range(n)");
    req.placeholders = vec!["n:i32:".into()];
    req.feeds = vec!["n=4".into()];
    let mut config = AutostageConfig::default();
    config.eval.show_graph = true;
    let out = run(&req, &config).unwrap();
    assert!(out.contains("maximum"), "graph not listed: {}", out);
    assert!(out.ends_with("=> [0, 1, 2, 3]\n"), "unexpected output: {}", out);
}

#[test]
fn staged_results_can_be_left_unrun() {
    let mut req = request("float(x)");
    req.placeholders = vec!["x:i32:".into()];
    let mut config = AutostageConfig::default();
    config.eval.run_staged = false;
    let out = run(&req, &config).unwrap();
    assert!(!out.contains("=>"));
}

#[test]
fn missing_feed_is_an_execution_error() {
    let mut req = request("abs(x)");
    req.placeholders = vec!["x:i32:".into()];
    let err = run(&req, &AutostageConfig::default()).unwrap_err();
    assert!(matches!(err, CliError::Execution(_)));
}

#[test]
fn feeding_an_undeclared_name_fails() {
    let mut req = request("1");
    req.feeds = vec!["y=1".into()];
    let err = run(&req, &AutostageConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "no placeholder named 'y' to feed");
}

#[test]
fn builtins_lists_every_overload() {
    let mut out = Vec::new();
    builtins(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 7);
    assert!(text.lines().any(|l| l.starts_with("enumerate") && l.ends_with("enumerate_")));
}

#[test]
fn config_discovery_walks_upward() {
    let root = std::env::temp_dir().join(format!("autostage-cfg-{}", std::process::id()));
    let nested = root.join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(root.join("autostage.toml"), "[eval]\nshow_graph = true\n").unwrap();

    let found = AutostageConfig::discover(&nested).unwrap();
    assert_eq!(found, root.join("autostage.toml"));
    let cfg = AutostageConfig::load(Some(&found)).unwrap();
    assert!(cfg.eval.show_graph);

    std::fs::write(root.join("bad.toml"), "[eval\n").unwrap();
    let err = AutostageConfig::load(Some(&root.join("bad.toml"))).unwrap_err();
    assert!(matches!(err, CliError::ParseConfig { .. }));

    std::fs::remove_dir_all(&root).unwrap();
}
