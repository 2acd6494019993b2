mod config;
mod errors;
mod logging;
mod mcp;
mod runtime;
mod sandbox;
mod security;
mod server;
mod tools;

use crate::{config::Config, mcp::registry::ToolRegistry, runtime::ToolRuntime};
use anyhow::Context;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("workcell.toml");
    let mut workspace_override: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = PathBuf::from(&args[i]);
            }
            "--workspace" => {
                i += 1;
                if i >= args.len() { eprintln!("--workspace requires a path"); std::process::exit(2); }
                workspace_override = Some(PathBuf::from(&args[i]));
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let mut cfg = Config::load(&config_path).context("loading config")?;
    if let Some(root) = workspace_override {
        cfg.workspace.root = root;
    }
    cfg.validate().context("validating config")?;

    let runtime = ToolRuntime::new(&cfg.workspace.root, cfg.limits).context("preparing workspace")?;
    let root = runtime.root().display().to_string();
    let registry = ToolRegistry::new(Arc::new(runtime));

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(addr = %addr, base_path = %cfg.server.base_path, root = %root, tools = ?registry.list_names(), "workcell ready");
    println!(
        "workcell ready addr={} base_path={} root={} tools=[{}]",
        addr,
        cfg.server.base_path,
        root,
        registry.list_names().join(",")
    );

    server::serve(cfg, registry).await
}
