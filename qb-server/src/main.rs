use std::{env, net::SocketAddr};

use qb_server::{AppState, ServiceConfig, build_app, init_logging};
use tracing::info;

const HELP: &str = "\
Usage: qb-server [-V | --version] [-h | --help]

Environment:
  QB_ADDR               listen address (default 0.0.0.0:8080)
  NODE_NORM_URL         node normalizer base url
  NAME_RESOLVER_URL     name resolver base url
  BIOLINK_URL           Biolink model YAML url
  ROBOKACHE_URL         Robokache base url
  ARA_ENDPOINTS         answer services as name=url,name=url
  EXPLORE_DB            SQLite file holding drug_disease_pairs
  QUICK_ANSWER_SAMPLES  JSON file replacing the built-in sample answers
  UPSTREAM_TIMEOUT_MS   timeout for outbound calls (default 300000)
  RUST_LOG              log filter (default info)";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if wants_flag(&["-V", "--version"]) {
        println!("{}", binary_version_text());
        return Ok(());
    }
    if wants_flag(&["-h", "--help"]) {
        println!("{HELP}");
        return Ok(());
    }

    init_logging()?;
    info!("{}", binary_version_text());

    let addr = parse_addr("QB_ADDR", "0.0.0.0:8080")?;
    let config = ServiceConfig::from_env()?;
    let state = AppState::new(config)?;
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("query builder listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_addr(key: &str, default: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    Ok(value.trim().parse()?)
}

fn wants_flag(flags: &[&str]) -> bool {
    env::args().skip(1).any(|arg| flags.contains(&arg.as_str()))
}

fn binary_version_text() -> String {
    let binary = env!("CARGO_PKG_NAME");
    let git_tag = option_env!("QB_BUILD_GIT_TAG").unwrap_or("untagged");
    let git_commit = option_env!("QB_BUILD_GIT_COMMIT").unwrap_or("unknown");
    let dirty = matches!(
        option_env!("QB_BUILD_GIT_DIRTY").unwrap_or("false"),
        "true" | "1" | "yes" | "dirty"
    );

    if dirty {
        format!("{binary} {git_tag} (dirty commit: {git_commit})")
    } else {
        format!("{binary} {git_tag} ({git_commit})")
    }
}
