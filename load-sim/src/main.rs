//! Manual test simulator for the scheduler extender.
//!
//! Posts a synthetic prioritize request against a running extender instance
//! and prints the returned host priority list — useful for poking at a
//! local instance without standing up a full orchestrator.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "load-sim", about = "Manual scoring request simulator")]
struct Cli {
    /// Base URL of the running extender instance.
    #[arg(long, default_value = "http://localhost:8888")]
    target: String,

    /// Candidate node names to score, comma-separated.
    #[arg(long, value_delimiter = ',', default_value = "node1,node2,node3")]
    nodes: Vec<String>,

    /// Simulated pod network I/O need, in Mbit/s. Zero means no annotation
    /// is sent at all.
    #[arg(long, default_value_t = 0)]
    net_io_need_mbit: i64,
}

#[derive(Debug, Serialize)]
struct SimPod {
    #[serde(rename = "Annotations")]
    annotations: std::collections::HashMap<String, String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut annotations = std::collections::HashMap::new();
    if cli.net_io_need_mbit != 0 {
        annotations.insert("LiangNetIO".to_string(), cli.net_io_need_mbit.to_string());
    }

    let body = json!({
        "Pod": SimPod { annotations },
        "NodeNames": cli.nodes,
    });

    let url = format!("{}/v1/prioritizeVerb", cli.target);
    info!(url = %url, nodes = ?cli.nodes, "sending prioritize request");

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("request to extender failed")?;

    let status = response.status();
    let text = response.text().await.context("failed to read response body")?;

    if !status.is_success() {
        anyhow::bail!("extender returned {status}: {text}");
    }

    println!("{text}");
    Ok(())
}
