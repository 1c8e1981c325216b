//! scrapperd entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use scrapperd::config::RunnerConfig;
use scrapperd::gateway::{Gateway, GatewayState};
use scrapperd::sandbox::{JobRunner, connect_docker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = RunnerConfig::resolve()?;
    init_tracing(config.debug);

    tracing::info!(
        jobs_dir = %config.jobs_dir.display(),
        port = config.port,
        "starting scrapperd"
    );

    // Without a container engine there is nothing to serve; refuse to start.
    let docker = connect_docker()
        .await
        .context("container engine unreachable")?;
    tracing::info!("connected to Docker daemon");

    let state = GatewayState {
        runner: Arc::new(JobRunner::new(docker)),
        jobs_dir: config.jobs_dir,
    };

    Gateway::start(state, config.port).await?;
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_directives = if debug {
        "scrapperd=debug,tower_http=debug"
    } else {
        "scrapperd=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
