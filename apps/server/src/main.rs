//! netra-server - HTTP front for the Shiksha Netra analysis pipeline

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use netra_core::{CommandPipeline, HttpPipeline, Pipeline, SessionAnalyzer, Settings};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netra_server::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "netra-server", version)]
#[command(about = "Serve the Shiksha Netra pipeline over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000", env = "NETRA_BIND")]
    bind: SocketAddr,

    /// Pipeline executable (and arguments) to run per request
    #[arg(long, env = "NETRA_PIPELINE_CMD", conflicts_with = "pipeline_url")]
    pipeline_cmd: Option<String>,

    /// Base URL of a remote pipeline exposing POST /process
    #[arg(long, env = "NETRA_PIPELINE_URL")]
    pipeline_url: Option<String>,

    /// Directory for temporary uploads (defaults to the system temp dir)
    #[arg(long, env = "NETRA_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netra_server=info,netra_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut settings = Settings::from_env().context("Failed to read settings")?;
    if let Some(dir) = args.upload_dir {
        settings.upload_dir = dir;
    }

    let pipeline: Arc<dyn Pipeline> = match (&args.pipeline_cmd, &args.pipeline_url) {
        (Some(cmd), _) => Arc::new(
            CommandPipeline::from_command_line(cmd, &settings)
                .context("Invalid pipeline command")?,
        ),
        (None, Some(url)) => Arc::new(HttpPipeline::new(url)),
        (None, None) => {
            anyhow::bail!("No pipeline configured: set --pipeline-cmd or --pipeline-url")
        }
    };

    info!(
        provider = settings.coach.provider.name(),
        model = settings.coach.model(),
        "coach configured"
    );
    if !settings.coach.has_credential() {
        warn!(
            env_var = settings.coach.env_var(),
            "coach credential not set; reports will lack coach feedback"
        );
    }

    info!("Starting netra-server on {}", args.bind);
    let analyzer = SessionAnalyzer::new(pipeline, &settings);
    info!("Pipeline: {}", analyzer.pipeline_name());
    info!("Upload dir: {}", analyzer.upload_dir().display());

    let app = build_router(AppState::new(analyzer));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Listening on http://{}", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
