use clap::Parser;
use eoka_ocr::ocr::PaddleEngine;
use eoka_ocr::{mcp, server, OcrWorker, Settings};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eoka-ocr-server")]
#[command(about = "Keep the OCR model warm and serve it over HTTP or MCP")]
#[command(version)]
struct Args {
    /// Serve MCP tools over stdio instead of HTTP
    #[arg(long)]
    mcp: bool,

    /// Settings file (YAML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries MCP frames, so logs always go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::load_with(args.config.as_deref(), |s| {
        if let Some(host) = args.host {
            s.server.host = host;
        }
        if let Some(port) = args.port {
            s.server.port = port;
        }
    })?;

    if args.mcp {
        return mcp::run_server(settings).await;
    }

    info!(
        "Loading OCR model ({} from {})...",
        settings.models.language,
        settings.models.dir.display()
    );
    let models = settings.models.clone();
    let worker = OcrWorker::start(move || PaddleEngine::load(&models)).await?;
    info!("Model ready");

    let listener = TcpListener::bind(settings.server.bind_addr()).await?;
    server::serve(listener, worker).await?;
    Ok(())
}
