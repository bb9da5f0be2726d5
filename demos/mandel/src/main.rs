mod node;
mod params;
mod server;

use node::MandelWorker;
use params::MandelParams;
use server::MandelJob;

use taskmill_core::Config;
use taskmill_node::Node;
use taskmill_server::Server;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mandel")]
#[command(about = "Distributed Mandelbrot renderer", long_about = None)]
struct Args {
    /// Run as the server; without this flag the process is a node
    #[arg(short, long)]
    server: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Server address
    #[arg(long)]
    address: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Output image path (server only)
    #[arg(short, long, default_value = "mandel.pgm")]
    output: PathBuf,

    /// Image width and height in pixels (server only)
    #[arg(long)]
    size: Option<u32>,

    /// Iteration limit per pixel (server only)
    #[arg(long)]
    max_iteration: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = Config::from_file(&args.config)?;

    // Override with CLI args
    if let Some(address) = args.address {
        config.server_address = address;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    if args.server {
        let mut params = MandelParams::default();
        if let Some(size) = args.size {
            params.width = size;
            params.height = size;
        }
        if let Some(max_iteration) = args.max_iteration {
            params.max_iteration = max_iteration;
        }

        tracing::info!(
            "Serving a {}x{} render on {}",
            params.width,
            params.height,
            config.server_endpoint()
        );
        let server = Arc::new(Server::new(config, MandelJob::new(params, args.output)));
        server.run().await?;
    } else {
        tracing::info!("Joining render at {}", config.server_endpoint());
        let node = Node::new(config, MandelWorker::default());
        node.run().await?;
    }

    Ok(())
}
