//! Edge adapter (v1)
//!
//! Serves framework-shaped handler groups on a bare edge function runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     EDGE ADAPTER                     │
//!   Edge request      │  ┌─────────┐   ┌─────────┐   ┌────────────┐          │
//!   ──────────────────┼─▶│   net   │──▶│  http   │──▶│ dispatcher │          │
//!                     │  │listener │   │ server  │   │ + security │          │
//!                     │  └─────────┘   └─────────┘   └─────┬──────┘          │
//!                     │                                    │ decode, route   │
//!                     │                                    ▼                 │
//!                     │                              ┌────────────┐          │
//!                     │                              │  handler   │          │
//!                     │                              │   group    │          │
//!                     │                              └─────┬──────┘          │
//!   Client response   │  ┌─────────┐   ┌─────────┐         │                 │
//!   ◀─────────────────┼──│transport│◀──│  relay  │◀────────┘                 │
//!                     │  └─────────┘   └─────────┘                           │
//!                     │   config · observability · lifecycle                 │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_adapter::config::{load_config, AdapterConfig};
use edge_adapter::handler::default_registry;
use edge_adapter::http::{Dispatcher, EnvSnapshot, HttpServer};
use edge_adapter::lifecycle::Shutdown;
use edge_adapter::net::Listener;
use edge_adapter::observability::{logging, metrics};
use edge_adapter::routing::RouteTable;

#[derive(Parser)]
#[command(name = "edge-adapter")]
#[command(about = "HTTP compatibility adapter for edge functions", long_about = None)]
struct Args {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AdapterConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("edge-adapter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        routes = config.routes.len(),
        max_body_size = config.body.max_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let routes = RouteTable::from_config(&config.routes, &default_registry())?;
    let env = EnvSnapshot::capture(&config.env.excluded);
    let dispatcher = Dispatcher::new(&config, routes, env);

    let listener = Listener::bind(&config.listener).await?;
    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(dispatcher, config.relay.channel_capacity);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
