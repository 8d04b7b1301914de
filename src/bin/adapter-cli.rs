use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use edge_adapter::config::{load_config, AdapterConfig};
use edge_adapter::http::dispatcher::normalize_path;
use edge_adapter::routing::RouteTemplate;

#[derive(Parser)]
#[command(name = "adapter-cli")]
#[command(about = "Development CLI for the edge adapter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and list its routes
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show which route a path resolves to
    Resolve {
        #[arg(short, long)]
        config: Option<PathBuf>,
        path: String,
    },
    /// Send a request carrying edge headers to a running adapter
    Probe {
        #[arg(short, long, default_value = "http://localhost:9000")]
        url: String,
        #[arg(long)]
        geo: Option<String>,
        #[arg(long, default_value = "127.0.0.1")]
        client_ip: String,
        #[arg(long)]
        request_id: Option<String>,
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = load_config(&config)?;
            println!("{} route(s):", config.routes.len());
            for route in &config.routes {
                println!("  {:<30} -> {}", route.pattern, route.group);
            }
        }
        Commands::Resolve { config, path } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => AdapterConfig::default(),
            };
            let path = normalize_path(&path);
            for route in &config.routes {
                let template = RouteTemplate::parse(&route.pattern)?;
                if let Some(matched) = template.match_path(&path) {
                    println!("route:   {}", route.pattern);
                    println!("group:   {}", route.group);
                    println!("forward: {}", matched.forward_path());
                    println!("params:  {}", serde_json::to_string(&matched.params)?);
                    return Ok(());
                }
            }
            println!("no route matches {}", path);
        }
        Commands::Probe {
            url,
            geo,
            client_ip,
            request_id,
            path,
        } => {
            let vendor = AdapterConfig::default().vendor;
            let mut headers = HeaderMap::new();
            headers.insert(
                reqwest::header::HeaderName::from_bytes(vendor.client_ip_header.as_bytes())?,
                HeaderValue::from_str(&client_ip)?,
            );
            if let Some(geo) = geo {
                headers.insert(
                    reqwest::header::HeaderName::from_bytes(vendor.geo_header.as_bytes())?,
                    HeaderValue::from_str(&geo)?,
                );
            }
            if let Some(id) = request_id {
                headers.insert(
                    reqwest::header::HeaderName::from_bytes(vendor.request_id_header.as_bytes())?,
                    HeaderValue::from_str(&id)?,
                );
            }

            let res = reqwest::Client::new()
                .get(format!("{}{}", url.trim_end_matches('/'), path))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(id) = res.headers().get("functions-request-id") {
        eprintln!("request id: {}", id.to_str().unwrap_or("<binary>"));
    }
    if !status.is_success() {
        eprintln!("Error: adapter returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
