//! Command-line front end: load a pipeline config, build the chain, and send
//! one request through it.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use url::Url;

use http_pipeline::config::{load_config, PipelineConfig};
use http_pipeline::observability::{init_logging, init_metrics};
use http_pipeline::{
    DataBody, HttpClientTransport, JsonBody, Method, OperatorBuilder, Request, Response,
};

#[derive(Parser)]
#[command(name = "http-pipeline")]
#[command(about = "Send HTTP requests through a configurable operator chain", long_about = None)]
struct Cli {
    /// Pipeline config file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overriding the config file.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the response
    Send {
        /// Request method, e.g. GET or POST
        method: String,

        /// Absolute URL, or a path resolved against the configured environment
        target: String,

        /// Request header as "Name: value"; may be repeated
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Raw request body
        #[arg(long, conflicts_with = "json")]
        data: Option<String>,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,
    },
    /// Validate a config file and print the resulting chain
    CheckConfig { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { file } => {
            let config = load_config(&file)?;
            println!("{} is valid", file.display());
            println!(
                "stages: {} -> transport",
                config
                    .stages
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
            Ok(())
        }
        Commands::Send {
            method,
            target,
            headers,
            data,
            json,
        } => {
            let config = match &cli.config {
                Some(path) => load_config(path)?,
                None => PipelineConfig::default(),
            };
            let level = cli
                .log_level
                .as_deref()
                .unwrap_or(&config.observability.log_level);
            init_logging(level)?;

            if config.observability.metrics_enabled {
                init_metrics(config.observability.metrics_address.parse()?)?;
            }

            let request = build_request(&method, &target, &headers, data, json)?;
            send(&config, request).await
        }
    }
}

fn build_request(
    method: &str,
    target: &str,
    headers: &[String],
    data: Option<String>,
    json: Option<String>,
) -> Result<Request, Box<dyn Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;

    let mut request = match Url::parse(target) {
        Ok(url) => Request::from_url(method, &url),
        Err(_) => Request::new(method).with_path(target),
    };

    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("invalid header '{header}', expected \"Name: value\""))?;
        request.set_header(name.trim(), value.trim());
    }

    if let Some(data) = data {
        request.set_body(DataBody::new(data));
    } else if let Some(json) = json {
        let value: serde_json::Value = serde_json::from_str(&json)?;
        request.set_body(JsonBody::new(value));
    }

    Ok(request)
}

async fn send(config: &PipelineConfig, request: Request) -> Result<(), Box<dyn Error>> {
    let transport =
        HttpClientTransport::from_config(&config.transport, tokio::runtime::Handle::current())?;
    let chain = OperatorBuilder::from_config(config, Arc::new(transport))?;
    tracing::debug!(?chain, "Chain ready");

    tokio::select! {
        result = chain.send_async(request) => {
            print_response(&result?);
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, resetting chain");
            chain.reset_async().await;
            Err("interrupted".into())
        }
    }
}

fn print_response(response: &Response) {
    println!("{} {}", response.status().as_u16(), response.message());
    for (name, value) in response.headers() {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", response.text());
}
