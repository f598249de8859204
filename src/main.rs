//! visitor-filter
//!
//! Runs the crawler filter and visit reporter in front of an existing site.
//!
//! ```text
//!     Client ──▶ report_requests ──▶ reject_disallowed_agents ──▶ request ID ──▶ trace ──▶ timeout ──▶ upstream site
//!                      │                       │
//!                      │                       └─ 404 for deny-listed crawlers
//!                      └─ after the response: queue one report
//!                           └─▶ reporter worker ──▶ POST analytics endpoint
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use visitor_filter::config::{load_config, validate_config, FilterConfig};
use visitor_filter::filter::{decode_path, FilterState, RequestLogRecord, Verdict};
use visitor_filter::observability::{logging, metrics};
use visitor_filter::{HttpServer, Reporter, Shutdown};

#[derive(Parser)]
#[command(name = "visitor-filter")]
#[command(about = "Blocks disallowed crawlers and reports visits to an analytics endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter in front of the upstream site (default)
    Serve,
    /// Show how a request would be treated, without sending anything
    Classify {
        /// Request path, e.g. /about
        #[arg(long)]
        path: String,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header as "Name: value"; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Load and validate the configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = read_config(cli.config.as_deref())?;
            serve(config).await
        }
        Commands::Classify {
            path,
            method,
            headers,
        } => {
            let config = match cli.config.as_deref() {
                Some(path) => load_config(path)?,
                None => FilterConfig::default(),
            };
            classify(&config, &path, &method, &headers)
        }
        Commands::CheckConfig => {
            read_config(cli.config.as_deref())?;
            println!("configuration OK");
            Ok(())
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<FilterConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let config = FilterConfig::default();
            if let Err(errors) = validate_config(&config) {
                for error in &errors {
                    eprintln!("config: {error}");
                }
                return Err("built-in defaults need a config file (at least reporting.token)".into());
            }
            Ok(config)
        }
    }
}

async fn serve(config: FilterConfig) -> Result<(), Box<dyn Error>> {
    logging::init(&config.observability);
    tracing::info!("visitor-filter v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let (reporter, worker) = if config.reporting.enabled {
        let (handle, worker) = Reporter::new(&config.reporting)?.spawn();
        (Some(handle), Some(worker))
    } else {
        tracing::info!("Reporting disabled");
        (None, None)
    };

    let filter_state = FilterState::from_config(&config.filter, reporter);
    let drain = Duration::from_secs(config.reporting.drain_secs);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, filter_state)?;
    server.run(listener, shutdown.subscribe()).await?;

    // The server owned the last reporter handle; the worker now drains.
    if let Some(worker) = worker {
        if tokio::time::timeout(drain, worker).await.is_err() {
            tracing::warn!(drain_secs = drain.as_secs(), "Reporter drain deadline passed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn classify(
    config: &FilterConfig,
    path: &str,
    method: &str,
    raw_headers: &[String],
) -> Result<(), Box<dyn Error>> {
    let method: Method = method.to_ascii_uppercase().parse()?;
    let mut headers = HeaderMap::new();
    for raw in raw_headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header {raw:?} is not \"Name: value\""))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }

    let path = decode_path(path);
    let state = FilterState::from_config(&config.filter, None);
    let verdict = state.classifier.classify(&path, &headers);

    match verdict {
        Verdict::Reject if state.reject_disallowed_agents => {
            println!("reject: 404 Not Found, not reported");
        }
        Verdict::Ignore(reason) => println!("ignore: {}", reason.as_str()),
        Verdict::Reject | Verdict::Report => {
            if verdict == Verdict::Reject {
                println!("report (disallowed agent, rejection hook disabled)");
            } else {
                println!("report");
            }
            let record = RequestLogRecord::new(path.into_owned(), &method, &headers);
            println!("{}", String::from_utf8(record.to_json()?)?);
        }
    }
    Ok(())
}
