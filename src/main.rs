use std::fs::File;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use port_probe::config::{ServerConfig, DEFAULT_HTTP_PORT, DEFAULT_TIMEOUT_MS};
use port_probe::{
    ports, server, sort_results, ProbeResult, Prober, ProberConfig, SortField, MAX_BATCH,
};

/// port-probe — classify TCP ports on a host as open, closed, timeout, unreachable or error.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "port-probe",
    version,
    about = "Classify TCP ports on a host as open, closed, timeout, unreachable or error.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the HTTP API (and static UI if present).
    Serve(ServeArgs),
    /// Probe ports on a host from the command line.
    Probe(ProbeArgs),
}

#[derive(Debug, Clone, Args)]
struct ServeArgs {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// HTTP listening port.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Directory with static UI files.
    #[arg(long = "ui-dir", default_value = "public")]
    ui_dir: PathBuf,

    /// Per-probe timeout used when a request omits one.
    #[arg(long = "default-timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    default_timeout_ms: u64,

    /// Max simultaneous connect attempts per batch.
    #[arg(long = "max-in-flight", default_value_t = MAX_BATCH)]
    max_in_flight: usize,
}

#[derive(Debug, Clone, Args)]
struct ProbeArgs {
    /// Target IP address or hostname.
    host: String,

    /// Ports to probe, e.g. "22,80,8000-8010".
    #[arg(long, conflicts_with_all = ["ports_file", "common"])]
    ports: Option<String>,

    /// File with one port or range per line.
    #[arg(long = "ports-file", conflicts_with = "common")]
    ports_file: Option<PathBuf>,

    /// Probe the built-in list of common service ports.
    #[arg(long, default_value_t = false)]
    common: bool,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Ports per sub-batch.
    #[arg(long = "chunk-size", default_value_t = 10)]
    chunk_size: usize,

    /// Order the table and export by port, status, response-time or timestamp.
    #[arg(long)]
    sort: Option<SortField>,

    /// Sort descending instead of ascending.
    #[arg(long, default_value_t = false, requires = "sort")]
    desc: bool,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Probe(args) => run_probe(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let ui_dir = if args.ui_dir.is_dir() {
        Some(args.ui_dir)
    } else {
        warn!("UI directory {} not found; serving API only", args.ui_dir.display());
        None
    };
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        ui_dir,
        default_timeout: Duration::from_millis(args.default_timeout_ms),
        prober: ProberConfig {
            max_in_flight: args.max_in_flight,
            ..ProberConfig::default()
        },
    };
    server::serve(config).await
}

async fn run_probe(args: ProbeArgs) -> Result<()> {
    let port_list: Vec<u16> = if args.common {
        ports::common_ports().iter().map(|c| c.port).collect()
    } else if let Some(path) = &args.ports_file {
        ports::load_ports_from_path(path)?
    } else if let Some(spec) = &args.ports {
        ports::parse_port_spec(spec)?
    } else {
        bail!("specify --ports, --ports-file or --common");
    };
    if port_list.is_empty() {
        bail!("Please specify at least one port to test");
    }
    if args.timeout_ms == 0 {
        bail!("--timeout-ms must be positive");
    }

    let prober = Prober::default();
    let timeout = Duration::from_millis(args.timeout_ms);
    let chunk_size = args.chunk_size.clamp(1, prober.config().max_batch);

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    info!(host = %args.host, ports = port_list.len(), "probing");
    let mut results: Vec<ProbeResult> = Vec::with_capacity(port_list.len());
    for chunk in ports::chunk_ports(&port_list, chunk_size) {
        if cancel.is_cancelled() {
            warn!("cancelled; {} of {} ports probed", results.len(), port_list.len());
            break;
        }
        let batch = prober
            .probe_batch_with_cancel(&args.host, chunk, timeout, cancel.clone())
            .await?;
        results.extend(batch);
        info!("tested {} of {} ports", results.len(), port_list.len());
    }

    if let Some(field) = args.sort {
        sort_results(&mut results, field, args.desc);
    }
    print_results_table(&results);
    if let Some(path) = args.output.as_deref() {
        write_results_json(path, &results)?;
        println!("Wrote JSON results to {}", path.display());
    }
    Ok(())
}

fn print_results_table(results: &[ProbeResult]) {
    let host_w = results
        .iter()
        .map(|r| r.host.len())
        .max()
        .unwrap_or(0)
        .max("host".len());
    let open = results.iter().filter(|r| r.is_open()).count();

    println!("\nOpen ports: {} (probed: {})", open, results.len());
    println!(
        "{:<host_w$}  {:>5}  {:<11}  {:>8}  {:<}",
        "host", "port", "status", "time_ms", "error"
    );
    println!("{:-<host_w$}  {:-<5}  {:-<11}  {:-<8}  {:-<5}", "", "", "", "", "");
    for r in results {
        println!(
            "{:<host_w$}  {:>5}  {:<11}  {:>8}  {:<}",
            r.host,
            r.port,
            r.status.to_string(),
            r.response_time_ms,
            r.error.as_deref().unwrap_or("")
        );
    }
}

fn write_results_json(path: &Path, results: &[ProbeResult]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
