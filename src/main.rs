use anyhow::Result;
use clap::Parser;
use semafor::{SemaforConfig, TelemetryHub, TrafficController};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "semafor")]
#[command(about = "Adaptive two-lane traffic signal controller")]
#[command(version)]
#[command(long_about = "Samples two camera feeds, counts vehicles per lane, and drives a \
four-phase signal whose green time adapts to demand on the opposing lane. Publishes a \
snapshot of the intersection to dashboard observers over WebSocket.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "semafor.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the controller")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - probe the host and build the controller, then exit
    #[arg(long, help = "Probe capabilities and build the controller without running it")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily rotated files in this directory
    #[arg(long, value_name = "DIR", help = "Directory for daily rotated log files")]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting Semafor v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match SemaforConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let hub = Arc::new(TelemetryHub::new(config.telemetry.channel_capacity));
    let mut controller = TrafficController::from_config(&config, hub.clone()).map_err(|e| {
        error!("Failed to initialize controller: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - controller built but not started");
        println!("✓ Dry run completed: {}", controller.capabilities());
        controller.shutdown();
        return Ok(());
    }

    #[cfg(feature = "streaming")]
    let server = controller.start_telemetry_server(&config, hub);
    #[cfg(not(feature = "streaming"))]
    drop(hub);

    let reason = controller.run_until_signal().await;

    #[cfg(feature = "streaming")]
    if let Some(server) = server {
        if let Err(e) = server.await {
            error!("Telemetry server task failed: {}", e);
        }
    }

    info!("Semafor stopped ({})", reason);
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("semafor={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match args.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "semafor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Semafor Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Any value can be overridden from the environment, e.g.");
    println!("# SEMAFOR_SIGNAL__GREEN_MAX_SECONDS=20");
    println!();
    println!("{}", toml::to_string_pretty(&SemaforConfig::default())?);
    Ok(())
}
