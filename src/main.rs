#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;

use awswatch::app::config::AppConfig;
use awswatch::app::data_plane::cloudwatch_logs::{QueryRequest, TimeRange};
use awswatch::app::mcp_server::McpServer;
use awswatch::app::session::load_sdk_config;
use awswatch::MonitoringEngine;

/// CloudWatch alarms, log groups and Logs Insights queries from the terminal or over MCP
#[derive(Parser, Debug)]
#[command(name = "awswatch")]
#[command(version)]
pub struct Args {
    /// AWS profile to use
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// AWS region to use
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (twice for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP server on stdin/stdout
    Serve,
    /// Print the configured log groups
    LogGroups {
        /// List log groups from AWS instead, optionally by name prefix
        #[arg(long)]
        remote: bool,
        #[arg(long, requires = "remote")]
        prefix: Option<String>,
    },
    /// List CloudWatch alarms
    Alarms {
        /// Only alarms currently in the ALARM state
        #[arg(long)]
        only_in_alarm: bool,
    },
    /// List saved Logs Insights queries
    SavedQueries,
    /// Check whether a log group exists
    Exists { name: String },
    /// Infer the fields of one or more log groups
    Discover {
        #[arg(required = true)]
        log_groups: Vec<String>,
    },
    /// Run a Logs Insights query
    Query {
        #[arg(short, long = "log-group", required = true)]
        log_groups: Vec<String>,
        #[arg(short, long)]
        query: String,
        /// Start of the window, epoch milliseconds
        #[arg(long)]
        start: Option<i64>,
        /// End of the window, epoch milliseconds
        #[arg(long)]
        end: Option<i64>,
        /// Maximum rows returned
        #[arg(long)]
        limit: Option<i32>,
        /// Local wait limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn log_filter(config: &AppConfig, verbose: u8) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::EnvFilter::new(format!(
        "awswatch={level},aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,hyper=warn"
    ))
}

/// Log to `<data dir>/logs/awswatch.log`, or stderr when that is unavailable.
/// Stdout is left alone: it carries the MCP stream.
fn init_logging(config: &AppConfig, verbose: u8) -> Result<()> {
    let filter = log_filter(config, verbose);

    let log_file = directories::ProjectDirs::from("com", "", "awswatch").and_then(|proj_dirs| {
        let log_dir = proj_dirs.data_dir().join("logs");
        std::fs::create_dir_all(&log_dir).ok()?;
        let log_path = log_dir.join("awswatch.log");
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&log_path)
            .ok()?;
        Some((log_path, file))
    });

    match log_file {
        Some((log_path, file)) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) =
                    std::fs::set_permissions(&log_path, std::fs::Permissions::from_mode(0o600))
                {
                    eprintln!("Failed to restrict log file permissions: {}", e);
                }
            }

            let subscriber = tracing_subscriber::registry().with(filter).with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            );
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
            tracing_log::LogTracer::init().context("Failed to initialize log-to-tracing bridge")?;
            tracing::info!("Logging initialized to: {:?}", log_path);
        }
        None => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            );
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
            tracing_log::LogTracer::init().context("Failed to initialize log-to-tracing bridge")?;
            tracing::info!("Logging initialized to stderr");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: Args, mut config: AppConfig) -> Result<()> {
    if let Some(profile) = args.profile {
        config.aws.profile = profile;
    }
    if let Some(region) = args.region {
        config.aws.region = region;
    }

    if let Command::Query {
        timeout: Some(secs),
        ..
    } = &args.command
    {
        config.query.timeout_secs = *secs;
    }

    let sdk_config = load_sdk_config(&config.aws).await;
    let engine = MonitoringEngine::from_sdk_config(&sdk_config, &config)?;

    match args.command {
        Command::Serve => {
            tracing::info!("Starting MCP server on stdio");
            McpServer::new(engine, config.mcp.protocol_version.clone())
                .run_stdio()
                .await?;
        }
        Command::LogGroups { remote, prefix } => {
            if remote {
                print_json(&engine.describe_log_groups(prefix.as_deref()).await?)?;
            } else {
                print_json(engine.list_log_groups())?;
            }
        }
        Command::Alarms { only_in_alarm } => {
            print_json(&engine.list_alarms(only_in_alarm).await?)?;
        }
        Command::SavedQueries => {
            print_json(&engine.list_saved_queries().await?)?;
        }
        Command::Exists { name } => {
            let exists = engine.log_group_exists(&name).await;
            print_json(&serde_json::json!({ "logGroupName": name, "exists": exists }))?;
        }
        Command::Discover { log_groups } => {
            print_json(&engine.discover_fields(&log_groups).await?)?;
        }
        Command::Query {
            log_groups,
            query,
            start,
            end,
            limit,
            ..
        } => {
            let mut request =
                QueryRequest::new(log_groups, query).with_time_range(TimeRange::new(start, end));
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }

            // Ctrl-C ends the local wait and stops the remote query
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let result = engine.query_logs_with(request, &cancel).await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config, args.verbose)?;
    tracing::debug!("Effective configuration: {:?}", config);

    let result = run(args, config).await;
    if let Err(e) = &result {
        tracing::error!("awswatch failed: {:#}", e);
    }
    result
}
