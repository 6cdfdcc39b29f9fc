//! cfy: follow workflow executions on a remote manager.
//!
//! Waits for executions and execution groups to finish while streaming
//! their events to stdout.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cfy_monitor::{
    CountingSink, ExecutionStatus, ManagerClient, Monitor, MonitorConfig, MonitorError,
    OutputFormat, Target, WriterSink,
};

#[derive(Parser)]
#[command(name = "cfy")]
#[command(version, about = "Follow executions on a workflow manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Manager URL (overrides CFY_MANAGER_URL)
    #[arg(long, global = true)]
    manager_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Single executions
    Executions {
        #[command(subcommand)]
        command: ExecutionCommand,
    },
    /// Execution groups
    Groups {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Execution event streams
    Events {
        #[command(subcommand)]
        command: EventCommand,
    },
}

#[derive(Subcommand)]
enum ExecutionCommand {
    /// Wait for an execution to finish, streaming its events
    Wait {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// Wait until no member of the group is still running
    Wait {
        #[arg(value_name = "GROUP_ID")]
        group_id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    /// List events of an execution
    List {
        #[arg(short = 'e', long = "execution-id")]
        execution_id: String,

        /// Keep following until the execution finishes
        #[arg(long)]
        tail: bool,

        #[arg(long)]
        include_logs: bool,

        #[arg(long)]
        json: bool,

        /// First event to show; not valid with --tail
        #[arg(long, conflicts_with = "tail")]
        offset: Option<u64>,

        /// Events to show; not valid with --tail
        #[arg(long, conflicts_with = "tail")]
        size: Option<u64>,
    },
}

#[derive(Args)]
struct WaitArgs {
    /// Seconds to wait before giving up locally; 0 waits forever
    #[arg(short, long)]
    timeout: Option<u64>,

    #[arg(short = 'l', long)]
    include_logs: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

impl WaitArgs {
    fn timeout(&self, config: &MonitorConfig) -> Option<Duration> {
        match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(config.wait_timeout()),
        }
    }
}

fn output_format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Short
    }
}

fn stdout_sink(json: bool) -> CountingSink<WriterSink<std::io::Stdout>> {
    CountingSink::new(WriterSink::new(std::io::stdout(), output_format(json)))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout carries only events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,cfy_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = MonitorConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.manager_url {
        config.manager_url = url;
    }
    tracing::debug!(
        manager_url = %config.manager_url,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration loaded"
    );

    let client = ManagerClient::from_config(&config)?;
    let monitor = Monitor::new(client, config.wait_config());

    tokio::select! {
        result = run(cli.command, &monitor, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted; the remote work keeps running");
            Ok(ExitCode::from(130))
        }
    }
}

async fn run(
    command: Commands,
    monitor: &Monitor<ManagerClient>,
    config: &MonitorConfig,
) -> Result<ExitCode> {
    match command {
        Commands::Executions {
            command: ExecutionCommand::Wait { execution_id, wait },
        } => wait_execution(monitor, config, &execution_id, &wait).await,
        Commands::Groups {
            command: GroupCommand::Wait { group_id, wait },
        } => wait_group(monitor, config, &group_id, &wait).await,
        Commands::Events {
            command:
                EventCommand::List {
                    execution_id,
                    tail,
                    include_logs,
                    json,
                    offset,
                    size,
                },
        } => {
            let mut sink = stdout_sink(json);
            if tail {
                let execution = monitor
                    .wait_for_execution(&execution_id, &mut sink, include_logs, None)
                    .await?;
                eprintln!(
                    "Execution {} ended with status {}",
                    execution.id, execution.status
                );
                return Ok(exit_code(execution.status.is_success()));
            }

            let size = size.unwrap_or(monitor.config().page_size);
            let offset = offset.unwrap_or(0);
            let (shown, total) = monitor
                .list_events_page(&execution_id, offset, size, include_logs, &mut sink)
                .await?;
            eprintln!("Showing {} of {} events", shown, total);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn wait_execution(
    monitor: &Monitor<ManagerClient>,
    config: &MonitorConfig,
    execution_id: &str,
    args: &WaitArgs,
) -> Result<ExitCode> {
    let mut sink = stdout_sink(args.json);
    let result = monitor
        .wait_for_execution(execution_id, &mut sink, args.include_logs, args.timeout(config))
        .await;
    tracing::debug!(events = sink.delivered(), "Event stream closed");

    match result {
        Ok(execution) => {
            if execution.status == ExecutionStatus::Failed {
                eprintln!(
                    "Execution {} failed: {}",
                    execution.id,
                    execution.error.as_deref().unwrap_or("no error reported")
                );
            } else {
                eprintln!(
                    "Finished executing workflow {} ({}) with status {}",
                    execution.workflow_id, execution.id, execution.status
                );
            }
            Ok(exit_code(execution.status.is_success()))
        }
        Err(e) => report_timeout(e),
    }
}

async fn wait_group(
    monitor: &Monitor<ManagerClient>,
    config: &MonitorConfig,
    group_id: &str,
    args: &WaitArgs,
) -> Result<ExitCode> {
    let mut sink = stdout_sink(args.json);
    let result = monitor
        .wait_for_execution_group(group_id, &mut sink, args.include_logs, args.timeout(config))
        .await;
    tracing::debug!(events = sink.delivered(), "Group event stream closed");

    match result {
        Ok(outcome) => {
            eprintln!("{}", outcome.summary());
            Ok(exit_code(outcome.is_success()))
        }
        Err(e) => report_timeout(e),
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print follow-up hints for a timeout; any other error propagates.
fn report_timeout(error: MonitorError) -> Result<ExitCode> {
    let MonitorError::Timeout { cursor, .. } = &error else {
        return Err(error.into());
    };

    eprintln!("{}", error);
    match &cursor.target {
        Target::Execution(id) => {
            eprintln!("Execution is still running on the manager.");
            eprintln!("* Run 'cfy events list --tail -e {}' to keep following it", id);
            eprintln!("* Run 'cfy executions cancel {}' to stop it", id);
        }
        Target::Group(id) => {
            eprintln!("Execution group {} is still running on the manager.", id);
            eprintln!("* Run 'cfy groups wait {}' to keep waiting for it", id);
        }
    }
    Ok(ExitCode::FAILURE)
}
