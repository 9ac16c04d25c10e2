//! Binary entry point for the `nova-machine` CLI.

use std::future::Future;
use std::io::{self, Write};
use std::process;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};

use nova_machine::context::SyncedFolderParseError;
use nova_machine::telemetry::{self, LogFormat, TelemetryError};
use nova_machine::{
    ActionError, CloudServerGateway, ContextReport, DeleteServer, ExecutionContext, InterruptFlag,
    NovaGateway, NovaGatewayError, OpenStackConfig, Pipeline, PrepareNfsSettings, ReadinessPoller,
    RebootMode, RebootServer, ResolveError, SshPortProbe, SyncValidIds, SyncedFolder,
};

mod cli;

use cli::{Cli, DestroyCommand, NfsSettingsCommand, RebootCommand};

const CLI_TARGET: &str = "nova_machine::cli";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("gateway error: {0}")]
    Gateway(#[from] NovaGatewayError),
    #[error("address resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Action(#[from] ActionError<NovaGatewayError>),
    #[error("invalid synced folder: {0}")]
    SyncedFolder(#[from] SyncedFolderParseError),
    #[error("interrupted")]
    Interrupted,
    #[error("failed to write report: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(report) => match write_report(io::stdout(), &report) {
            Ok(()) => 0,
            Err(err) => {
                write_error(io::stderr(), &err);
                1
            }
        },
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<ContextReport, CliError> {
    let config =
        OpenStackConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let format: LogFormat = config.log_format.parse()?;
    telemetry::initialise(&config.log_filter, format)?;

    let gateway = NovaGateway::new(&config)?;
    let interrupt = InterruptFlag::new();
    let watcher = interrupt.interrupt_on_ctrl_c();

    let command = run_command(cli, &config, gateway, interrupt.clone());
    let result = until_interrupted(command, &interrupt).await;
    watcher.abort();
    result
}

async fn run_command(
    cli: Cli,
    config: &OpenStackConfig,
    gateway: NovaGateway,
    interrupt: InterruptFlag,
) -> Result<ContextReport, CliError> {
    match cli {
        Cli::Destroy(args) => destroy(gateway, interrupt, args).await,
        Cli::Reboot(args) => reboot(config, gateway, interrupt, args).await,
        Cli::ValidIds => valid_ids(gateway, interrupt).await,
        Cli::NfsSettings(args) => nfs_settings(config, gateway, interrupt, args).await,
    }
}

/// Drives `command` until it finishes or `interrupt` is raised.
///
/// The command is polled first, so a command that turns the interrupt into
/// a clean exit (the reboot wait) still reports its context. Anything else
/// still in flight, such as a hung API request, is dropped.
async fn until_interrupted<F>(
    command: F,
    interrupt: &InterruptFlag,
) -> Result<ContextReport, CliError>
where
    F: Future<Output = Result<ContextReport, CliError>>,
{
    tokio::select! {
        biased;
        outcome = command => outcome,
        () = interrupt.raised() => {
            warn!(target: CLI_TARGET, "interrupted before the command finished");
            Err(CliError::Interrupted)
        }
    }
}

async fn destroy(
    gateway: NovaGateway,
    interrupt: InterruptFlag,
    args: DestroyCommand,
) -> Result<ContextReport, CliError> {
    let mut ctx = ExecutionContext::default()
        .with_interrupt(interrupt)
        .with_machine_id(Some(args.id));
    Pipeline::new()
        .then(DeleteServer::new(gateway))
        .run(&mut ctx)
        .await?;
    Ok(ctx.report())
}

async fn reboot(
    config: &OpenStackConfig,
    gateway: NovaGateway,
    interrupt: InterruptFlag,
    args: RebootCommand,
) -> Result<ContextReport, CliError> {
    let floating_ip = config.attached_floating_ip();
    let mut ctx = ExecutionContext::default()
        .with_interrupt(interrupt)
        .with_machine_id(Some(args.id.clone()))
        .with_floating_ip(floating_ip.clone());

    let Some(server) = gateway.get_server(&args.id).await? else {
        warn!(target: CLI_TARGET, server = %args.id, "server not found; forgetting id");
        ctx.clear_machine_id();
        return Ok(ctx.report());
    };
    let address = config
        .resolution_policy()
        .machine_ip(&server, floating_ip.as_deref())?;

    let probe = SshPortProbe::new(address, config.ssh_port);
    info!(
        target: CLI_TARGET,
        host = probe.host(),
        port = probe.port(),
        "will wait for SSH after reboot"
    );
    let poller = ReadinessPoller::new().with_deadline(args.deadline_secs.map(Duration::from_secs));
    let mode = if args.hard {
        RebootMode::Hard
    } else {
        RebootMode::Soft
    };
    Pipeline::new()
        .then(
            RebootServer::new(gateway, probe)
                .with_poller(poller)
                .with_mode(mode),
        )
        .run(&mut ctx)
        .await?;
    Ok(ctx.report())
}

async fn valid_ids(
    gateway: NovaGateway,
    interrupt: InterruptFlag,
) -> Result<ContextReport, CliError> {
    let mut ctx = ExecutionContext::default().with_interrupt(interrupt);
    Pipeline::new()
        .then(SyncValidIds::new(gateway))
        .run(&mut ctx)
        .await?;
    Ok(ctx.report())
}

async fn nfs_settings(
    config: &OpenStackConfig,
    gateway: NovaGateway,
    interrupt: InterruptFlag,
    args: NfsSettingsCommand,
) -> Result<ContextReport, CliError> {
    let folders = parse_synced_folders(&args.synced_folders)?;
    let mut ctx = ExecutionContext::new(args.name)
        .with_interrupt(interrupt)
        .with_machine_id(args.id)
        .with_floating_ip(config.attached_floating_ip())
        .with_synced_folders(folders);
    Pipeline::new()
        .then(SyncValidIds::new(gateway.clone()))
        .then(PrepareNfsSettings::new(gateway, config.resolution_policy()))
        .run(&mut ctx)
        .await?;
    Ok(ctx.report())
}

fn parse_synced_folders(raw: &[String]) -> Result<Vec<SyncedFolder>, CliError> {
    raw.iter()
        .map(|value| value.parse::<SyncedFolder>().map_err(CliError::from))
        .collect()
}

fn write_report(mut target: impl Write, report: &ContextReport) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(report).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
