use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use adb_fleet::adb::StartRequest;
use adb_fleet::cli::{Cli, Commands};
use adb_fleet::config::FleetConfig;
use adb_fleet::fleet::Fleet;
use adb_fleet::sink::OutputSink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fleet_common::init_tracing("adb_fleet", cli.verbose)?;

    let config = FleetConfig::load()
        .apply(cli.overrides())
        .context("Invalid configuration")?;

    let sink = Arc::new(OutputSink::stdout());
    let fleet = Fleet::connect(&config, sink)
        .await
        .with_context(|| format!("Failed to start '{}'", config.adb))?
        .with_format(cli.format());

    run_command(&fleet, cli.command).await
}

async fn run_command(fleet: &Fleet, command: Commands) -> Result<()> {
    match command {
        Commands::List { quick: true, .. } => {
            fleet.list_quick().await?;
        }
        Commands::List { wide, .. } => {
            fleet.list(wide).await?;
        }
        Commands::Has { package } => {
            fleet.has(&package).await?;
        }
        Commands::Running { package } => {
            fleet.running(&package).await?;
        }
        Commands::Tap { location } => {
            fleet.tap(location).await?;
        }
        Commands::Swipe { start, end } => {
            fleet.swipe(start, end).await?;
        }
        Commands::Press { button } => {
            fleet.press(&button).await?;
        }
        Commands::Screen { state } => {
            fleet.turn_screen(state.is_on()).await?;
        }
        Commands::Unlock => {
            fleet.unlock().await?;
        }
        Commands::Shutdown => {
            fleet.shutdown().await?;
        }
        Commands::TurnOn => {
            fleet.turn_on().await?;
        }
        Commands::Reboot => {
            fleet.reboot().await?;
        }
        Commands::Install { apk } => {
            fleet
                .install(&apk)
                .await
                .with_context(|| format!("Failed to install {}", apk.display()))?;
        }
        Commands::Push { local, remote } => {
            fleet.push(&local, &remote).await?;
        }
        Commands::Uninstall { package } => {
            fleet.uninstall(&package).await?;
        }
        Commands::Start {
            package,
            activity,
            action,
            data,
            extras,
        } => {
            let request = StartRequest {
                package,
                activity,
                action,
                data,
                extras,
            };
            fleet.start(request).await?;
        }
        Commands::Stop { package } => {
            fleet.stop(&package).await?;
        }
        Commands::Restart { package } => {
            fleet.restart(&package).await?;
        }
        Commands::Shell {
            log_type,
            out_dir,
            command,
        } => {
            fleet.shell(command, log_type, &out_dir).await?;
        }
        Commands::Run { task } => {
            fleet.run_task(task).await?;
        }
    }

    Ok(())
}
