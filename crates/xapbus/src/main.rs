mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xapbus_core::{BusConnection, SimulatedBus};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    let output = config::resolve_output(&cli.global);

    match cli.command {
        // Config commands never touch the bus, and must work with a bad file
        Command::Config(args) => {
            cli.global.output = output.unwrap_or_default();
            commands::config_cmd::handle(args, &cli.global)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "xapbus", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            cli.global.output = output?;
            let mut connection = open_bus(&cli.global).await?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &mut connection, &cli.global).await
        }
    }
}

/// Open and scan the bus named by the active profile and flags.
async fn open_bus(global: &cli::GlobalOpts) -> Result<BusConnection, CliError> {
    let mut bus_config = config::build_bus_config(global)?;

    if global.simulate {
        "<simulated>".clone_into(&mut bus_config.serial_path);
        return Ok(BusConnection::with_transport(bus_config, SimulatedBus::demo()).await?);
    }
    Ok(BusConnection::connect(bus_config).await?)
}
