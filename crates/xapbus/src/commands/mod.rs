//! Command dispatch: bridges CLI args -> bus operations -> output formatting.

pub mod channels;
pub mod config_cmd;
pub mod expansion;
pub mod scan;
pub mod units;
pub mod util;

use xapbus_core::BusConnection;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a bus-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    connection: &mut BusConnection,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Scan => scan::handle(connection, global),
        Command::Units(args) => units::handle(connection, args, global).await,
        Command::Channels(args) => channels::handle(connection, args, global).await,
        Command::Expansion(args) => expansion::handle(connection, args, global).await,
        // Config and Completions are handled before the bus is opened
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
