//! `scan`: list every unit that answered the presence probe.

use xapbus_core::BusConnection;

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::units;

pub fn handle(connection: &BusConnection, global: &GlobalOpts) -> Result<(), CliError> {
    if connection.units().is_empty() && !global.quiet {
        eprintln!("No units answered on {}", connection.config().serial_path);
    }
    units::print_unit_list(connection, global);
    Ok(())
}
