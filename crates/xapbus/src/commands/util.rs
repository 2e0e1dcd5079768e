//! Shared helpers for command handlers.

use xapbus_core::{BusLetter, UnitAddress};

use crate::error::CliError;

/// Convert a clap-validated address into a `UnitAddress`.
pub fn unit_address(raw: u8) -> Result<UnitAddress, CliError> {
    UnitAddress::new(raw).ok_or_else(|| CliError::Validation {
        field: "address".into(),
        reason: format!("{raw} is outside 0-7"),
    })
}

/// Parse an expansion bus letter, case-insensitively.
pub fn bus_letter(raw: char) -> Result<BusLetter, CliError> {
    BusLetter::new(raw).ok_or_else(|| CliError::Validation {
        field: "letter".into(),
        reason: format!("'{raw}' is not an expansion bus letter (O-Z)"),
    })
}

/// Fail when a `set` command was given nothing to change.
pub fn require_any(changed: bool, hint: &str) -> Result<(), CliError> {
    if changed {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "settings".into(),
            reason: format!("nothing to change; pass at least one of {hint}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_case_insensitive() {
        assert!(bus_letter('q').is_ok());
        assert!(bus_letter('Z').is_ok());
        assert!(bus_letter('A').is_err());
    }

    #[test]
    fn empty_set_is_usage_error() {
        let err = require_any(false, "--label").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }
}
