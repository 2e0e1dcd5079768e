// ── Core error types ──
//
// User-facing errors from xapbus-core. Consumers never see raw reply
// lines; the `From<xapbus_api::Error>` impl translates transport-layer
// errors into domain-appropriate variants without retrying or hiding them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot open bus at {port}: {reason}")]
    ConnectionFailed { port: String, reason: String },

    #[error("Unit {unit} did not answer {command}")]
    NoResponse { unit: u8, command: String },

    #[error("Bus transport failed: {message}")]
    Transport { message: String },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Unit {unit} rejected the command: {message}")]
    Rejected { unit: u8, message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("No unit at address {address}")]
    UnitNotFound { address: u8 },

    #[error("Unit {unit} has no {group} channel {number}")]
    ChannelNotFound { unit: u8, group: String, number: u8 },

    #[error("Unit {unit} has no expansion bus channel {letter}")]
    ExpansionNotFound { unit: u8, letter: char },

    // ── Expansion allocation ─────────────────────────────────────────
    #[error("Unit {unit} has no free expansion bus channel")]
    ExpansionExhausted { unit: u8 },

    #[error("Expansion bus channel {letter} is {state}")]
    ExpansionConflict { letter: char, state: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Unrecognized device model '{model}' (expected XAP400 or XAP800)")]
    UnknownModel { model: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Errors caused by configuration rather than by the bus.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::UnknownModel { .. } | Self::Config { .. })
    }

    /// Errors that mean a lookup found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnitNotFound { .. } | Self::ChannelNotFound { .. } | Self::ExpansionNotFound { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<xapbus_api::Error> for CoreError {
    fn from(err: xapbus_api::Error) -> Self {
        match err {
            xapbus_api::Error::Serial { path, reason } => {
                CoreError::ConnectionFailed { port: path, reason }
            }
            xapbus_api::Error::Io(e) => CoreError::Transport {
                message: e.to_string(),
            },
            xapbus_api::Error::NoResponse { unit, command } => CoreError::NoResponse {
                unit: unit.get(),
                command: command.to_owned(),
            },
            xapbus_api::Error::Rejected { unit, message } => CoreError::Rejected {
                unit: unit.get(),
                message,
            },
            e @ (xapbus_api::Error::Malformed { .. }
            | xapbus_api::Error::UnexpectedValue { .. }) => CoreError::Protocol {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use xapbus_api::UnitAddress;

    #[test]
    fn no_response_keeps_unit_and_command() {
        let err = CoreError::from(xapbus_api::Error::NoResponse {
            unit: UnitAddress::new(3).unwrap(),
            command: "MUTE",
        });
        assert_eq!(err.to_string(), "Unit 3 did not answer MUTE");
    }

    #[test]
    fn serial_open_failure_is_connection_failure() {
        let err = CoreError::from(xapbus_api::Error::Serial {
            path: "/dev/ttyUSB9".into(),
            reason: "No such file or directory".into(),
        });
        assert!(matches!(err, CoreError::ConnectionFailed { ref port, .. } if port == "/dev/ttyUSB9"));
    }

    #[test]
    fn unknown_model_is_config_kind() {
        let err = CoreError::UnknownModel {
            model: "XAP1600".into(),
        };
        assert!(err.is_config());
        assert!(!err.is_not_found());
    }
}
