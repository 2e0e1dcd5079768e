//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use xapbus_config::ConfigError;
use xapbus_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not open serial bus at {port}")]
    #[diagnostic(
        code(xapbus::connection_failed),
        help(
            "Check the device path and that no other program holds the port.\n\
             Reason: {reason}\n\
             Try: xapbus --simulate scan"
        )
    )]
    ConnectionFailed { port: String, reason: String },

    #[error("Bus transport failed: {message}")]
    #[diagnostic(
        code(xapbus::transport),
        help("Check the cable and that every unit on the chain is powered.")
    )]
    Transport { message: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Unit {unit} did not answer {command}")]
    #[diagnostic(
        code(xapbus::timeout),
        help("Increase the reply wait with --timeout-ms, or check the unit's baud rate.")
    )]
    Timeout { unit: u8, command: String },

    #[error("Unit {unit} rejected the command: {message}")]
    #[diagnostic(code(xapbus::rejected))]
    Rejected { unit: u8, message: String },

    #[error("Protocol error: {message}")]
    #[diagnostic(code(xapbus::protocol))]
    Protocol { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(xapbus::not_found),
        help("Run: xapbus {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(xapbus::conflict))]
    Conflict { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(xapbus::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Unrecognized device model '{model}'")]
    #[diagnostic(
        code(xapbus::unknown_model),
        help("Supported models are XAP800 and XAP400. Set --device-type or the profile's device_type.")
    )]
    UnknownModel { model: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(xapbus::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: xapbus config init --port <PATH>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(xapbus::config))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Transport { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::UnknownModel { .. } | Self::ProfileNotFound { .. } | Self::Config { .. } => {
                exit_code::CONFIG
            }
            Self::Rejected { .. } | Self::Protocol { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { port, reason } => {
                CliError::ConnectionFailed { port, reason }
            }
            CoreError::Transport { message } => CliError::Transport { message },
            CoreError::NoResponse { unit, command } => CliError::Timeout { unit, command },
            CoreError::Rejected { unit, message } => CliError::Rejected { unit, message },
            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::UnitNotFound { address } => CliError::NotFound {
                resource_type: "unit".into(),
                identifier: address.to_string(),
                list_command: "scan".into(),
            },
            CoreError::ChannelNotFound {
                unit,
                group,
                number,
            } => CliError::NotFound {
                resource_type: format!("{group} channel"),
                identifier: number.to_string(),
                list_command: format!("channels list {unit}"),
            },
            CoreError::ExpansionNotFound { unit, letter } => CliError::NotFound {
                resource_type: "expansion bus channel".into(),
                identifier: letter.to_string(),
                list_command: format!("expansion list {unit}"),
            },

            e @ (CoreError::ExpansionExhausted { .. } | CoreError::ExpansionConflict { .. }) => {
                CliError::Conflict {
                    message: e.to_string(),
                }
            }

            CoreError::InvalidArgument { field, reason } => CliError::Validation { field, reason },

            CoreError::UnknownModel { model } => CliError::UnknownModel { model },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Validation { field, reason } => CliError::Config {
                message: format!("invalid {field}: {reason}"),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
