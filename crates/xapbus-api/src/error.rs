use thiserror::Error;

use crate::protocol::{Parameter, UnitAddress};

/// Top-level error type for the `xapbus-api` crate.
///
/// Covers every way a single question/answer exchange on the bus can fail.
/// `xapbus-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Read/write failure on the underlying stream.
    #[error("Bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[error("Serial port {path}: {reason}")]
    Serial { path: String, reason: String },

    /// A unit did not answer within the response-wait bound.
    #[error("Unit {unit} did not answer {command}")]
    NoResponse {
        unit: UnitAddress,
        command: &'static str,
    },

    // ── Device ──────────────────────────────────────────────────────
    /// The unit answered with an `ERROR` line.
    #[error("Unit {unit} rejected the command: {message}")]
    Rejected { unit: UnitAddress, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// A reply line could not be parsed.
    #[error("Malformed reply {line:?}: {reason}")]
    Malformed { line: String, reason: String },

    /// A reply parsed, but carried the wrong kind of value.
    #[error("Unexpected value for {parameter}: expected {expected}, got {got}")]
    UnexpectedValue {
        parameter: Parameter,
        expected: &'static str,
        got: String,
    },
}

impl Error {
    /// Returns `true` if repeating the exchange could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NoResponse { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Returns `true` if the device answered, but with something unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::UnexpectedValue { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_response_is_transient() {
        let err = Error::NoResponse {
            unit: UnitAddress::MIN,
            command: "UID",
        };
        assert!(err.is_transient());
        assert!(!err.is_protocol());
    }

    #[test]
    fn rejected_is_neither_transient_nor_protocol() {
        let err = Error::Rejected {
            unit: UnitAddress::MIN,
            message: "bad channel".into(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_protocol());
    }
}
