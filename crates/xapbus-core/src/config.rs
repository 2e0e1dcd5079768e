// ── Runtime bus configuration ──
//
// Describes *how* to reach the bus: port, line speed, declared model and
// timeouts. Never touches disk. The CLI builds a `BusConfig` from its
// profile and hands it in.

use std::time::Duration;

use crate::error::CoreError;
use crate::model::DeviceModel;

/// Connection settings for one serial bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    /// Serial device path (e.g. `/dev/ttyUSB0`).
    pub serial_path: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Model assumed for units that do not report their own type.
    pub device_type: DeviceModel,
    /// Namespace prefix for an external messaging layer. Carried, unused.
    pub topic_namespace: String,
    /// Reply wait for normal traffic.
    pub response_timeout: Duration,
    /// Reply wait while probing for presence.
    pub probe_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            serial_path: "/dev/ttyUSB0".into(),
            baud_rate: 38_400,
            device_type: DeviceModel::Xap800,
            topic_namespace: "home/HA/AudioMixers/".into(),
            response_timeout: Duration::from_millis(500),
            probe_timeout: Duration::from_millis(100),
        }
    }
}

impl BusConfig {
    /// Reject settings the bus cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.serial_path.trim().is_empty() {
            return Err(CoreError::Config {
                message: "serial path is empty".into(),
            });
        }
        if self.baud_rate == 0 {
            return Err(CoreError::Config {
                message: "baud rate must be non-zero".into(),
            });
        }
        if self.response_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "response timeout must be non-zero".into(),
            });
        }
        if self.probe_timeout >= self.response_timeout {
            return Err(CoreError::Config {
                message: format!(
                    "probe timeout ({} ms) must be shorter than response timeout ({} ms)",
                    self.probe_timeout.as_millis(),
                    self.response_timeout.as_millis()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BusConfig::default();
        assert_eq!(config.baud_rate, 38_400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn probe_timeout_must_be_shorter() {
        let config = BusConfig {
            probe_timeout: Duration::from_millis(500),
            ..BusConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_config(), "got: {err}");
    }

    #[test]
    fn zero_baud_is_rejected() {
        let config = BusConfig {
            baud_rate: 0,
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
