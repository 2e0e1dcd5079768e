// ── Plain-data views of mirrored state ──
//
// Every field is `None` until the first round trip fills it, and is only
// ever written from a value the device returned.

use secrecy::SecretString;
use serde::Serialize;

use super::device::{DeviceModel, InputClass};

/// Mirrored attributes shared by input and output channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelState {
    pub label: Option<String>,
    /// Absolute gain in dB.
    pub gain: Option<f64>,
    /// Gain as a fraction (0.0-1.0) of the min..max range.
    pub proportional_gain: Option<f64>,
    pub gain_min: Option<f64>,
    pub gain_max: Option<f64>,
    pub muted: Option<bool>,
}

/// Automatic gain control parameters.
///
/// Not yet fetched from the unit; every field stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgcSettings {
    pub enabled: Option<bool>,
    /// -30 to 20 dB.
    pub target_db: Option<f64>,
    /// -50 to 0 dB.
    pub threshold_db: Option<f64>,
    /// 0.1 to 10 seconds.
    pub attack_secs: Option<f64>,
    /// 0 to 18 dB.
    pub gain_db: Option<f64>,
}

/// Read-only identity of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitIdentity {
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub dsp_version: Option<String>,
}

/// Writable unit-wide settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnitSettings {
    pub label: Option<String>,
    pub modem_mode: Option<bool>,
    #[serde(skip)]
    pub modem_password: Option<SecretString>,
    pub modem_init_string: Option<String>,
    pub safety_mute: Option<bool>,
    pub panel_timeout_minutes: Option<u32>,
    pub panel_lockout: Option<bool>,
}

/// Labels and allocation state of one expansion bus channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionLabels {
    pub input_label: Option<String>,
    pub output_label: Option<String>,
    pub in_use: bool,
}

// ── Snapshots ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<InputClass>,
    #[serde(flatten)]
    pub state: ChannelState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpansionSnapshot {
    pub letter: char,
    #[serde(flatten)]
    pub labels: ExpansionLabels,
}

/// Everything mirrored for one unit, for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct UnitSnapshot {
    pub address: u8,
    pub model: DeviceModel,
    pub identity: UnitIdentity,
    pub settings: UnitSettings,
    pub outputs: Vec<ChannelSnapshot>,
    pub inputs: Vec<ChannelSnapshot>,
    pub expansion: Vec<ExpansionSnapshot>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn modem_password_is_never_serialized() {
        let settings = UnitSettings {
            modem_password: Some(SecretString::from(String::from("hunter2"))),
            modem_mode: Some(true),
            ..UnitSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("modem_password"));
        assert!(json.contains("\"modem_mode\":true"));
    }

    #[test]
    fn channel_snapshot_flattens_state() {
        let snap = ChannelSnapshot {
            number: 3,
            class: None,
            state: ChannelState {
                label: Some("Podium".into()),
                ..ChannelState::default()
            },
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["number"], 3);
        assert_eq!(json["label"], "Podium");
        assert!(json.get("class").is_none());
    }
}
