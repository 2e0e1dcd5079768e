// ── Device models and their topology ──

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A supported mixer model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DeviceModel {
    #[strum(serialize = "XAP400")]
    #[serde(rename = "XAP400", alias = "xap400")]
    Xap400,
    #[strum(serialize = "XAP800")]
    #[serde(rename = "XAP800", alias = "xap800")]
    Xap800,
}

impl DeviceModel {
    /// Parse a model name as reported by a unit or written in config.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        name.trim().parse().map_err(|_| CoreError::UnknownModel {
            model: name.trim().to_owned(),
        })
    }

    /// Type code that prefixes every request line to this model.
    pub fn bus_code(self) -> char {
        match self {
            Self::Xap400 => '4',
            Self::Xap800 => '5',
        }
    }

    pub fn topology(self) -> Topology {
        match self {
            Self::Xap400 => Topology {
                outputs: 8,
                inputs: 8,
                mic_inputs: 4,
            },
            Self::Xap800 => Topology {
                outputs: 12,
                inputs: 12,
                mic_inputs: 8,
            },
        }
    }
}

/// Channel counts for one model. Channel numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub outputs: u8,
    pub inputs: u8,
    /// Inputs `1..=mic_inputs` are microphone inputs, the rest line level.
    pub mic_inputs: u8,
}

impl Topology {
    pub fn output_numbers(self) -> RangeInclusive<u8> {
        1..=self.outputs
    }

    pub fn input_numbers(self) -> RangeInclusive<u8> {
        1..=self.inputs
    }

    pub fn classify(self, input: u8) -> InputClass {
        if input <= self.mic_inputs {
            InputClass::Mic
        } else {
            InputClass::Line
        }
    }
}

/// Fixed classification of an input channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InputClass {
    Mic,
    Line,
}
