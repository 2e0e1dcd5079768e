// ── Channel mirrors ──
//
// Each mirror holds a clone of the bus `Link` and the address of its
// owning unit. Every getter re-queries the unit; every setter sends the
// request and stores whatever the unit confirmed, which may differ from
// what was asked (clamped gain, truncated label).

use std::fmt;
use std::ops::{Deref, DerefMut};

use xapbus_api::{ChannelGroup, Link, Parameter, Target, UnitAddress, WireValue};

use crate::error::CoreError;
use crate::model::{AgcSettings, ChannelSnapshot, ChannelState, InputClass, Topology};

/// How `set_gain` interprets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GainMode {
    /// Value is the new gain in dB.
    #[default]
    Absolute,
    /// Value is an offset in dB from the current gain; the unit applies it.
    Relative,
}

/// State mirror for one input or output channel.
#[derive(Debug, Clone)]
pub struct ChannelMirror {
    link: Link,
    unit: UnitAddress,
    number: u8,
    group: ChannelGroup,
    state: ChannelState,
}

impl ChannelMirror {
    fn new(link: Link, unit: UnitAddress, number: u8, group: ChannelGroup) -> Self {
        Self {
            link,
            unit,
            number,
            group,
            state: ChannelState::default(),
        }
    }

    pub fn unit(&self) -> UnitAddress {
        self.unit
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn group(&self) -> ChannelGroup {
        self.group
    }

    /// Last values the unit reported.
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn label(&self) -> Option<&str> {
        self.state.label.as_deref()
    }

    fn target(&self) -> Target {
        Target::Channel {
            number: self.number,
            group: self.group,
        }
    }

    /// Re-fetch every mirrored attribute.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.get_label().await?;
        self.get_max_gain().await?;
        self.get_min_gain().await?;
        self.get_mute().await?;
        self.get_proportional_gain().await?;
        self.get_gain().await?;
        Ok(())
    }

    async fn fetch<T: WireValue>(&self, parameter: Parameter) -> Result<T, CoreError> {
        Ok(self.link.get(self.unit, parameter, self.target()).await?)
    }

    async fn store<T: WireValue>(&self, parameter: Parameter, value: T) -> Result<T, CoreError> {
        Ok(self
            .link
            .set(self.unit, parameter, self.target(), value)
            .await?)
    }

    // ── Label ────────────────────────────────────────────────────────

    pub async fn get_label(&mut self) -> Result<String, CoreError> {
        let label: String = self.fetch(Parameter::Label).await?;
        self.state.label = Some(label.clone());
        Ok(label)
    }

    pub async fn set_label(&mut self, label: &str) -> Result<String, CoreError> {
        let confirmed = self.store(Parameter::Label, label.to_owned()).await?;
        self.state.label = Some(confirmed.clone());
        Ok(confirmed)
    }

    // ── Gain bounds ──────────────────────────────────────────────────

    pub async fn get_max_gain(&mut self) -> Result<f64, CoreError> {
        let max = self.fetch(Parameter::MaxGain).await?;
        self.state.gain_max = Some(max);
        Ok(max)
    }

    pub async fn set_max_gain(&mut self, max: f64) -> Result<f64, CoreError> {
        let confirmed = self.store(Parameter::MaxGain, max).await?;
        self.state.gain_max = Some(confirmed);
        Ok(confirmed)
    }

    pub async fn get_min_gain(&mut self) -> Result<f64, CoreError> {
        let min = self.fetch(Parameter::MinGain).await?;
        self.state.gain_min = Some(min);
        Ok(min)
    }

    pub async fn set_min_gain(&mut self, min: f64) -> Result<f64, CoreError> {
        let confirmed = self.store(Parameter::MinGain, min).await?;
        self.state.gain_min = Some(confirmed);
        Ok(confirmed)
    }

    // ── Mute ─────────────────────────────────────────────────────────

    pub async fn get_mute(&mut self) -> Result<bool, CoreError> {
        let muted = self.fetch(Parameter::Mute).await?;
        self.state.muted = Some(muted);
        Ok(muted)
    }

    pub async fn set_mute(&mut self, muted: bool) -> Result<bool, CoreError> {
        let confirmed = self.store(Parameter::Mute, muted).await?;
        self.state.muted = Some(confirmed);
        Ok(confirmed)
    }

    // ── Gain ─────────────────────────────────────────────────────────

    pub async fn get_proportional_gain(&mut self) -> Result<f64, CoreError> {
        let fraction = self.fetch(Parameter::ProportionalGain).await?;
        self.state.proportional_gain = Some(fraction);
        Ok(fraction)
    }

    /// Set gain as a fraction of the channel's range.
    ///
    /// The unit converts to dB; the absolute gain mirror is left as is
    /// until the next `get_gain`.
    pub async fn set_proportional_gain(&mut self, fraction: f64) -> Result<f64, CoreError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(CoreError::InvalidArgument {
                field: "proportional gain".into(),
                reason: format!("{fraction} is outside 0.0-1.0"),
            });
        }
        let confirmed = self.store(Parameter::ProportionalGain, fraction).await?;
        self.state.proportional_gain = Some(confirmed);
        Ok(confirmed)
    }

    pub async fn get_gain(&mut self) -> Result<f64, CoreError> {
        let gain = self.fetch(Parameter::Gain).await?;
        self.state.gain = Some(gain);
        Ok(gain)
    }

    /// Set gain and return the absolute gain the unit applied.
    pub async fn set_gain(&mut self, value: f64, mode: GainMode) -> Result<f64, CoreError> {
        let confirmed = match mode {
            GainMode::Absolute => self.store(Parameter::Gain, value).await?,
            GainMode::Relative => {
                self.link
                    .adjust(self.unit, Parameter::Gain, self.target(), value)
                    .await?
            }
        };
        self.state.gain = Some(confirmed);
        Ok(confirmed)
    }
}

// ── Output channel ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OutputChannel {
    mirror: ChannelMirror,
}

impl OutputChannel {
    pub fn new(link: Link, unit: UnitAddress, number: u8) -> Self {
        Self {
            mirror: ChannelMirror::new(link, unit, number, ChannelGroup::Output),
        }
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            number: self.number,
            class: None,
            state: self.state.clone(),
        }
    }
}

impl Deref for OutputChannel {
    type Target = ChannelMirror;

    fn deref(&self) -> &ChannelMirror {
        &self.mirror
    }
}

impl DerefMut for OutputChannel {
    fn deref_mut(&mut self) -> &mut ChannelMirror {
        &mut self.mirror
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Output {}:{} | {}",
            self.unit,
            self.number,
            self.label().unwrap_or("-")
        )
    }
}

// ── Input channel ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct InputChannel {
    mirror: ChannelMirror,
    class: InputClass,
    agc: AgcSettings,
}

impl InputChannel {
    /// Classification is fixed here from the unit's topology.
    pub fn new(link: Link, unit: UnitAddress, number: u8, topology: Topology) -> Self {
        Self {
            mirror: ChannelMirror::new(link, unit, number, ChannelGroup::Input),
            class: topology.classify(number),
            agc: AgcSettings::default(),
        }
    }

    pub fn class(&self) -> InputClass {
        self.class
    }

    pub fn is_mic(&self) -> bool {
        self.class == InputClass::Mic
    }

    pub fn agc(&self) -> &AgcSettings {
        &self.agc
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            number: self.number,
            class: Some(self.class),
            state: self.state.clone(),
        }
    }
}

impl Deref for InputChannel {
    type Target = ChannelMirror;

    fn deref(&self) -> &ChannelMirror {
        &self.mirror
    }
}

impl DerefMut for InputChannel {
    fn deref_mut(&mut self) -> &mut ChannelMirror {
        &mut self.mirror
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Input {}:{} ({}) | {}",
            self.unit,
            self.number,
            self.class,
            self.label().unwrap_or("-")
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceModel;
    use xapbus_api::{SimUnit, SimulatedBus, Value};

    fn unit(n: u8) -> UnitAddress {
        UnitAddress::new(n).unwrap()
    }

    fn setup() -> (SimulatedBus, Link) {
        let bus = SimulatedBus::new().with_unit(unit(1), SimUnit::new("XAP800", "0x01"));
        (bus.clone(), Link::new(bus))
    }

    #[tokio::test]
    async fn refresh_fills_every_field() {
        let (_, link) = setup();
        let mut out = OutputChannel::new(link, unit(1), 4);
        assert_eq!(out.state(), &ChannelState::default());

        out.refresh().await.unwrap();

        let state = out.state();
        assert_eq!(state.label.as_deref(), Some("output 4"));
        assert_eq!(state.gain_max, Some(12.0));
        assert_eq!(state.gain_min, Some(-65.0));
        assert_eq!(state.muted, Some(false));
        assert!(state.gain.is_some());
        assert!(state.proportional_gain.is_some());
    }

    #[tokio::test]
    async fn relative_gain_mirrors_device_result() {
        let (bus, link) = setup();
        bus.set_device_value(unit(1), Parameter::Gain, Target::input(2), Value::Number(-20.0));
        let mut input = InputChannel::new(link, unit(1), 2, DeviceModel::Xap800.topology());

        let gain = input.set_gain(5.0, GainMode::Relative).await.unwrap();

        assert!((gain - -15.0).abs() < f64::EPSILON);
        assert_eq!(input.state().gain, Some(gain));
    }

    #[tokio::test]
    async fn proportional_gain_outside_range_never_reaches_the_bus() {
        let (bus, link) = setup();
        let mut out = OutputChannel::new(link, unit(1), 1);

        let result = out.set_proportional_gain(1.5).await;

        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
        assert_eq!(bus.exchange_count(unit(1)), 0);
        assert!(out.state().proportional_gain.is_none());
    }

    #[test]
    fn display_shows_placeholder_before_fetch() {
        let (_, link) = setup();
        let out = OutputChannel::new(link.clone(), unit(1), 7);
        let input = InputChannel::new(link, unit(1), 10, DeviceModel::Xap800.topology());
        assert_eq!(out.to_string(), "Output 1:7 | -");
        assert_eq!(input.to_string(), "Input 1:10 (line) | -");
    }
}
