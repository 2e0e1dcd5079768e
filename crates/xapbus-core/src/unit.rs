// ── Unit controller ──
//
// One controller per unit that answered the presence probe. Built in
// stages so each step is observable on its own:
//
//   new -> refresh -> populate_topology -> refresh_channels
//
// `discover` runs all four.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use xapbus_api::{BusLetter, ChannelGroup, Link, Parameter, Target, UnitAddress, WireValue};

use crate::channel::{InputChannel, OutputChannel};
use crate::error::CoreError;
use crate::expansion::{ExpansionBusAllocator, ExpansionBusChannel};
use crate::model::{DeviceModel, UnitIdentity, UnitSettings, UnitSnapshot};

/// Mirror of one mixer and its channels.
#[derive(Debug, Clone)]
pub struct UnitController {
    link: Link,
    address: UnitAddress,
    declared: DeviceModel,
    model: DeviceModel,
    identity: UnitIdentity,
    settings: UnitSettings,
    outputs: BTreeMap<u8, OutputChannel>,
    inputs: BTreeMap<u8, InputChannel>,
    expansion: BTreeMap<BusLetter, ExpansionBusChannel>,
    allocator: ExpansionBusAllocator,
}

impl UnitController {
    /// An empty controller. No I/O; every mirror starts unset.
    pub fn new(link: Link, address: UnitAddress, declared: DeviceModel) -> Self {
        Self {
            link,
            address,
            declared,
            model: declared,
            identity: UnitIdentity::default(),
            settings: UnitSettings::default(),
            outputs: BTreeMap::new(),
            inputs: BTreeMap::new(),
            expansion: BTreeMap::new(),
            allocator: ExpansionBusAllocator::new(address),
        }
    }

    /// Build and fully populate a controller.
    pub async fn discover(
        link: Link,
        address: UnitAddress,
        declared: DeviceModel,
    ) -> Result<Self, CoreError> {
        let mut unit = Self::new(link, address, declared);
        unit.refresh().await?;
        unit.populate_topology();
        unit.refresh_channels().await?;
        debug!(%address, model = %unit.model, "unit populated");
        Ok(unit)
    }

    /// Fetch identity and unit-wide settings, one round trip each.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.resolve_model().await?;
        self.get_firmware_version().await?;
        self.get_dsp_version().await?;
        self.get_label().await?;
        self.get_serial_number().await?;
        self.get_modem_mode().await?;
        self.get_modem_init().await?;
        self.get_modem_password().await?;
        self.get_safety_mute().await?;
        self.get_panel_timeout().await?;
        self.get_panel_lock().await?;
        Ok(())
    }

    /// Rebuild channel and expansion mirrors for the current model.
    ///
    /// Mirrors start unfetched and the allocator starts empty.
    pub fn populate_topology(&mut self) {
        let topology = self.model.topology();
        self.outputs = topology
            .output_numbers()
            .map(|n| (n, OutputChannel::new(self.link.clone(), self.address, n)))
            .collect();
        self.inputs = topology
            .input_numbers()
            .map(|n| {
                (
                    n,
                    InputChannel::new(self.link.clone(), self.address, n, topology),
                )
            })
            .collect();
        self.expansion = BusLetter::ALL
            .into_iter()
            .map(|l| (l, ExpansionBusChannel::new(self.link.clone(), self.address, l)))
            .collect();
        self.allocator = ExpansionBusAllocator::new(self.address);
    }

    /// Fetch every channel and expansion mirror.
    pub async fn refresh_channels(&mut self) -> Result<(), CoreError> {
        for output in self.outputs.values_mut() {
            output.refresh().await?;
        }
        for input in self.inputs.values_mut() {
            input.refresh().await?;
        }
        for channel in self.expansion.values_mut() {
            channel.refresh().await?;
        }
        Ok(())
    }

    /// Ask the unit what it is. Silence falls back to the declared model.
    async fn resolve_model(&mut self) -> Result<DeviceModel, CoreError> {
        let reported: Option<String> = self
            .link
            .get_optional(self.address, Parameter::UnitType, Target::Unit)
            .await?;
        let model = match reported {
            Some(name) => DeviceModel::from_name(&name)?,
            None => {
                debug!(address = %self.address, declared = %self.declared, "unit type not reported");
                self.declared
            }
        };
        if model != self.declared {
            warn!(
                address = %self.address,
                reported = %model,
                declared = %self.declared,
                "unit reports a different model than configured"
            );
        }
        self.model = model;
        Ok(model)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn address(&self) -> UnitAddress {
        self.address
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn identity(&self) -> &UnitIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputChannel> {
        self.outputs.values()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &InputChannel> {
        self.inputs.values()
    }

    pub fn expansion_channels(&self) -> impl Iterator<Item = &ExpansionBusChannel> {
        self.expansion.values()
    }

    pub fn allocator(&self) -> &ExpansionBusAllocator {
        &self.allocator
    }

    pub fn output(&self, number: u8) -> Result<&OutputChannel, CoreError> {
        self.outputs
            .get(&number)
            .ok_or_else(|| self.channel_not_found(ChannelGroup::Output, number))
    }

    pub fn output_mut(&mut self, number: u8) -> Result<&mut OutputChannel, CoreError> {
        let missing = self.channel_not_found(ChannelGroup::Output, number);
        self.outputs.get_mut(&number).ok_or(missing)
    }

    pub fn input(&self, number: u8) -> Result<&InputChannel, CoreError> {
        self.inputs
            .get(&number)
            .ok_or_else(|| self.channel_not_found(ChannelGroup::Input, number))
    }

    pub fn input_mut(&mut self, number: u8) -> Result<&mut InputChannel, CoreError> {
        let missing = self.channel_not_found(ChannelGroup::Input, number);
        self.inputs.get_mut(&number).ok_or(missing)
    }

    pub fn expansion_channel(&self, letter: BusLetter) -> Result<&ExpansionBusChannel, CoreError> {
        self.expansion
            .get(&letter)
            .ok_or_else(|| self.expansion_not_found(letter))
    }

    pub fn expansion_channel_mut(
        &mut self,
        letter: BusLetter,
    ) -> Result<&mut ExpansionBusChannel, CoreError> {
        let missing = self.expansion_not_found(letter);
        self.expansion.get_mut(&letter).ok_or(missing)
    }

    fn channel_not_found(&self, group: ChannelGroup, number: u8) -> CoreError {
        CoreError::ChannelNotFound {
            unit: self.address.get(),
            group: group.to_string(),
            number,
        }
    }

    fn expansion_not_found(&self, letter: BusLetter) -> CoreError {
        CoreError::ExpansionNotFound {
            unit: self.address.get(),
            letter: letter.as_char(),
        }
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            address: self.address.get(),
            model: self.model,
            identity: self.identity.clone(),
            settings: self.settings.clone(),
            outputs: self.outputs.values().map(OutputChannel::snapshot).collect(),
            inputs: self.inputs.values().map(InputChannel::snapshot).collect(),
            expansion: self
                .expansion
                .values()
                .map(ExpansionBusChannel::snapshot)
                .collect(),
        }
    }

    // ── Round trips ──────────────────────────────────────────────────

    async fn fetch<T: WireValue>(&self, parameter: Parameter) -> Result<T, CoreError> {
        Ok(self.link.get(self.address, parameter, Target::Unit).await?)
    }

    async fn store<T: WireValue>(&self, parameter: Parameter, value: T) -> Result<T, CoreError> {
        Ok(self
            .link
            .set(self.address, parameter, Target::Unit, value)
            .await?)
    }

    // ── Identity (read-only) ─────────────────────────────────────────

    pub async fn get_serial_number(&mut self) -> Result<String, CoreError> {
        let serial: String = self.fetch(Parameter::UniqueId).await?;
        self.identity.serial_number = Some(serial.clone());
        Ok(serial)
    }

    pub async fn get_firmware_version(&mut self) -> Result<String, CoreError> {
        let version: String = self.fetch(Parameter::Version).await?;
        self.identity.firmware_version = Some(version.clone());
        Ok(version)
    }

    pub async fn get_dsp_version(&mut self) -> Result<String, CoreError> {
        let version: String = self.fetch(Parameter::DspVersion).await?;
        self.identity.dsp_version = Some(version.clone());
        Ok(version)
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn get_label(&mut self) -> Result<String, CoreError> {
        let label: String = self.fetch(Parameter::Label).await?;
        self.settings.label = Some(label.clone());
        Ok(label)
    }

    pub async fn set_label(&mut self, label: &str) -> Result<String, CoreError> {
        let confirmed = self.store(Parameter::Label, label.to_owned()).await?;
        self.settings.label = Some(confirmed.clone());
        Ok(confirmed)
    }

    pub async fn get_modem_mode(&mut self) -> Result<bool, CoreError> {
        let enabled = self.fetch(Parameter::ModemMode).await?;
        self.settings.modem_mode = Some(enabled);
        Ok(enabled)
    }

    pub async fn set_modem_mode(&mut self, enabled: bool) -> Result<bool, CoreError> {
        let confirmed = self.store(Parameter::ModemMode, enabled).await?;
        self.settings.modem_mode = Some(confirmed);
        Ok(confirmed)
    }

    pub async fn get_modem_password(&mut self) -> Result<SecretString, CoreError> {
        let password: String = self.fetch(Parameter::ModemPassword).await?;
        let password = SecretString::from(password);
        self.settings.modem_password = Some(password.clone());
        Ok(password)
    }

    pub async fn set_modem_password(
        &mut self,
        password: &SecretString,
    ) -> Result<SecretString, CoreError> {
        let confirmed: String = self
            .store(
                Parameter::ModemPassword,
                password.expose_secret().to_owned(),
            )
            .await?;
        let confirmed = SecretString::from(confirmed);
        self.settings.modem_password = Some(confirmed.clone());
        Ok(confirmed)
    }

    pub async fn get_modem_init(&mut self) -> Result<String, CoreError> {
        let init: String = self.fetch(Parameter::ModemInit).await?;
        self.settings.modem_init_string = Some(init.clone());
        Ok(init)
    }

    pub async fn set_modem_init(&mut self, init: &str) -> Result<String, CoreError> {
        let confirmed = self.store(Parameter::ModemInit, init.to_owned()).await?;
        self.settings.modem_init_string = Some(confirmed.clone());
        Ok(confirmed)
    }

    pub async fn get_safety_mute(&mut self) -> Result<bool, CoreError> {
        let muted = self.fetch(Parameter::SafetyMute).await?;
        self.settings.safety_mute = Some(muted);
        Ok(muted)
    }

    pub async fn set_safety_mute(&mut self, muted: bool) -> Result<bool, CoreError> {
        let confirmed = self.store(Parameter::SafetyMute, muted).await?;
        self.settings.safety_mute = Some(confirmed);
        Ok(confirmed)
    }

    /// Front panel timeout in minutes.
    pub async fn get_panel_timeout(&mut self) -> Result<u32, CoreError> {
        let minutes = self.fetch(Parameter::PanelTimeout).await?;
        self.settings.panel_timeout_minutes = Some(minutes);
        Ok(minutes)
    }

    pub async fn set_panel_timeout(&mut self, minutes: u32) -> Result<u32, CoreError> {
        let confirmed = self.store(Parameter::PanelTimeout, minutes).await?;
        self.settings.panel_timeout_minutes = Some(confirmed);
        Ok(confirmed)
    }

    pub async fn get_panel_lock(&mut self) -> Result<bool, CoreError> {
        let locked = self.fetch(Parameter::PanelLock).await?;
        self.settings.panel_lockout = Some(locked);
        Ok(locked)
    }

    pub async fn set_panel_lock(&mut self, locked: bool) -> Result<bool, CoreError> {
        let confirmed = self.store(Parameter::PanelLock, locked).await?;
        self.settings.panel_lockout = Some(confirmed);
        Ok(confirmed)
    }

    // ── Expansion bus allocation ─────────────────────────────────────

    /// Claim the lowest free expansion bus letter.
    pub fn request_expansion_channel(&mut self) -> Result<BusLetter, CoreError> {
        let letter = self.allocator.request()?;
        if let Some(channel) = self.expansion.get_mut(&letter) {
            channel.set_in_use(true);
        }
        debug!(address = %self.address, %letter, "expansion channel allocated");
        Ok(letter)
    }

    pub fn reserve_expansion_channel(&mut self, letter: BusLetter) -> Result<(), CoreError> {
        self.allocator.reserve(letter)
    }

    pub fn release_expansion_channel(&mut self, letter: BusLetter) -> Result<(), CoreError> {
        self.allocator.release(letter)?;
        if let Some(channel) = self.expansion.get_mut(&letter) {
            channel.set_in_use(false);
        }
        Ok(())
    }
}

impl fmt::Display for UnitController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit: {} (ID {})", self.model, self.address)
    }
}
