//! Unit command handlers.

use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;
use xapbus_core::{BusConnection, UnitController, UnitSnapshot};

use crate::cli::{GlobalOpts, UnitSettingsArgs, UnitsArgs, UnitsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

/// One line per unit, for `scan` and `units list`.
#[derive(Debug, Serialize)]
pub struct UnitSummary {
    address: u8,
    model: String,
    label: Option<String>,
    serial_number: Option<String>,
    firmware_version: Option<String>,
    dsp_version: Option<String>,
}

impl From<&UnitController> for UnitSummary {
    fn from(unit: &UnitController) -> Self {
        Self {
            address: unit.address().get(),
            model: unit.model().to_string(),
            label: unit.settings().label.clone(),
            serial_number: unit.identity().serial_number.clone(),
            firmware_version: unit.identity().firmware_version.clone(),
            dsp_version: unit.identity().dsp_version.clone(),
        }
    }
}

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Addr")]
    address: u8,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "DSP")]
    dsp: String,
}

impl From<&UnitSummary> for UnitRow {
    fn from(u: &UnitSummary) -> Self {
        Self {
            address: u.address,
            model: u.model.clone(),
            label: output::or_dash(u.label.as_deref()),
            serial: output::or_dash(u.serial_number.as_deref()),
            firmware: output::or_dash(u.firmware_version.as_deref()),
            dsp: output::or_dash(u.dsp_version.as_deref()),
        }
    }
}

fn detail(u: &UnitSnapshot) -> String {
    let s = &u.settings;
    [
        format!("Address:        {}", u.address),
        format!("Model:          {}", u.model),
        format!("Label:          {}", output::or_dash(s.label.as_deref())),
        format!(
            "Serial:         {}",
            output::or_dash(u.identity.serial_number.as_deref())
        ),
        format!(
            "Firmware:       {}",
            output::or_dash(u.identity.firmware_version.as_deref())
        ),
        format!(
            "DSP:            {}",
            output::or_dash(u.identity.dsp_version.as_deref())
        ),
        format!("Modem mode:     {}", output::or_dash(s.modem_mode)),
        format!(
            "Modem password: {}",
            if s.modem_password.is_some() { "(set)" } else { "-" }
        ),
        format!(
            "Modem init:     {}",
            output::or_dash(s.modem_init_string.as_deref())
        ),
        format!("Safety mute:    {}", output::or_dash(s.safety_mute)),
        format!(
            "Panel timeout:  {}",
            s.panel_timeout_minutes
                .map_or_else(|| "-".into(), |m| format!("{m} min"))
        ),
        format!("Panel lock:     {}", output::or_dash(s.panel_lockout)),
        format!(
            "Channels:       {} out / {} in / {} expansion",
            u.outputs.len(),
            u.inputs.len(),
            u.expansion.len()
        ),
    ]
    .join("\n")
}

/// Render every discovered unit as a list.
pub fn print_unit_list(connection: &BusConnection, global: &GlobalOpts) {
    let summaries: Vec<UnitSummary> = connection.units().iter().map(UnitSummary::from).collect();
    let out = output::render_list(
        &global.output,
        &summaries,
        |u| UnitRow::from(u),
        |u| u.address.to_string(),
    );
    output::print_output(&out, global.quiet);
}

fn print_unit(unit: &UnitController, global: &GlobalOpts) {
    let snapshot = unit.snapshot();
    let out = output::render_single(&global.output, &snapshot, detail, |u| {
        u.address.to_string()
    });
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    connection: &mut BusConnection,
    args: UnitsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UnitsCommand::List => {
            print_unit_list(connection, global);
            Ok(())
        }

        UnitsCommand::Get { address } => {
            let unit = connection.unit_mut(util::unit_address(address)?)?;
            unit.refresh().await?;
            print_unit(unit, global);
            Ok(())
        }

        UnitsCommand::Set { address, settings } => {
            let unit = connection.unit_mut(util::unit_address(address)?)?;
            apply_settings(unit, settings).await?;
            print_unit(unit, global);
            Ok(())
        }
    }
}

/// Send each requested change; the mirror keeps what the unit confirmed.
async fn apply_settings(unit: &mut UnitController, args: UnitSettingsArgs) -> Result<(), CliError> {
    let UnitSettingsArgs {
        label,
        modem_mode,
        modem_password,
        modem_init,
        safety_mute,
        panel_timeout,
        panel_lock,
    } = args;

    util::require_any(
        label.is_some()
            || modem_mode.is_some()
            || modem_password.is_some()
            || modem_init.is_some()
            || safety_mute.is_some()
            || panel_timeout.is_some()
            || panel_lock.is_some(),
        "--label, --modem-mode, --modem-password, --modem-init, --safety-mute, \
         --panel-timeout, --panel-lock",
    )?;

    if let Some(label) = label {
        unit.set_label(&label).await?;
    }
    if let Some(enabled) = modem_mode {
        unit.set_modem_mode(enabled).await?;
    }
    if let Some(password) = modem_password {
        unit.set_modem_password(&SecretString::from(password)).await?;
    }
    if let Some(init) = modem_init {
        unit.set_modem_init(&init).await?;
    }
    if let Some(muted) = safety_mute {
        unit.set_safety_mute(muted).await?;
    }
    if let Some(minutes) = panel_timeout {
        unit.set_panel_timeout(minutes).await?;
    }
    if let Some(locked) = panel_lock {
        unit.set_panel_lock(locked).await?;
    }
    Ok(())
}
