//! Channel command handlers.

use serde::Serialize;
use tabled::Tabled;
use xapbus_core::{BusConnection, ChannelMirror, ChannelSnapshot, GainMode, UnitController};

use crate::cli::{ChannelSettingsArgs, ChannelsArgs, ChannelsCommand, GlobalOpts, GroupArg};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChannelView {
    group: &'static str,
    #[serde(flatten)]
    channel: ChannelSnapshot,
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Group")]
    group: &'static str,
    #[tabled(rename = "#")]
    number: u8,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Gain")]
    gain: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Mute")]
    mute: String,
}

fn row(view: &ChannelView, color: bool) -> ChannelRow {
    let state = &view.channel.state;
    ChannelRow {
        group: view.group,
        number: view.channel.number,
        class: output::or_dash(view.channel.class),
        label: output::or_dash(state.label.as_deref()),
        gain: output::db(state.gain),
        min: output::db(state.gain_min),
        max: output::db(state.gain_max),
        mute: output::mute_cell(state.muted, color),
    }
}

fn detail(view: &ChannelView) -> String {
    let state = &view.channel.state;
    let mut lines = vec![
        format!("Channel:      {} {}", view.group, view.channel.number),
        format!("Label:        {}", output::or_dash(state.label.as_deref())),
        format!("Gain:         {} dB", output::db(state.gain)),
        format!(
            "Proportional: {}",
            state
                .proportional_gain
                .map_or_else(|| "-".into(), |p| format!("{p:.3}"))
        ),
        format!(
            "Range:        {} .. {} dB",
            output::db(state.gain_min),
            output::db(state.gain_max)
        ),
        format!("Muted:        {}", output::or_dash(state.muted)),
    ];
    if let Some(class) = view.channel.class {
        lines.insert(1, format!("Class:        {class}"));
    }
    lines.join("\n")
}

fn group_name(group: GroupArg) -> &'static str {
    match group {
        GroupArg::Input => "input",
        GroupArg::Output => "output",
    }
}

fn view(unit: &UnitController, group: GroupArg, number: u8) -> Result<ChannelView, CliError> {
    let channel = match group {
        GroupArg::Input => unit.input(number)?.snapshot(),
        GroupArg::Output => unit.output(number)?.snapshot(),
    };
    Ok(ChannelView {
        group: group_name(group),
        channel,
    })
}

fn mirror_mut(
    unit: &mut UnitController,
    group: GroupArg,
    number: u8,
) -> Result<&mut ChannelMirror, CliError> {
    Ok(match group {
        GroupArg::Input => &mut **unit.input_mut(number)?,
        GroupArg::Output => &mut **unit.output_mut(number)?,
    })
}

fn print_channel(view: &ChannelView, global: &GlobalOpts) {
    let out = output::render_single(&global.output, view, detail, |v| {
        format!("{} {}", v.group, v.channel.number)
    });
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    connection: &mut BusConnection,
    args: ChannelsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ChannelsCommand::List { address, group } => {
            let unit = connection.unit(util::unit_address(address)?)?;
            let mut views = Vec::new();
            if group.is_none_or(|g| g == GroupArg::Input) {
                views.extend(unit.inputs().map(|c| ChannelView {
                    group: "input",
                    channel: c.snapshot(),
                }));
            }
            if group.is_none_or(|g| g == GroupArg::Output) {
                views.extend(unit.outputs().map(|c| ChannelView {
                    group: "output",
                    channel: c.snapshot(),
                }));
            }

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &views,
                |v| row(v, color),
                |v| format!("{} {}", v.group, v.channel.number),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ChannelsCommand::Get {
            address,
            group,
            number,
        } => {
            let unit = connection.unit_mut(util::unit_address(address)?)?;
            mirror_mut(unit, group, number)?.refresh().await?;
            print_channel(&view(unit, group, number)?, global);
            Ok(())
        }

        ChannelsCommand::Set {
            address,
            group,
            number,
            settings,
        } => {
            let unit = connection.unit_mut(util::unit_address(address)?)?;
            apply_settings(mirror_mut(unit, group, number)?, settings).await?;
            print_channel(&view(unit, group, number)?, global);
            Ok(())
        }
    }
}

/// Send each requested change in refresh order; bounds before gain so a
/// new range applies to the new gain.
async fn apply_settings(
    channel: &mut ChannelMirror,
    args: ChannelSettingsArgs,
) -> Result<(), CliError> {
    let ChannelSettingsArgs {
        label,
        gain,
        relative,
        prop_gain,
        min_gain,
        max_gain,
        mute,
    } = args;

    util::require_any(
        label.is_some()
            || gain.is_some()
            || prop_gain.is_some()
            || min_gain.is_some()
            || max_gain.is_some()
            || mute.is_some(),
        "--label, --gain, --prop-gain, --min-gain, --max-gain, --mute",
    )?;

    if let Some(label) = label {
        channel.set_label(&label).await?;
    }
    if let Some(max) = max_gain {
        channel.set_max_gain(max).await?;
    }
    if let Some(min) = min_gain {
        channel.set_min_gain(min).await?;
    }
    if let Some(muted) = mute {
        channel.set_mute(muted).await?;
    }
    if let Some(fraction) = prop_gain {
        channel.set_proportional_gain(fraction).await?;
        channel.get_gain().await?;
    }
    if let Some(value) = gain {
        let mode = if relative {
            GainMode::Relative
        } else {
            GainMode::Absolute
        };
        channel.set_gain(value, mode).await?;
        channel.get_proportional_gain().await?;
    }
    Ok(())
}
