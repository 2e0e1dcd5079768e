//! Expansion bus command handlers.

use tabled::Tabled;
use xapbus_core::{BusConnection, ExpansionBusChannel, ExpansionSnapshot};

use crate::cli::{ExpansionArgs, ExpansionCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ExpansionRow {
    #[tabled(rename = "Letter")]
    letter: char,
    #[tabled(rename = "Input label")]
    input_label: String,
    #[tabled(rename = "Output label")]
    output_label: String,
    #[tabled(rename = "In use")]
    in_use: String,
}

impl From<&ExpansionSnapshot> for ExpansionRow {
    fn from(e: &ExpansionSnapshot) -> Self {
        Self {
            letter: e.letter,
            input_label: output::or_dash(e.labels.input_label.as_deref()),
            output_label: output::or_dash(e.labels.output_label.as_deref()),
            in_use: if e.labels.in_use { "yes" } else { "no" }.into(),
        }
    }
}

fn detail(e: &ExpansionSnapshot) -> String {
    [
        format!("Letter:       {}", e.letter),
        format!(
            "Input label:  {}",
            output::or_dash(e.labels.input_label.as_deref())
        ),
        format!(
            "Output label: {}",
            output::or_dash(e.labels.output_label.as_deref())
        ),
        format!("In use:       {}", e.labels.in_use),
    ]
    .join("\n")
}

pub async fn handle(
    connection: &mut BusConnection,
    args: ExpansionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ExpansionCommand::List { address } => {
            let unit = connection.unit(util::unit_address(address)?)?;
            let channels: Vec<ExpansionSnapshot> =
                unit.expansion_channels().map(ExpansionBusChannel::snapshot).collect();
            let out = output::render_list(
                &global.output,
                &channels,
                |e| ExpansionRow::from(e),
                |e| e.letter.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ExpansionCommand::Set {
            address,
            letter,
            input_label,
            output_label,
        } => {
            util::require_any(
                input_label.is_some() || output_label.is_some(),
                "--input-label, --output-label",
            )?;

            let letter = util::bus_letter(letter)?;
            let unit = connection.unit_mut(util::unit_address(address)?)?;
            let channel = unit.expansion_channel_mut(letter)?;
            if let Some(label) = input_label {
                channel.set_input_label(&label).await?;
            }
            if let Some(label) = output_label {
                channel.set_output_label(&label).await?;
            }

            let snapshot = channel.snapshot();
            let out = output::render_single(&global.output, &snapshot, detail, |e| {
                e.letter.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
