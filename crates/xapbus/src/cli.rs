//! Clap derive structures for the `xapbus` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// xapbus -- inspect and control XAP mixers on a shared serial bus
#[derive(Debug, Parser)]
#[command(
    name = "xapbus",
    version,
    about = "Inspect and control ClearOne XAP mixers over a serial bus",
    long_about = "Discovers XAP800/XAP400 units daisy-chained on one serial port and\n\
        reads or writes unit, channel and expansion bus settings.\n\n\
        Every value shown is the one the unit itself reported.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Bus profile to use
    #[arg(long, short = 'p', env = "XAPBUS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Serial device path (overrides profile)
    #[arg(long, env = "XAPBUS_PORT", global = true)]
    pub port: Option<String>,

    /// Line speed in baud (overrides profile)
    #[arg(long, env = "XAPBUS_BAUD", global = true)]
    pub baud: Option<u32>,

    /// Model assumed for units that do not report one (XAP800 or XAP400)
    #[arg(long, env = "XAPBUS_DEVICE_TYPE", global = true)]
    pub device_type: Option<String>,

    /// Use a built-in simulated bus instead of a serial port
    #[arg(long, env = "XAPBUS_SIMULATE", global = true)]
    pub simulate: bool,

    /// Output format [default: `defaults.output` from the config file, else table]
    #[arg(long = "output", short = 'o', env = "XAPBUS_OUTPUT", global = true)]
    pub output_flag: Option<OutputFormat>,

    /// Format in effect once the config file fallback is applied
    #[arg(skip)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Reply timeout in milliseconds
    #[arg(long, env = "XAPBUS_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Reply timeout while probing for units, in milliseconds
    #[arg(long, env = "XAPBUS_PROBE_TIMEOUT_MS", global = true)]
    pub probe_timeout_ms: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe every bus address and list the units that answer
    Scan,

    /// Show or change unit-wide settings
    #[command(alias = "u")]
    Units(UnitsArgs),

    /// Show or change input and output channels
    #[command(alias = "ch")]
    Channels(ChannelsArgs),

    /// Show or change expansion bus channels
    #[command(alias = "exp")]
    Expansion(ExpansionArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Units ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UnitsArgs {
    #[command(subcommand)]
    pub command: UnitsCommand,
}

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    /// List discovered units
    #[command(alias = "ls")]
    List,

    /// Show identity and settings of one unit
    Get {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,
    },

    /// Change unit-wide settings
    Set {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,

        #[command(flatten)]
        settings: UnitSettingsArgs,
    },
}

#[derive(Debug, Args)]
pub struct UnitSettingsArgs {
    /// Unit label
    #[arg(long)]
    pub label: Option<String>,

    /// Enable or disable modem mode
    #[arg(long)]
    pub modem_mode: Option<bool>,

    /// Modem password
    #[arg(long)]
    pub modem_password: Option<String>,

    /// Modem initialization string
    #[arg(long)]
    pub modem_init: Option<String>,

    /// Enable or disable safety mute
    #[arg(long)]
    pub safety_mute: Option<bool>,

    /// Front panel timeout in minutes
    #[arg(long)]
    pub panel_timeout: Option<u32>,

    /// Lock or unlock the front panel
    #[arg(long)]
    pub panel_lock: Option<bool>,
}

// ── Channels ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    /// Input channels
    #[value(alias = "i")]
    Input,
    /// Output channels
    #[value(alias = "o")]
    Output,
}

#[derive(Debug, Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChannelsCommand {
    /// List channels of one unit
    #[command(alias = "ls")]
    List {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,

        /// Only show one group
        #[arg(long, short = 'g')]
        group: Option<GroupArg>,
    },

    /// Re-read and show one channel
    Get {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,

        /// Channel group
        group: GroupArg,

        /// Channel number (from 1)
        number: u8,
    },

    /// Change one channel
    Set {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,

        /// Channel group
        group: GroupArg,

        /// Channel number (from 1)
        number: u8,

        #[command(flatten)]
        settings: ChannelSettingsArgs,
    },
}

#[derive(Debug, Args)]
pub struct ChannelSettingsArgs {
    /// Channel label
    #[arg(long)]
    pub label: Option<String>,

    /// Gain in dB
    #[arg(long, allow_negative_numbers = true)]
    pub gain: Option<f64>,

    /// Treat --gain as an offset from the current gain
    #[arg(long, requires = "gain")]
    pub relative: bool,

    /// Gain as a fraction of the channel's range (0.0-1.0)
    #[arg(long)]
    pub prop_gain: Option<f64>,

    /// Minimum gain in dB
    #[arg(long, allow_negative_numbers = true)]
    pub min_gain: Option<f64>,

    /// Maximum gain in dB
    #[arg(long, allow_negative_numbers = true)]
    pub max_gain: Option<f64>,

    /// Mute or unmute
    #[arg(long)]
    pub mute: Option<bool>,
}

// ── Expansion bus ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExpansionArgs {
    #[command(subcommand)]
    pub command: ExpansionCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExpansionCommand {
    /// List the expansion bus channels of one unit
    #[command(alias = "ls")]
    List {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,
    },

    /// Label one expansion bus channel
    Set {
        /// Unit address (0-7)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        address: u8,

        /// Bus letter (O-Z)
        letter: char,

        /// Label for the incoming direction
        #[arg(long)]
        input_label: Option<String>,

        /// Label for the outgoing direction
        #[arg(long)]
        output_label: Option<String>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with one profile
    ///
    /// The profile takes --port, --baud and --device-type when given.
    Init {
        /// Overwrite an existing profile of the same name
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
