//! CLI configuration: thin wrapper around `xapbus_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--port, --baud, --device-type, --timeout-ms, --probe-timeout-ms).

pub use xapbus_config::{Config, Profile, config_path, load_config_or_default, save_config};

use xapbus_core::BusConfig;

use clap::ValueEnum;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build a `BusConfig` from the config file, the active profile and flags.
///
/// Flags take priority over profile values. With no matching profile the
/// built-in defaults are used, unless `--profile` named one explicitly.
pub fn build_bus_config(global: &GlobalOpts) -> Result<BusConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    let profile = apply_overrides(profile, global);
    Ok(xapbus_config::profile_to_bus_config(&profile, &cfg.defaults)?)
}

/// Output format: `--output` if given, else `defaults.output` from the file.
pub fn resolve_output(global: &GlobalOpts) -> Result<OutputFormat, CliError> {
    if let Some(ref format) = global.output_flag {
        return Ok(format.clone());
    }
    let cfg = load_config_or_default();
    OutputFormat::from_str(&cfg.defaults.output, true).map_err(|_| CliError::Config {
        message: format!(
            "defaults.output = \"{}\" is not one of table, json, json-compact, yaml, plain",
            cfg.defaults.output
        ),
    })
}

/// Layer flag values over a profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref port) = global.port {
        profile.port.clone_from(port);
    }
    if let Some(baud) = global.baud {
        profile.baud_rate = baud;
    }
    if let Some(ref model) = global.device_type {
        profile.device_type.clone_from(model);
    }
    if global.timeout_ms.is_some() {
        profile.response_timeout_ms = global.timeout_ms;
    }
    if global.probe_timeout_ms.is_some() {
        profile.probe_timeout_ms = global.probe_timeout_ms;
    }
    profile
}
