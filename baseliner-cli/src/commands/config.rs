//! Configuration inspection commands.
//!
//! Provides `config path` and `config ports`.

use baseliner::port::PortSpec;
use clap::Subcommand;

use super::common::GlobalArgs;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// List the ports baselines are optimized for
    Ports,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, global: &GlobalArgs) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Ports => run_ports(global),
    }
}

fn run_path(global: &GlobalArgs) -> Result<(), CliError> {
    println!("{}", global.config_path().display());
    Ok(())
}

fn run_ports(global: &GlobalArgs) -> Result<(), CliError> {
    let config = global.load_config()?;

    if config.has_configured_ports() {
        println!("Ports from {}", global.config_path().display());
    } else {
        println!("Built-in ports (no [port.*] sections configured)");
    }
    println!();

    for spec in config.ports() {
        println!("  {}", format_port(&spec));
    }
    Ok(())
}

fn format_port(spec: &PortSpec) -> String {
    let mut search: Vec<String> = Vec::new();
    if let Some(flag) = &spec.flag_specific {
        search.push(format!("flag-specific/{}", flag));
    }
    search.extend(spec.fallback.iter().map(|dir| format!("platform/{}", dir)));
    search.push("(generic)".to_string());

    format!("{:<16} {:<6} {}", spec.display_name(), spec.os, search.join(" -> "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_port() {
        let spec = PortSpec::new("mac14", "mac", &["mac-mac14", "mac"]);
        assert_eq!(
            format_port(&spec),
            "mac14            mac    platform/mac-mac14 -> platform/mac -> (generic)"
        );

        let flag = PortSpec::new("linux", "linux", &["linux"]).with_flag_specific("highdpi");
        assert!(format_port(&flag).starts_with("linux:highdpi"));
        assert!(format_port(&flag).contains("flag-specific/highdpi -> platform/linux"));
    }
}
