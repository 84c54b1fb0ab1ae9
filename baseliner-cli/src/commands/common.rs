//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use baseliner::config::{config_file_path, OptimizerConfig};
use baseliner::BaselineSuffix;
use clap::ValueEnum;

use crate::error::CliError;

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub web_tests: Option<PathBuf>,
}

impl GlobalArgs {
    /// The configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }

    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<OptimizerConfig, CliError> {
        let mut config = OptimizerConfig::load(&self.config_path())?;
        if let Some(dir) = &self.web_tests {
            config = config.with_web_tests(dir);
        }
        Ok(config)
    }
}

/// Baseline kind selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuffixArg {
    /// Text baselines (-expected.txt)
    Txt,
    /// Image baselines (-expected.png)
    Png,
    /// Audio baselines (-expected.wav)
    Wav,
}

impl From<SuffixArg> for BaselineSuffix {
    fn from(arg: SuffixArg) -> Self {
        match arg {
            SuffixArg::Txt => BaselineSuffix::Txt,
            SuffixArg::Png => BaselineSuffix::Png,
            SuffixArg::Wav => BaselineSuffix::Wav,
        }
    }
}

/// The suffixes to optimize, in a stable order. No selection means all.
pub fn resolve_suffixes(args: &[SuffixArg]) -> Vec<BaselineSuffix> {
    if args.is_empty() {
        return BaselineSuffix::ALL.to_vec();
    }
    let mut suffixes: Vec<BaselineSuffix> = args.iter().map(|&arg| arg.into()).collect();
    suffixes.sort();
    suffixes.dedup();
    suffixes
}
