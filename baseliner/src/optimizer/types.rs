//! Types shared across the optimizer stages.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::location::BaselineLocation;

use super::writer::BaselineChange;

/// Baseline file kind, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSuffix {
    Txt,
    Png,
    Wav,
}

impl BaselineSuffix {
    /// Every suffix, in the order they are optimized.
    pub const ALL: [BaselineSuffix; 3] =
        [BaselineSuffix::Txt, BaselineSuffix::Png, BaselineSuffix::Wav];

    /// Extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            BaselineSuffix::Txt => ".txt",
            BaselineSuffix::Png => ".png",
            BaselineSuffix::Wav => ".wav",
        }
    }
}

impl fmt::Display for BaselineSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension()[1..])
    }
}

impl FromStr for BaselineSuffix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Ok(BaselineSuffix::Txt),
            "png" => Ok(BaselineSuffix::Png),
            "wav" => Ok(BaselineSuffix::Wav),
            other => Err(format!("unknown baseline suffix '{}'", other)),
        }
    }
}

/// Which locations a pass may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Any on-disk location.
    All,
    /// Only locations under one virtual suite. Used when a virtual test is
    /// optimized on its own, so baselines shared with other tests stay put.
    VirtualSuite(String),
}

impl ChangeScope {
    pub fn allows(&self, location: &BaselineLocation) -> bool {
        if location.is_sentinel() {
            return false;
        }
        match self {
            ChangeScope::All => true,
            ChangeScope::VirtualSuite(suite) => location.virtual_suite() == Some(suite.as_str()),
        }
    }
}

/// Result of optimizing one (test, suffix) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizeOutcome {
    pub test: String,
    pub suffix: BaselineSuffix,
    /// Whether the changes were only proposed.
    pub check: bool,
    pub changes: Vec<BaselineChange>,
}

impl OptimizeOutcome {
    pub fn new(test: impl Into<String>, suffix: BaselineSuffix, check: bool) -> Self {
        Self {
            test: test.into(),
            suffix,
            check,
            changes: Vec::new(),
        }
    }

    /// No change was made or proposed.
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn promotions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, BaselineChange::Promote { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes.len() - self.promotions()
    }
}
