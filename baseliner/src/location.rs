//! Points in the baseline fallback graph.
//!
//! A [`BaselineLocation`] names one directory that may hold a baseline:
//! the generic root, a `platform/<P>/` or `flag-specific/<F>/` directory,
//! optionally nested under `virtual/<V>/`. Two sentinel locations complete
//! the graph: [`BaselineLocation::all_pass`] terminates every search path and
//! [`BaselineLocation::block`] stops deduplication across a boundary.

use std::fmt;

/// Distinguishes on-disk locations from the synthetic sentinels.
///
/// Declared after the string fields of [`BaselineLocation`] so the derived
/// ordering sorts by directory first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum LocationKind {
    Baseline,
    Block,
    AllPass,
}

/// A location in the fallback graph.
///
/// `platform` and `flag_specific` are mutually exclusive; the constructors
/// only ever set one of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaselineLocation {
    virtual_suite: Option<String>,
    platform: Option<String>,
    flag_specific: Option<String>,
    kind: LocationKind,
}

impl BaselineLocation {
    /// The nonvirtual generic root (`<web-tests>/`).
    pub fn generic() -> Self {
        Self {
            virtual_suite: None,
            platform: None,
            flag_specific: None,
            kind: LocationKind::Baseline,
        }
    }

    /// A platform directory (`<web-tests>/platform/<name>/`).
    pub fn platform(name: impl Into<String>) -> Self {
        Self {
            platform: Some(name.into()),
            ..Self::generic()
        }
    }

    /// A flag-specific directory (`<web-tests>/flag-specific/<name>/`).
    pub fn flag_specific(name: impl Into<String>) -> Self {
        Self {
            flag_specific: Some(name.into()),
            ..Self::generic()
        }
    }

    /// The implicit all-pass sink appended to every search path.
    pub fn all_pass() -> Self {
        Self {
            kind: LocationKind::AllPass,
            ..Self::generic()
        }
    }

    /// The synthetic node that forbids deduplication across it.
    pub fn block() -> Self {
        Self {
            kind: LocationKind::Block,
            ..Self::generic()
        }
    }

    /// Nest this location under `virtual/<suite>/`.
    pub fn with_virtual_suite(mut self, suite: impl Into<String>) -> Self {
        self.virtual_suite = Some(suite.into());
        self
    }

    /// Whether no platform or flag-specific dimension disambiguates this
    /// location within its virtual suite.
    pub fn is_root(&self) -> bool {
        self.kind == LocationKind::Baseline
            && self.platform.is_none()
            && self.flag_specific.is_none()
    }

    /// Whether this is one of the synthetic locations with no file on disk.
    pub fn is_sentinel(&self) -> bool {
        self.kind != LocationKind::Baseline
    }

    pub fn is_all_pass(&self) -> bool {
        self.kind == LocationKind::AllPass
    }

    pub fn is_block(&self) -> bool {
        self.kind == LocationKind::Block
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_suite.is_some()
    }

    pub fn virtual_suite(&self) -> Option<&str> {
        self.virtual_suite.as_deref()
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn flag_specific_name(&self) -> Option<&str> {
        self.flag_specific.as_deref()
    }
}

impl fmt::Display for BaselineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LocationKind::AllPass => return write!(f, "(all-pass)"),
            LocationKind::Block => return write!(f, "(block)"),
            LocationKind::Baseline => {}
        }

        let mut parts = Vec::with_capacity(2);
        if let Some(suite) = &self.virtual_suite {
            parts.push(format!("virtual/{}", suite));
        }
        if let Some(platform) = &self.platform {
            parts.push(platform.clone());
        } else if let Some(flag_specific) = &self.flag_specific {
            parts.push(flag_specific.clone());
        }
        if parts.is_empty() {
            parts.push("(generic)".to_string());
        }
        write!(f, "{}", parts.join(":"))
    }
}
