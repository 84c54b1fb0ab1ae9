//! INI configuration file.
//!
//! ```ini
//! [web_tests]
//! directory = /src/third_party/blink/web_tests
//!
//! [port.linux]
//! os = linux
//! fallback = linux
//!
//! [port.highdpi]
//! os = linux
//! fallback = linux
//! flag_specific = highdpi
//! ```
//!
//! Without any `[port.*]` section the built-in port table is used.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::port::PortSpec;

/// Directory under the user's config directory.
pub const CONFIG_DIR_NAME: &str = "baseliner";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

const WEB_TESTS_SECTION: &str = "web_tests";
const PORT_SECTION_PREFIX: &str = "port.";

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from loading or using the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("port '{port}' has no os")]
    MissingOs { port: String },

    #[error("unknown port '{port}' (configured: {known})")]
    UnknownPort { port: String, known: String },

    #[error("no web tests directory configured; set [web_tests] directory or pass --web-tests")]
    NoWebTests,
}

/// Default path of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Ports used when the configuration declares none.
pub fn builtin_ports() -> Vec<PortSpec> {
    vec![
        PortSpec::new("linux", "linux", &["linux"]),
        PortSpec::new("mac14", "mac", &["mac-mac14", "mac"]),
        PortSpec::new("mac15", "mac", &["mac"]),
        PortSpec::new("win10.20h2", "win", &["win10", "win"]),
        PortSpec::new("win11", "win", &["win"]),
    ]
}

/// Settings for one optimizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerConfig {
    web_tests: Option<PathBuf>,
    ports: Vec<PortSpec>,
}

impl OptimizerConfig {
    /// Load from a file. A missing file yields the default configuration.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &content)
    }

    /// Parse INI text. `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> ConfigResult<Self> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for (section, props) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            if section == WEB_TESTS_SECTION {
                if let Some(dir) = props.get("directory").map(str::trim).filter(|d| !d.is_empty()) {
                    config.web_tests = Some(PathBuf::from(dir));
                }
            } else if let Some(name) = section.strip_prefix(PORT_SECTION_PREFIX) {
                let os = props.get("os").map(str::trim).unwrap_or_default();
                if os.is_empty() {
                    return Err(ConfigError::MissingOs {
                        port: name.to_string(),
                    });
                }
                let fallback: Vec<&str> = props
                    .get("fallback")
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|dir| !dir.is_empty())
                    .collect();
                let mut spec = PortSpec::new(name, os.to_lowercase(), &fallback);
                let flag = props
                    .get("flag_specific")
                    .map(str::trim)
                    .filter(|f| !f.is_empty());
                if let Some(flag) = flag {
                    spec = spec.with_flag_specific(flag);
                }
                config.ports.push(spec);
            }
        }
        Ok(config)
    }

    pub fn with_web_tests(mut self, dir: impl Into<PathBuf>) -> Self {
        self.web_tests = Some(dir.into());
        self
    }

    pub fn with_port(mut self, spec: PortSpec) -> Self {
        self.ports.push(spec);
        self
    }

    pub fn web_tests(&self) -> Option<&Path> {
        self.web_tests.as_deref()
    }

    /// The web tests directory, which every run needs.
    pub fn require_web_tests(&self) -> ConfigResult<&Path> {
        self.web_tests().ok_or(ConfigError::NoWebTests)
    }

    /// Whether the ports come from the file rather than the built-in table.
    pub fn has_configured_ports(&self) -> bool {
        !self.ports.is_empty()
    }

    /// Configured ports, or the built-in table when none are configured.
    pub fn ports(&self) -> Vec<PortSpec> {
        if self.ports.is_empty() {
            builtin_ports()
        } else {
            self.ports.clone()
        }
    }

    /// The ports named in `names`, matched by name or display name. An empty
    /// list selects every port.
    pub fn select_ports(&self, names: &[String]) -> ConfigResult<Vec<PortSpec>> {
        let ports = self.ports();
        if names.is_empty() {
            return Ok(ports);
        }

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let spec = ports
                .iter()
                .find(|p| p.display_name() == *name || p.name == *name)
                .ok_or_else(|| ConfigError::UnknownPort {
                    port: name.clone(),
                    known: ports.iter().map(PortSpec::display_name).collect::<Vec<_>>().join(", "),
                })?;
            if !selected.contains(spec) {
                selected.push(spec.clone());
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = "\
[web_tests]
directory = /src/web_tests

[port.linux]
os = Linux
fallback = linux

[port.mac14]
os = mac
fallback = mac-mac14, mac

[port.highdpi]
os = linux
fallback = linux
flag_specific = highdpi
unknown_key = ignored
";

    fn parse(content: &str) -> ConfigResult<OptimizerConfig> {
        OptimizerConfig::parse(Path::new("config.ini"), content)
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(CONFIG).unwrap();
        assert_eq!(config.web_tests(), Some(Path::new("/src/web_tests")));
        assert!(config.has_configured_ports());
        assert_eq!(
            config.ports(),
            vec![
                PortSpec::new("linux", "linux", &["linux"]),
                PortSpec::new("mac14", "mac", &["mac-mac14", "mac"]),
                PortSpec::new("highdpi", "linux", &["linux"]).with_flag_specific("highdpi"),
            ]
        );
    }

    #[test]
    fn test_builtin_ports_when_none_configured() {
        let config = parse("[web_tests]\ndirectory = /w\n").unwrap();
        assert!(!config.has_configured_ports());
        let names: Vec<String> = config.ports().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["linux", "mac14", "mac15", "win10.20h2", "win11"]);
    }

    #[test]
    fn test_port_without_os_is_error() {
        let result = parse("[port.bare]\nfallback = linux\n");
        assert!(matches!(result, Err(ConfigError::MissingOs { port }) if port == "bare"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = OptimizerConfig::load(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert!(matches!(config.require_web_tests(), Err(ConfigError::NoWebTests)));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, CONFIG).unwrap();
        let config = OptimizerConfig::load(&path).unwrap();
        assert_eq!(config.require_web_tests().unwrap(), Path::new("/src/web_tests"));
    }

    #[test]
    fn test_builders_override() {
        let config = OptimizerConfig::default()
            .with_web_tests("/w")
            .with_port(PortSpec::new("win11", "win", &["win"]));
        assert_eq!(config.web_tests(), Some(Path::new("/w")));
        assert_eq!(config.ports().len(), 1);
    }

    #[test]
    fn test_select_ports() {
        let config = parse(CONFIG).unwrap();
        let selected = config
            .select_ports(&[
                "highdpi:highdpi".to_string(),
                "linux".to_string(),
                "linux".to_string(),
            ])
            .unwrap();
        let names: Vec<String> = selected.iter().map(PortSpec::display_name).collect();
        assert_eq!(names, vec!["highdpi:highdpi", "linux"]);

        assert_eq!(config.select_ports(&[]).unwrap().len(), 3);
        assert!(matches!(
            config.select_ports(&["fuchsia".to_string()]),
            Err(ConfigError::UnknownPort { .. })
        ));
    }

    #[test]
    fn test_config_file_path_name() {
        let path = config_file_path();
        assert!(path.ends_with("baseliner/config.ini"));
    }
}
