//! Test runner configurations.
//!
//! A port is one (OS/version, optional flag-specific) configuration of the
//! test runner. The optimizer asks each port three things: where it searches
//! for baselines, which virtual suites exist, and whether it skips a test.
//!
//! ```ignore
//! use baseliner::port::{PortFactory, PortSpec};
//!
//! let factory = PortFactory::new("/src/web_tests")?;
//! let ports = factory.create_all(&[PortSpec::new("win11", "win", &["win"])]);
//! ```

mod configured;
mod factory;
mod types;
pub mod virtual_suites;

pub use configured::ConfiguredPort;
pub use factory::PortFactory;
pub use types::{Port, PortSpec};
pub use virtual_suites::{VirtualTestSuite, VirtualTestSuites};
