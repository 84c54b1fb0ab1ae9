//! Baseliner - web test baseline optimizer
//!
//! Web tests compare their output against `-expected` baseline files that
//! live in a fallback tree: platform directories, flag-specific directories,
//! and virtual suite directories layered over a generic location. Over time
//! the tree accumulates copies that are identical to what the runner would
//! find anyway. This library finds them and removes them, and promotes
//! values shared by every platform into the generic location, without
//! changing which baseline any port resolves for any test.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use baseliner::manifest::FsReferenceTests;
//! use baseliner::optimizer::{BaselineOptimizer, BaselineSuffix, FsWriter};
//! use baseliner::port::{PortFactory, PortSpec};
//!
//! let factory = PortFactory::new("/src/web_tests")?;
//! let ports = factory.create_all(&[PortSpec::new("linux", "linux", &["linux"])]);
//! let references = Arc::new(FsReferenceTests::new("/src/web_tests"));
//! let optimizer = BaselineOptimizer::new(ports, references)?;
//! optimizer.optimize("fast/dom/a.html", BaselineSuffix::Txt, &FsWriter)?;
//! ```

pub mod config;
pub mod digest;
pub mod discovery;
pub mod error;
pub mod expectations;
pub mod location;
pub mod logging;
pub mod manifest;
pub mod optimizer;
pub mod paths;
pub mod port;
pub mod report;
pub mod testharness;

pub use error::{OptimizerError, OptimizerResult};
pub use location::BaselineLocation;
pub use optimizer::{BaselineOptimizer, BaselineSuffix, OptimizeOutcome};
pub use report::{OptimizeReport, RunStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
