//! The `optimize` command.

use std::sync::Arc;

use baseliner::discovery::expand_tests;
use baseliner::manifest::FsReferenceTests;
use baseliner::optimizer::{BaselineOptimizer, BaselineWriter, CheckWriter, FsWriter};
use baseliner::port::PortFactory;
use baseliner::{OptimizeReport, RunStatus};
use clap::Args;
use console::style;
use tracing::{error, info, warn};

use super::common::{resolve_suffixes, GlobalArgs, SuffixArg};
use crate::error::CliError;

/// Arguments of `baseliner optimize`.
#[derive(Debug, Args)]
pub struct OptimizeArgs {
    /// Report the changes without touching any file; exit 1 if there are any
    #[arg(long)]
    pub check: bool,

    /// Baseline kinds to optimize (default: all)
    #[arg(long, value_enum, value_name = "KIND")]
    pub suffix: Vec<SuffixArg>,

    /// Only consider these ports (default: all configured)
    #[arg(long, value_name = "NAME")]
    pub port: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Tests to optimize, relative to the web tests directory. Glob patterns
    /// are expanded.
    #[arg(required = true, value_name = "TEST")]
    pub tests: Vec<String>,
}

/// Run the optimizer over every selected test and suffix.
///
/// A pass that fails is recorded in the report and the run continues with
/// the next one.
pub fn run(args: OptimizeArgs, global: &GlobalArgs) -> Result<RunStatus, CliError> {
    let config = global.load_config()?;
    let web_tests = config.require_web_tests()?;
    let specs = config.select_ports(&args.port)?;

    let factory = PortFactory::new(web_tests)?;
    let ports = factory.create_all(&specs);
    let references = Arc::new(FsReferenceTests::new(web_tests));
    let optimizer = BaselineOptimizer::new(ports, references)?;

    let tests = expand_tests(web_tests, &args.tests)?;
    if tests.is_empty() {
        warn!("No tests matched");
        return Ok(RunStatus::Clean);
    }
    let suffixes = resolve_suffixes(&args.suffix);
    info!(
        tests = tests.len(),
        ports = specs.len(),
        check = args.check,
        "Starting baseline optimization"
    );

    let writer: &dyn BaselineWriter = if args.check { &CheckWriter } else { &FsWriter };
    let mut report = OptimizeReport::new(args.check);
    for test in &tests {
        for &suffix in &suffixes {
            match optimizer.optimize(test, suffix, writer) {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(test = %test, suffix = %suffix, error = %e, "Optimization failed");
                    report.record_failure(test, suffix, &e);
                }
            }
        }
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(report.status())
}

fn print_report(report: &OptimizeReport) {
    print!("{}", report.render_text());

    match report.status() {
        RunStatus::Clean => println!("{}", style("✓ Nothing to do").green()),
        RunStatus::Changed => println!("{}", style("✓ Baselines optimized").green()),
        RunStatus::PendingChanges => println!(
            "{}",
            style("Baselines can be optimized; rerun without --check to apply").yellow()
        ),
        RunStatus::Failed => println!("{}", style("✗ Some passes failed").red().bold()),
    }
}
