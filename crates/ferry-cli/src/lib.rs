//! Ferry command-line entry point.
//!
//! Lists or runs the migrators of a namespace against a target store, with
//! source databases given on the command line.

pub mod demo;
pub mod error;
pub mod formatter;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ferry_core::storage::DEFAULT_DATA_PATH;
use ferry_core::{
    discover, plan, Driver, Error, FerryConfig, MigrationContext, Namespace, SchemaBundle,
    SourceSpec, StorageEngine,
};

pub use error::CliError;
pub use formatter::{create_formatter, Formatter, OutputFormat};

/// Ferry command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about = "Run dependency-ordered data migrations")]
pub struct Args {
    /// List registered migrators and exit
    #[arg(long)]
    pub list: bool,

    /// Migrators to run, all of them when none are given
    #[arg(value_name = "MIGRATOR")]
    pub units: Vec<String>,

    /// Path to the target store directory
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Source database, as NAME=PATH or PATH for the default connection
    #[arg(short, long = "source", value_name = "NAME=PATH", value_parser = parse_source)]
    pub sources: Vec<SourceSpec>,

    /// Roll back every migrator after it runs
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

fn parse_source(spec: &str) -> Result<SourceSpec, String> {
    SourceSpec::parse(spec).map_err(|e| e.to_string())
}

impl Args {
    /// Build the run configuration.
    pub fn to_config(&self) -> FerryConfig {
        let mut config = FerryConfig::new(self.data_path.clone()).with_dry_run(self.dry_run);
        config.sources = self.sources.clone();
        config
    }
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Everything requested ran.
    Success,
    /// The run was refused or stopped; the reason has been written out.
    Failed,
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => std::process::ExitCode::SUCCESS,
            ExitStatus::Failed => std::process::ExitCode::FAILURE,
        }
    }
}

/// Execute one command against `namespace`, writing the report to `out`.
///
/// Unknown migrator names and validation failures are reported to `out` and
/// yield [`ExitStatus::Failed`]. Other errors are returned.
pub fn run_from_command_line(
    namespace: &Namespace,
    schema: SchemaBundle,
    args: &Args,
    out: &mut dyn Write,
) -> Result<ExitStatus, CliError> {
    let registry = discover(namespace)?;
    let formatter = create_formatter(args.format);

    if args.list {
        out.write_all(formatter.format_unit_list(&registry.names()).as_bytes())?;
        return Ok(ExitStatus::Success);
    }

    // Names and ordering are checked before the store or any source is opened
    match plan(&registry, &args.units) {
        Ok(_) => {}
        Err(Error::UnknownUnit(name)) => {
            error!(migrator = %name, "unknown migrator");
            out.write_all(formatter.format_unknown_unit(&name).as_bytes())?;
            return Ok(ExitStatus::Failed);
        }
        Err(e) => return Err(e.into()),
    }

    let config = args.to_config();
    info!(
        data_path = %config.storage.path.display(),
        sources = config.sources.len(),
        dry_run = config.dry_run,
        "configuration loaded"
    );

    let engine = StorageEngine::open(config.storage.clone())?;
    let version = engine.catalog().ensure_schema(schema)?;
    info!(schema_version = version, "target store opened");

    let connections = config.open_sources()?;
    let ctx = MigrationContext::new(&engine, &connections).with_dry_run(config.dry_run);
    let driver = Driver::new(&registry, ctx);

    let result = if formatter.shows_progress() {
        driver.run(&args.units, out)
    } else {
        driver.run(&args.units, &mut io::sink())
    };
    engine.flush()?;

    match result {
        Ok(summary) => {
            out.write_all(formatter.format_summary(&summary).as_bytes())?;
            Ok(ExitStatus::Success)
        }
        Err(Error::UnknownUnit(name)) => {
            error!(migrator = %name, "unknown migrator");
            out.write_all(formatter.format_unknown_unit(&name).as_bytes())?;
            Ok(ExitStatus::Failed)
        }
        Err(Error::Validation(failure)) => {
            error!(object = %failure.record.identity(), "validation failed");
            out.write_all(formatter.format_validation_failure(&failure).as_bytes())?;
            Ok(ExitStatus::Failed)
        }
        Err(e) => Err(e.into()),
    }
}
