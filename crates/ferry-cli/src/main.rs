//! Ferry - run the bundled migrators from the command line.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ferry_cli::{demo, run_from_command_line, Args};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    // Logs go to stderr so reports on stdout stay parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ferry=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run_from_command_line(&demo::namespace(), demo::polls_schema(), &args, &mut out) {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!(error = %e, "migration run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
