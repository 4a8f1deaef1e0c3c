//! Database connectivity probe.
//!
//! Reads a properties file, echoes it, connects to the configured database,
//! runs the configured query once and prints how long each step took.
//!
//! # Exit Status
//! - 0: probe ran, even if connecting or querying failed (unless `--strict`)
//! - 1: configuration could not be read, no driver, or `--strict` and the probe failed
//! - 2: usage error

use clap::{Args, Parser, ValueEnum};
use dbprobe_core::{
    DiagnosticsConfig, DriverRegistry, EchoMode, LoggingConfig, ProbeConfig, ProbeError,
    Properties, Prober, echo_properties, init_logging,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dbprobe")]
#[command(about = "Single-shot database connectivity probe")]
#[command(version)]
#[command(long_about = "
dbprobe - check that a database is reachable and answers a query

The properties file holds the connection settings:

  url=jdbc:postgresql://db.example.com:5432/app
  user=app
  password=secret
  query=SELECT 1
  diagnosability=false
  oracle.net.tns_admin=/opt/oracle/network/admin

The file is echoed, then the time to connect and the time to execute the
query are printed, followed by the first column of the first row.

SUPPORTED DATABASES:
- PostgreSQL (postgres://, postgresql://)
- SQLite (sqlite:<path>, sqlite::memory:)
- MySQL / MariaDB (mysql://, mariadb://) [if compiled with --features mysql]
- Oracle (oracle:thin:@..., oracle://) [if compiled with --features oracle]

A leading jdbc: prefix is accepted on every URL.
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Properties file with the connection settings
    #[arg(value_name = "PROPERTIES_FILE")]
    pub properties_file: PathBuf,

    /// How to echo the loaded properties
    #[arg(
        long,
        value_enum,
        env = "DBPROBE_ECHO",
        default_value_t = Echo::Full,
        help = "Echo properties in full, with password and URL secrets masked, or not at all"
    )]
    pub echo: Echo,

    /// Fail the run when the probe fails
    #[arg(
        long,
        env = "DBPROBE_STRICT",
        help = "Exit with status 1 when connecting or querying fails"
    )]
    pub strict: bool,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Echo {
    Full,
    Redacted,
    Off,
}

impl From<Echo> for EchoMode {
    fn from(echo: Echo) -> Self {
        match echo {
            Echo::Full => Self::Full,
            Echo::Redacted => Self::Redacted,
            Echo::Off => Self::Off,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let properties = Properties::load(&cli.properties_file).await?;

    let mut stdout = std::io::stdout();
    echo_properties(&properties, cli.echo.into(), &mut stdout)
        .map_err(|e| ProbeError::io("Failed to write to standard output", e))?;

    init_logging(&LoggingConfig {
        verbose: cli.global.verbose,
        quiet: cli.global.quiet,
        diagnostics: DiagnosticsConfig::from_properties(&properties),
    })?;

    let config = ProbeConfig::from_properties(&properties)?;
    let registry = DriverRegistry::with_default_drivers();

    match Prober::new(&registry).run(&config, &mut stdout).await? {
        Ok(summary) => {
            tracing::debug!(
                "Probe succeeded (connect {}, query {})",
                summary.connect_time,
                summary.query_time
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            let stage = failure.stage;
            eprintln!("{:?}", anyhow::Error::new(failure));
            if cli.strict {
                tracing::debug!("{stage} failed in strict mode");
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
