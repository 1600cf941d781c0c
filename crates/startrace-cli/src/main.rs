//! Startrace demonstration client.
//!
//! Loads a dataset's language labels, runs a fixed sequence of sample
//! queries against a bitmap index server and prints the results.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use startrace_query::{ClientConfig, HttpTransport, Uri};

mod dataset;
mod report;

#[derive(Parser, Debug)]
#[command(name = "startrace")]
#[command(author, version, about = "Sample star-trace queries against a bitmap index server")]
struct Cli {
    /// Dataset directory containing `languages.txt`.
    dataset: PathBuf,

    /// Server address as `[scheme://][host][:port]` (default `:10101`, or `STARTRACE_ADDRESS`).
    address: Option<String>,

    /// Connection timeout in seconds.
    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    /// Whole-request timeout in seconds.
    #[arg(long)]
    request_timeout_secs: Option<u64>,
}

impl Cli {
    /// Apply the command-line overrides on top of `config`.
    fn client_config(&self, mut config: ClientConfig) -> Result<ClientConfig> {
        if let Some(address) = &self.address {
            config.uri = Uri::from_address(address)?;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = ClientConfig::from_env().context("invalid client environment")?;
    let config = cli.client_config(config)?;
    tracing::info!(uri = %config.uri, "connecting");
    let client = HttpTransport::new(&config).context("failed to build http client")?;
    let languages = dataset::load_language_names(&cli.dataset)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::run_queries(&client, &languages, &mut out)?;
    out.flush()?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
