//! dirq: query a directory server and print the entries beneath a base DN.

use clap::Parser;
use dirq_core::Result;
use dirq_directory::{render, ConnectionConfig, DirectoryClient, SearchCriteria};
use std::process::ExitCode;
use tracing::debug;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            // Empty output means nothing found; scripted callers depend on that.
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("dirq: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let mut config = ConnectionConfig::new(cli.url, cli.bind_dn, cli.password, &cli.base_dn)?;
    if cli.no_tls_verify {
        config = config.with_tls_verification(false);
    }
    if let Some(path) = cli.tls_ca_cert {
        config = config.with_tls_ca_cert(path);
    }
    if let Some(seconds) = cli.connect_timeout {
        config = config.with_connection_timeout_secs(seconds);
    }
    if let Some(seconds) = cli.operation_timeout {
        config = config.with_operation_timeout_secs(seconds);
    }

    let criteria = SearchCriteria::from_config(&config)
        .with_size_limit(cli.size_limit)
        .with_time_limit(cli.time_limit);
    debug!(url = config.url(), base_dn = criteria.base_dn().as_str(), "starting query");

    let client = DirectoryClient::new(config);
    let entries = client.execute(&criteria).await?;
    debug!(count = entries.len(), "search complete");

    Ok(render(&entries, cli.indent))
}
