use std::process;

use anyhow::Result;
use clap::Parser;
use ec2_connect::{Cli, Commands, Error};
use tracing::error;
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_ansi(!cli.no_color)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  let result = match &cli.command {
    Commands::Connect(input) => input.result().await,
    Commands::Resolve(input) => input.result().await,
    Commands::Metadata(input) => input.result().await,
  };

  // A missing connection is unrecoverable for anything started from the CLI
  if let Err(err) = &result {
    if let Some(Error::ConnectionFailure { .. }) = err.downcast_ref::<Error>() {
      error!("{err}");
      process::exit(1);
    }
  }

  result
}
