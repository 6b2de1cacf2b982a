use anstyle::{AnsiColor, Color, Style};
use clap::{builder::Styles, Args, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use tokio::time::Duration;

use crate::{commands, imds, Imds};

/// Styles for CLI
fn get_styles() -> Styles {
  Styles::styled()
    .header(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .literal(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan))))
    .usage(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
    .placeholder(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
    )
}

#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(propagate_version = true)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Disable colored log output
  #[arg(long, global = true)]
  pub no_color: bool,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Resolve credentials and region, then connect to EC2
  Connect(commands::connect::ConnectInput),

  /// Show the region and credential source that would be used, without connecting
  Resolve(commands::resolve::ResolveInput),

  /// Print the instance metadata consulted when resolving credentials and region
  Metadata(commands::metadata::MetadataInput),
}

/// Settings shared by every command that resolves a connection
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
  /// Region used when instance metadata does not provide one
  #[arg(long, env, default_value = "us-east-1")]
  pub region: String,

  /// AWS access key ID; must be supplied together with the secret key
  #[arg(long, env)]
  pub access_key: Option<String>,

  /// AWS secret access key; must be supplied together with the access key
  #[arg(long, env, hide_env_values = true)]
  pub secret_key: Option<String>,

  /// Timeout in seconds applied to each instance metadata request
  #[arg(long, default_value_t = imds::DEFAULT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
  pub metadata_timeout: u64,

  /// Attempts made for each instance metadata request
  #[arg(long, default_value_t = imds::DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
  pub metadata_attempts: u32,

  /// Override the instance metadata service endpoint
  #[arg(long, env)]
  pub imds_endpoint: Option<String>,
}

impl ConnectionArgs {
  pub fn imds(&self) -> Imds {
    let mut imds = Imds::builder()
      .timeout(Duration::from_secs(self.metadata_timeout))
      .max_attempts(self.metadata_attempts);

    if let Some(endpoint) = &self.imds_endpoint {
      imds = imds.endpoint(endpoint);
    }

    imds.build()
  }
}
