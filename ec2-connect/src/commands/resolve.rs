use anyhow::Result;
use clap::Args;

use crate::{cli::ConnectionArgs, ConnectionResolver, Resolution};

#[derive(Args, Debug)]
pub struct ResolveInput {
  #[clap(flatten)]
  pub connection: ConnectionArgs,
}

impl ResolveInput {
  pub async fn resolve(&self) -> Result<Resolution> {
    // Resolving never connects, so no connector is needed
    let resolver = ConnectionResolver::new(self.connection.imds(), ());

    let resolution = resolver
      .resolve(
        &self.connection.region,
        self.connection.access_key.as_deref(),
        self.connection.secret_key.as_deref(),
      )
      .await?;

    Ok(resolution)
  }

  pub async fn result(&self) -> Result<()> {
    let resolution = self.resolve().await?;

    println!("{}", serde_json::to_string_pretty(&resolution)?);

    Ok(())
  }
}
