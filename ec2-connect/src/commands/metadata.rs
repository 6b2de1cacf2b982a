use anyhow::Result;
use clap::Args;

use crate::{cli::ConnectionArgs, MetadataSource};

#[derive(Args, Debug)]
pub struct MetadataInput {
  #[clap(flatten)]
  pub connection: ConnectionArgs,
}

impl MetadataInput {
  /// Prints `null` when the metadata service is unreachable
  pub async fn result(&self) -> Result<()> {
    let metadata = self.connection.imds().fetch().await;

    println!("{}", serde_json::to_string_pretty(&metadata)?);

    Ok(())
  }
}
