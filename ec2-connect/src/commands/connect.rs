use anyhow::Result;
use clap::Args;

use crate::{cli::ConnectionArgs, ec2, ConnectionResolver, Ec2Connection, Ec2Connector};

#[derive(Args, Debug)]
pub struct ConnectInput {
  #[clap(flatten)]
  pub connection: ConnectionArgs,

  /// Call `DescribeRegions` to confirm the connection is usable
  #[arg(long)]
  pub verify: bool,

  /// Max attempts for requests made by the EC2 client
  #[arg(long, default_value_t = ec2::DEFAULT_MAX_ATTEMPTS)]
  pub max_attempts: u32,
}

impl ConnectInput {
  pub async fn connect(&self) -> Result<Ec2Connection> {
    let imds = self.connection.imds();
    let connector = Ec2Connector::new(imds.clone())
      .max_attempts(self.max_attempts)
      .verify(self.verify);
    let resolver = ConnectionResolver::new(imds, connector);

    let connection = resolver
      .connect(
        &self.connection.region,
        self.connection.access_key.as_deref(),
        self.connection.secret_key.as_deref(),
      )
      .await?;

    Ok(connection)
  }

  pub async fn result(&self) -> Result<()> {
    let connection = self.connect().await?;

    println!(
      "Connected to EC2 in {} using {} credentials",
      connection.region(),
      connection.source().kind()
    );

    Ok(())
  }
}
