pub mod cli;
pub mod commands;
pub mod credentials;
pub mod ec2;
pub mod error;
pub mod imds;
pub mod resolver;

pub use cli::{Cli, Commands};
pub use credentials::Credentials;
pub use ec2::{Ec2Connection, Ec2Connector};
pub use error::Error;
pub use imds::{Imds, InstanceMetadata, MetadataSource};
pub use resolver::{ConnectionResolver, Connector, CredentialSource, Resolution};

/// Connect to EC2 using the default IMDS and EC2 client settings
///
/// Credentials are taken from the supplied keys, then the instance profile (when running on EC2),
/// then the SDK default credential chain. `default_region` is used unless instance metadata reports the
/// availability zone the instance runs in.
pub async fn connect_to_ec2(
  default_region: &str,
  access_key: Option<&str>,
  secret_key: Option<&str>,
) -> Result<Ec2Connection, Error> {
  let imds = Imds::default();
  let resolver = ConnectionResolver::new(imds.clone(), Ec2Connector::new(imds));

  resolver.connect(default_region, access_key, secret_key).await
}
