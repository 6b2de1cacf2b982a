use anyhow::{anyhow, Result};
use aws_config::{imds::credentials::ImdsCredentialsProvider, BehaviorVersion, SdkConfig};
use aws_sdk_ec2::{
  config::{self, retry::RetryConfig, Credentials as StaticCredentials},
  error::DisplayErrorContext,
  Client,
};
use aws_types::region::Region;
use regex_lite::Regex;
use tracing::{debug, warn};

use crate::{
  credentials::Credentials,
  imds::Imds,
  resolver::{Connector, CredentialSource},
};

/// Default number of attempts made by the EC2 client for each request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Name reported by the static credentials provider
const STATIC_PROVIDER_NAME: &str = "ec2-connect";

/// Check that the region is shaped like an EC2 region name (`us-east-1`, `us-gov-west-1`, `us-isob-east-1`)
pub fn validate_region(region: &str) -> Result<()> {
  let re = Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$")?;
  match re.is_match(region) {
    true => Ok(()),
    false => Err(anyhow!("{region} is not a valid EC2 region")),
  }
}

/// A live EC2 client and the settings it was built with
#[derive(Clone, Debug)]
pub struct Ec2Connection {
  client: Client,
  region: String,
  source: CredentialSource,
}

impl Ec2Connection {
  pub fn client(&self) -> &Client {
    &self.client
  }

  pub fn region(&self) -> &str {
    &self.region
  }

  pub fn source(&self) -> &CredentialSource {
    &self.source
  }

  pub fn into_client(self) -> Client {
    self.client
  }
}

/// [`Connector`] backed by `aws-config` and `aws-sdk-ec2`
#[derive(Clone, Debug)]
pub struct Ec2Connector {
  imds: Imds,
  max_attempts: u32,
  verify: bool,
}

impl Ec2Connector {
  /// The IMDS configuration is reused by the instance profile credentials provider
  pub fn new(imds: Imds) -> Self {
    Self {
      imds,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      verify: false,
    }
  }

  /// Set max attempts for requests made by the EC2 client
  pub fn max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  /// Issue `DescribeRegions` after connecting and treat any error as a failed connection
  pub fn verify(mut self, verify: bool) -> Self {
    self.verify = verify;
    self
  }

  fn region(region: &str) -> Option<Region> {
    match validate_region(region) {
      Ok(()) => Some(Region::new(region.to_owned())),
      Err(err) => {
        warn!("{err}");
        None
      }
    }
  }

  /// Build the EC2 client from the shared configuration
  async fn finish(&self, config: SdkConfig, region: &str, source: CredentialSource) -> Option<Ec2Connection> {
    if config.credentials_provider().is_none() {
      warn!("No credentials provider configured for {} credentials", source.kind());
      return None;
    }

    let client = Client::from_conf(
      // Start with the shared environment configuration
      config::Builder::from(&config)
        .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts))
        .build(),
    );

    if self.verify {
      let request = client.describe_regions().region_names(region);
      match request.send().await {
        Ok(_) => debug!("Verified connection to EC2 in {region}"),
        Err(err) => {
          warn!("Unable to verify connection to EC2 in {region}: {}", DisplayErrorContext(&err));
          return None;
        }
      }
    }

    Some(Ec2Connection {
      client,
      region: region.to_owned(),
      source,
    })
  }
}

impl Connector for Ec2Connector {
  type Connection = Ec2Connection;

  async fn static_credentials(&self, region: &str, credentials: &Credentials) -> Option<Ec2Connection> {
    let aws_region = Ec2Connector::region(region)?;
    let provider = StaticCredentials::new(
      credentials.access_key(),
      credentials.secret_key(),
      None,
      None,
      STATIC_PROVIDER_NAME,
    );

    let config = aws_config::defaults(BehaviorVersion::latest())
      .region(aws_region)
      .credentials_provider(provider)
      .load()
      .await;

    let source = CredentialSource::Static {
      credentials: credentials.clone(),
    };
    self.finish(config, region, source).await
  }

  async fn instance_profile(&self, region: &str, profile_arn: Option<&str>) -> Option<Ec2Connection> {
    let aws_region = Ec2Connector::region(region)?;
    let imds = match self.imds.client() {
      Ok(imds) => imds,
      Err(err) => {
        warn!("{err}");
        return None;
      }
    };

    // The role is discovered by the provider; the instance profile ARN is not a role name
    let provider = ImdsCredentialsProvider::builder().imds_client(imds).build();
    let config = aws_config::defaults(BehaviorVersion::latest())
      .region(aws_region)
      .credentials_provider(provider)
      .load()
      .await;

    let source = CredentialSource::InstanceProfile {
      profile_arn: profile_arn.map(str::to_owned),
    };
    self.finish(config, region, source).await
  }

  async fn default_chain(&self, region: &str) -> Option<Ec2Connection> {
    let aws_region = Ec2Connector::region(region)?;
    let config = aws_config::defaults(BehaviorVersion::latest())
      .region(aws_region)
      .load()
      .await;

    self.finish(config, region, CredentialSource::Default).await
  }
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  #[rstest]
  #[case("us-east-1")]
  #[case("us-west-2")]
  #[case("eu-central-2")]
  #[case("ap-southeast-4")]
  #[case("us-gov-west-1")]
  #[case("us-isob-east-1")]
  #[case("cn-northwest-1")]
  fn it_accepts_region(#[case] region: &str) {
    assert!(validate_region(region).is_ok());
  }

  #[rstest]
  #[case("")]
  #[case("us-east")]
  #[case("us-west-2b")]
  #[case("US-EAST-1")]
  #[case("mars-north-1")]
  #[case("not-a-region")]
  fn it_rejects_region(#[case] region: &str) {
    assert!(validate_region(region).is_err());
  }

  fn connector() -> Ec2Connector {
    Ec2Connector::new(Imds::builder().endpoint("http://127.0.0.1:1").build())
  }

  #[tokio::test]
  async fn it_yields_no_connection_for_an_invalid_region() {
    let connector = connector();
    let credentials = Credentials::from_parts(Some("AKIAEXAMPLE"), Some("secret")).unwrap().unwrap();

    assert!(connector.static_credentials("not-a-region", &credentials).await.is_none());
    assert!(connector.instance_profile("not-a-region", None).await.is_none());
    assert!(connector.default_chain("not-a-region").await.is_none());
  }

  #[tokio::test]
  async fn it_connects_with_static_credentials() {
    let credentials = Credentials::from_parts(Some("AKIAEXAMPLE"), Some("secret")).unwrap().unwrap();
    let connection = connector().static_credentials("us-west-2", &credentials).await.unwrap();

    assert_eq!(connection.region(), "us-west-2");
    assert_eq!(connection.source().kind(), "static");
    assert_eq!(
      connection.client().config().region().map(|r| r.as_ref()),
      Some("us-west-2")
    );
  }

  #[tokio::test]
  async fn it_connects_with_the_instance_profile() {
    let arn = "arn:aws:iam::123:instance-profile/x";
    let connection = connector().instance_profile("us-west-2", Some(arn)).await.unwrap();

    assert_eq!(
      connection.source(),
      &CredentialSource::InstanceProfile {
        profile_arn: Some(arn.to_string())
      }
    );
  }

  #[tokio::test]
  async fn it_connects_with_the_default_chain() {
    let connection = connector().default_chain("us-east-1").await.unwrap();

    assert_eq!(connection.region(), "us-east-1");
    assert_eq!(connection.source(), &CredentialSource::Default);
  }

  #[test]
  fn it_clamps_max_attempts() {
    let connector = connector().max_attempts(0);
    assert_eq!(connector.max_attempts, 1);
  }
}
