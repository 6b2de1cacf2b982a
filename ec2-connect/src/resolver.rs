use std::future::Future;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{credentials::Credentials, error::Error, imds::MetadataSource};

/// The connection constructor selected by the resolver
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CredentialSource {
  /// Caller-supplied access key pair
  Static { credentials: Credentials },
  /// Instance profile attached to the host
  ///
  /// The profile ARN is passed through as found in the instance metadata, and may be absent
  InstanceProfile { profile_arn: Option<String> },
  /// Environment variables, shared config/credential files, and the rest of the SDK default chain
  Default,
}

impl CredentialSource {
  pub fn kind(&self) -> &'static str {
    match self {
      CredentialSource::Static { .. } => "static",
      CredentialSource::InstanceProfile { .. } => "instance-profile",
      CredentialSource::Default => "default",
    }
  }
}

/// Outcome of the credential and region decision, before connecting
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
  pub region: String,
  pub source: CredentialSource,
}

/// Constructs provider connections, one constructor per credential mechanism
///
/// A constructor returns `None` when it cannot produce a usable connection.
pub trait Connector {
  type Connection;

  fn static_credentials(
    &self,
    region: &str,
    credentials: &Credentials,
  ) -> impl Future<Output = Option<Self::Connection>> + Send;

  fn instance_profile(
    &self,
    region: &str,
    profile_arn: Option<&str>,
  ) -> impl Future<Output = Option<Self::Connection>> + Send;

  fn default_chain(&self, region: &str) -> impl Future<Output = Option<Self::Connection>> + Send;
}

/// Selects credentials and region, then connects
///
/// Order of precedence:
/// 1. Explicit access key pair
/// 2. Instance profile, when instance metadata is available
/// 3. SDK default credential chain
///
/// When instance metadata carries a well formed availability zone, its region replaces the default region
/// regardless of which credentials are used.
#[derive(Debug)]
pub struct ConnectionResolver<M, C> {
  metadata: M,
  connector: C,
}

impl<M, C> ConnectionResolver<M, C> {
  pub fn new(metadata: M, connector: C) -> Self {
    Self { metadata, connector }
  }
}

impl<M: MetadataSource, C> ConnectionResolver<M, C> {
  /// Decide the region and credential source without connecting
  ///
  /// Fetches instance metadata exactly once. Metadata failures are never returned; only invalid
  /// arguments are.
  pub async fn resolve(
    &self,
    default_region: &str,
    access_key: Option<&str>,
    secret_key: Option<&str>,
  ) -> Result<Resolution, Error> {
    if default_region.is_empty() {
      return Err(Error::InvalidArgument("default region must not be empty".to_string()));
    }
    let credentials = Credentials::from_parts(access_key, secret_key)?;

    info!("Connecting to AWS EC2 in {default_region}");

    let metadata = self.metadata.fetch().await;
    let mut region = default_region.to_owned();

    if let Some(metadata) = &metadata {
      match metadata.region() {
        Some(zone_region) => {
          info!("Using region {zone_region} from instance metadata");
          region = zone_region.to_owned();
        }
        None => debug!("No usable availability zone in instance metadata, keeping {default_region}"),
      }
    }

    let source = match (credentials, metadata) {
      (Some(credentials), _) => {
        info!("Connecting using supplied credentials");
        CredentialSource::Static { credentials }
      }
      (None, Some(metadata)) => {
        let profile_arn = metadata.instance_profile_arn().map(str::to_owned);
        match &profile_arn {
          Some(arn) => info!("Connecting using instance profile {arn}"),
          None => info!("Connecting using instance profile"),
        }
        CredentialSource::InstanceProfile { profile_arn }
      }
      (None, None) => {
        info!("Connecting using env vars or the default credential chain");
        CredentialSource::Default
      }
    };

    Ok(Resolution { region, source })
  }
}

impl<M: MetadataSource, C: Connector> ConnectionResolver<M, C> {
  /// Resolve, then connect using the selected constructor
  ///
  /// Returns [`Error::ConnectionFailure`] rather than exiting; translating that into a process exit is
  /// left to the binary.
  pub async fn connect(
    &self,
    default_region: &str,
    access_key: Option<&str>,
    secret_key: Option<&str>,
  ) -> Result<C::Connection, Error> {
    let Resolution { region, source } = self.resolve(default_region, access_key, secret_key).await?;

    let connection = match &source {
      CredentialSource::Static { credentials } => self.connector.static_credentials(&region, credentials).await,
      CredentialSource::InstanceProfile { profile_arn } => {
        self.connector.instance_profile(&region, profile_arn.as_deref()).await
      }
      CredentialSource::Default => self.connector.default_chain(&region).await,
    };

    connection.ok_or_else(|| {
      error!("An error occurred when connecting to EC2");
      Error::ConnectionFailure {
        region,
        source_kind: source.kind(),
      }
    })
  }
}
