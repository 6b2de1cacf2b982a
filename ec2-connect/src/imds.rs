use std::future::Future;

use anyhow::{anyhow, Result};
use aws_config::imds::client::{error::ImdsError, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::time::Duration;
use tracing::debug;

/// Path of the availability zone the instance is placed in
pub const AVAILABILITY_ZONE_PATH: &str = "/latest/meta-data/placement/availability-zone";

/// Path of the IAM instance profile document (JSON)
///
/// Only present when an instance profile is attached to the instance
pub const IAM_INFO_PATH: &str = "/latest/meta-data/iam/info";

/// Default connect and read timeout for metadata requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Initial request plus a single retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Best-effort snapshot of the instance metadata
///
/// Stored as the nested mapping served by IMDS, for example:
///
/// ```json
/// {
///   "iam": { "info": { "InstanceProfileArn": "arn:aws:iam::123456789012:instance-profile/x" } },
///   "placement": { "availability-zone": "us-west-2b" }
/// }
/// ```
///
/// Every lookup is optional; a missing key never fails the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceMetadata(Value);

impl InstanceMetadata {
  pub fn new(value: Value) -> Self {
    Self(value)
  }

  /// Walk the nested mapping, returning `None` at the first missing key
  pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
    path.iter().try_fold(&self.0, |value, key| value.get(key))
  }

  /// `iam.info.InstanceProfileArn`
  pub fn instance_profile_arn(&self) -> Option<&str> {
    self.lookup(&["iam", "info", "InstanceProfileArn"])?.as_str()
  }

  /// `placement.availability-zone`
  pub fn availability_zone(&self) -> Option<&str> {
    self.lookup(&["placement", "availability-zone"])?.as_str()
  }

  /// Region derived from the availability zone, if the zone is present and well formed
  pub fn region(&self) -> Option<&str> {
    region_from_availability_zone(self.availability_zone()?)
  }
}

/// Strip the trailing zone letter from an availability zone (`us-west-2b` -> `us-west-2`)
///
/// Returns `None` unless the zone is `<region><single lowercase letter>` where the region ends in a digit.
pub fn region_from_availability_zone(zone: &str) -> Option<&str> {
  let suffix = zone.chars().last()?;
  let region = &zone[..zone.len() - suffix.len_utf8()];

  match suffix.is_ascii_lowercase() && region.ends_with(|c: char| c.is_ascii_digit()) {
    true => Some(region),
    false => None,
  }
}

/// Source of instance metadata consulted once per resolution
pub trait MetadataSource {
  /// Fetch the metadata, or `None` when it is unavailable for any reason
  fn fetch(&self) -> impl Future<Output = Option<InstanceMetadata>> + Send;
}

/// Instance metadata service (IMDSv2) backed metadata source
#[derive(Clone, Debug)]
pub struct Imds {
  endpoint: Option<String>,
  timeout: Duration,
  max_attempts: u32,
}

impl Default for Imds {
  fn default() -> Self {
    Self::builder().build()
  }
}

impl Imds {
  pub fn builder() -> ImdsBuilder {
    ImdsBuilder::default()
  }

  /// Construct the IMDS client
  ///
  /// The same client configuration is shared with the instance profile credentials provider
  pub fn client(&self) -> Result<Client> {
    let mut client = Client::builder()
      .max_attempts(self.max_attempts)
      .connect_timeout(self.timeout)
      .read_timeout(self.timeout);

    if let Some(endpoint) = &self.endpoint {
      client = client
        .endpoint(endpoint)
        .map_err(|err| anyhow!("Invalid IMDS endpoint {endpoint}: {err}"))?;
    }

    Ok(client.build())
  }

  async fn get(client: &Client, path: &str) -> Result<String, ImdsError> {
    let value = client.get(path).await?;
    let value: &str = value.as_ref();
    Ok(value.to_owned())
  }
}

impl MetadataSource for Imds {
  async fn fetch(&self) -> Option<InstanceMetadata> {
    let client = match self.client() {
      Ok(client) => client,
      Err(err) => {
        debug!("Instance metadata unavailable: {err}");
        return None;
      }
    };

    // Only an error response (e.g. 404) means the service answered; a transport or token failure
    // would repeat for every further request, so stop here
    let zone = match Imds::get(&client, AVAILABILITY_ZONE_PATH).await {
      Err(err) if !matches!(err, ImdsError::ErrorResponse(_)) => {
        debug!("Instance metadata unavailable: {err}");
        return None;
      }
      zone => zone,
    };
    let iam_info = Imds::get(&client, IAM_INFO_PATH).await;

    let mut doc = Map::new();
    match zone {
      Ok(zone) => {
        doc.insert("placement".to_string(), json!({ "availability-zone": zone }));
      }
      Err(err) => debug!("Availability zone not found in instance metadata: {err}"),
    }
    match iam_info.map(|info| serde_json::from_str::<Value>(&info)) {
      Ok(Ok(info)) => {
        doc.insert("iam".to_string(), json!({ "info": info }));
      }
      Ok(Err(err)) => debug!("Unable to parse IAM info document: {err}"),
      Err(err) => debug!("IAM info not found in instance metadata: {err}"),
    }

    Some(InstanceMetadata(Value::Object(doc)))
  }
}

#[derive(Debug)]
pub struct ImdsBuilder {
  endpoint: Option<String>,
  timeout: Duration,
  max_attempts: u32,
}

impl Default for ImdsBuilder {
  fn default() -> Self {
    Self {
      endpoint: None,
      timeout: DEFAULT_TIMEOUT,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
  }
}

impl ImdsBuilder {
  /// Override the IMDS endpoint (e.g. `http://[fd00:ec2::254]` or a local mock)
  pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = Some(endpoint.into());
    self
  }

  /// Connect and read timeout applied to each metadata request
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  pub fn build(self) -> Imds {
    Imds {
      endpoint: self.endpoint,
      timeout: self.timeout,
      max_attempts: self.max_attempts,
    }
  }
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  #[rstest]
  #[case("us-west-2b", Some("us-west-2"))]
  #[case("us-east-1a", Some("us-east-1"))]
  #[case("us-gov-west-1c", Some("us-gov-west-1"))]
  #[case("ap-southeast-4a", Some("ap-southeast-4"))]
  #[case("us-west-2", None)]
  #[case("us-west-2B", None)]
  #[case("b", None)]
  #[case("", None)]
  fn region_from_availability_zone_test(#[case] zone: &str, #[case] expected: Option<&str>) {
    assert_eq!(region_from_availability_zone(zone), expected);
  }

  #[test]
  fn it_reads_nested_keys() {
    let metadata = InstanceMetadata::new(json!({
      "iam": { "info": { "InstanceProfileArn": "arn:aws:iam::123:instance-profile/x" } },
      "placement": { "availability-zone": "us-west-2b" }
    }));

    assert_eq!(
      metadata.instance_profile_arn(),
      Some("arn:aws:iam::123:instance-profile/x")
    );
    assert_eq!(metadata.availability_zone(), Some("us-west-2b"));
    assert_eq!(metadata.region(), Some("us-west-2"));
  }

  #[rstest]
  #[case(json!({}))]
  #[case(json!({ "iam": {} }))]
  #[case(json!({ "iam": { "info": {} } }))]
  #[case(json!({ "iam": { "info": { "InstanceProfileArn": 42 } } }))]
  fn it_treats_missing_profile_as_absent(#[case] value: Value) {
    let metadata = InstanceMetadata::new(value);
    assert_eq!(metadata.instance_profile_arn(), None);
    assert_eq!(metadata.region(), None);
  }

  #[test]
  fn it_clamps_max_attempts() {
    let imds = Imds::builder().max_attempts(0).build();
    assert_eq!(imds.max_attempts, 1);
  }

  #[test]
  fn it_rejects_an_invalid_endpoint() {
    let imds = Imds::builder().endpoint("not a uri").build();
    assert!(imds.client().is_err());
  }
}
