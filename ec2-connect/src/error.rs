use thiserror::Error;

/// Errors returned when resolving or establishing an EC2 connection
#[derive(Debug, Error)]
pub enum Error {
  /// The caller supplied inputs that cannot be resolved
  ///
  /// For example an access key without a secret key, or an empty default region
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The connector did not produce a usable connection
  #[error("an error occurred when connecting to EC2 in {region} using {source_kind} credentials")]
  ConnectionFailure {
    region: String,
    source_kind: &'static str,
  },
}
