use std::fmt;

use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::error::Error;

/// Static AWS access key pair supplied by the caller
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  access_key: String,
  secret_key: String,
}

impl Credentials {
  /// Validate an optional access key / secret key pair
  ///
  /// Both keys must be supplied or both absent. An empty string counts as absent, so
  /// `("", "")` resolves to `None` while `("AKIA...", "")` is rejected.
  pub fn from_parts(access_key: Option<&str>, secret_key: Option<&str>) -> Result<Option<Self>, Error> {
    let access_key = access_key.filter(|k| !k.is_empty());
    let secret_key = secret_key.filter(|k| !k.is_empty());

    match (access_key, secret_key) {
      (Some(access_key), Some(secret_key)) => Ok(Some(Self {
        access_key: access_key.to_owned(),
        secret_key: secret_key.to_owned(),
      })),
      (None, None) => Ok(None),
      (Some(_), None) => Err(Error::InvalidArgument(
        "access key supplied without a secret key".to_string(),
      )),
      (None, Some(_)) => Err(Error::InvalidArgument(
        "secret key supplied without an access key".to_string(),
      )),
    }
  }

  pub fn access_key(&self) -> &str {
    &self.access_key
  }

  pub fn secret_key(&self) -> &str {
    &self.secret_key
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("access_key", &self.access_key)
      .field("secret_key", &"** redacted **")
      .finish()
  }
}

/// Only the access key is ever serialized
impl Serialize for Credentials {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("Credentials", 1)?;
    state.serialize_field("access_key", &self.access_key)?;
    state.end()
  }
}
