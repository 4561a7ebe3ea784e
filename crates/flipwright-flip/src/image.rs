use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Encoded image bytes together with their media type.
///
/// Cloning is cheap (the bytes are reference counted). Serialized as a
/// `data:` URL so payloads stay plain JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
  mime: String,
  bytes: Bytes,
}

impl ImageBlob {
  pub fn new(mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
    Self {
      mime: mime.into(),
      bytes: bytes.into(),
    }
  }

  pub fn png(bytes: impl Into<Bytes>) -> Self {
    Self::new("image/png", bytes)
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn bytes(&self) -> &Bytes {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn to_data_url(&self) -> String {
    format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
  }

  pub fn from_data_url(url: &str) -> Option<Self> {
    let rest = url.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(data).ok()?;
    Some(Self::new(mime, bytes))
  }
}

impl fmt::Debug for ImageBlob {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ImageBlob")
      .field("mime", &self.mime)
      .field("len", &self.bytes.len())
      .finish()
  }
}

impl Serialize for ImageBlob {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_data_url())
  }
}

impl<'de> Deserialize<'de> for ImageBlob {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let url = String::deserialize(deserializer)?;
    Self::from_data_url(&url).ok_or_else(|| de::Error::custom("expected a base64 data URL"))
  }
}

/// A candidate image returned by the image search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail: Option<String>,
}

impl ImageRef {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      thumbnail: None,
    }
  }
}
