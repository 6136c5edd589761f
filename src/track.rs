//! Track metadata as returned by the catalog.

use serde::{Deserialize, Serialize};

/// A playable track. Equality is by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
  /// Catalog identifier, stored as `videoId` in playlist and history files.
  #[serde(rename = "videoId")]
  pub id: String,
  pub title: String,
  pub artist: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub album: Option<String>,
  /// Duration hint in seconds, if the catalog knows it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<f64>,
}

impl Track {
  pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      artist: artist.into(),
      thumbnail: None,
      album: None,
      duration: None,
    }
  }
}

impl PartialEq for Track {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for Track {}
