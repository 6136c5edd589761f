//! MPV JSON IPC protocol types.
//!
//! Reference: https://mpv.io/manual/master/#json-ipc
//!
//! Every message is one JSON object on its own line. Commands are
//! fire-and-forget, so no `request_id` is attached.

use serde::{Deserialize, Serialize};

/// Observer IDs registered right after connecting.
pub const OBS_TIME_POS: i64 = 1;
pub const OBS_DURATION: i64 = 2;
pub const OBS_VOLUME: i64 = 3;

/// Properties the reader keeps in `PlaybackState`.
pub const PROP_TIME_POS: &str = "time-pos";
pub const PROP_DURATION: &str = "duration";
pub const PROP_VOLUME: &str = "volume";

/// Event emitted when the current file finishes, for any reason.
pub const EVENT_END_FILE: &str = "end-file";

/// Command sent to MPV via IPC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MpvCommand {
  pub command: Vec<serde_json::Value>,
}

impl MpvCommand {
  pub fn new(args: Vec<serde_json::Value>) -> Self {
    Self { command: args }
  }

  /// Observe a property for changes.
  pub fn observe_property(id: i64, name: &str) -> Self {
    Self::new(vec!["observe_property".into(), id.into(), name.into()])
  }

  /// Cycle (toggle) a property.
  pub fn cycle(property: &str) -> Self {
    Self::new(vec!["cycle".into(), property.into()])
  }

  /// Add a (possibly negative) delta to a numeric property.
  pub fn add(property: &str, delta: i64) -> Self {
    Self::new(vec!["add".into(), property.into(), delta.into()])
  }

  /// The three subscriptions issued on every fresh connection.
  pub fn subscriptions() -> [Self; 3] {
    [
      Self::observe_property(OBS_TIME_POS, PROP_TIME_POS),
      Self::observe_property(OBS_DURATION, PROP_DURATION),
      Self::observe_property(OBS_VOLUME, PROP_VOLUME),
    ]
  }

  /// Encode as a single newline-terminated line.
  pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(self)?;
    bytes.push(b'\n');
    Ok(bytes)
  }
}

/// Wire shape of anything MPV may write. All fields are optional so a
/// single pass can classify the line.
#[derive(Debug, Deserialize)]
struct RawMessage {
  name: Option<String>,
  #[serde(default)]
  data: Option<serde_json::Value>,
  event: Option<String>,
  reason: Option<String>,
  error: Option<String>,
}

/// Property update pushed for an observed property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
  pub name: String,
  /// `None` when MPV reports the property as unavailable.
  pub data: Option<serde_json::Value>,
}

impl PropertyChange {
  pub fn as_f64(&self) -> Option<f64> {
    self.data.as_ref().and_then(serde_json::Value::as_f64)
  }
}

/// Message received from MPV IPC.
#[derive(Debug, Clone, PartialEq)]
pub enum MpvMessage {
  /// A `name` + `data` pair.
  Property(PropertyChange),
  /// Any other `event` (e.g. "end-file", "start-file", "idle").
  Event {
    event: String,
    reason: Option<String>,
  },
  /// Reply to a command; carries "success" or an error string.
  Reply { error: String },
  /// Valid JSON we have no use for.
  Unknown,
}

impl MpvMessage {
  /// Parse a JSON line from MPV.
  ///
  /// A `name` takes precedence over `event`, since property-change
  /// notifications carry both.
  pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
    let raw: RawMessage = serde_json::from_str(line)?;

    if let Some(name) = raw.name {
      return Ok(MpvMessage::Property(PropertyChange {
        name,
        data: raw.data.filter(|v| !v.is_null()),
      }));
    }

    if let Some(event) = raw.event {
      return Ok(MpvMessage::Event {
        event,
        reason: raw.reason,
      });
    }

    Ok(match raw.error {
      Some(error) => MpvMessage::Reply { error },
      None => MpvMessage::Unknown,
    })
  }

  pub fn is_end_file(&self) -> bool {
    matches!(self, MpvMessage::Event { event, .. } if event == EVENT_END_FILE)
  }
}
