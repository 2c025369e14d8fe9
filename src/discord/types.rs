//! Serde types for the API responses the convenience operations return.
//!
//! Only the fields a chat client reads are modelled; anything else in the
//! payload is ignored.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Convert a parsed JSON value into one of the typed shapes below.
pub fn from_value<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
  serde_json::from_value(value)
}

// ============================================================================
// Users and guilds
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub username: String,
  pub global_name: Option<String>,
  pub avatar: Option<String>,
  #[serde(default)]
  pub bot: bool,
}

impl User {
  /// Name shown in the UI: global display name, else username.
  pub fn display_name(&self) -> &str {
    self.global_name.as_deref().unwrap_or(&self.username)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
  pub id: String,
  pub name: String,
  pub icon: Option<String>,
  #[serde(default)]
  pub owner: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
  pub user: Option<User>,
  pub nick: Option<String>,
  #[serde(default)]
  pub roles: Vec<String>,
  pub joined_at: Option<String>,
}

// ============================================================================
// Channels and messages
// ============================================================================

/// Channel kinds a chat client distinguishes; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelKind {
  Text,
  Direct,
  Voice,
  Category,
  Announcement,
  Other(u8),
}

impl From<u8> for ChannelKind {
  fn from(raw: u8) -> Self {
    match raw {
      0 => Self::Text,
      1 => Self::Direct,
      2 => Self::Voice,
      4 => Self::Category,
      5 => Self::Announcement,
      other => Self::Other(other),
    }
  }
}

impl From<ChannelKind> for u8 {
  fn from(kind: ChannelKind) -> Self {
    match kind {
      ChannelKind::Text => 0,
      ChannelKind::Direct => 1,
      ChannelKind::Voice => 2,
      ChannelKind::Category => 4,
      ChannelKind::Announcement => 5,
      ChannelKind::Other(raw) => raw,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: ChannelKind,
  pub name: Option<String>,
  pub guild_id: Option<String>,
  pub parent_id: Option<String>,
  pub position: Option<i32>,
  pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id: String,
  pub channel_id: String,
  pub author: User,
  #[serde(default)]
  pub content: String,
  pub timestamp: String,
  pub edited_timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_user_display_name() {
    let user: User = from_value(json!({
      "id": "80351110224678912",
      "username": "nelly",
      "global_name": null,
      "avatar": null,
      "discriminator": "0"
    }))
    .unwrap();

    assert_eq!(user.display_name(), "nelly");
    assert!(!user.bot);
  }

  #[test]
  fn test_channel_kind_mapping() {
    let channels: Vec<Channel> = from_value(json!([
      { "id": "1", "type": 0, "name": "general", "guild_id": "9" },
      { "id": "2", "type": 4, "name": "Text Channels", "guild_id": "9" },
      { "id": "3", "type": 15, "name": "forum", "guild_id": "9" }
    ]))
    .unwrap();

    assert_eq!(channels[0].kind, ChannelKind::Text);
    assert_eq!(channels[1].kind, ChannelKind::Category);
    assert_eq!(channels[2].kind, ChannelKind::Other(15));
    assert_eq!(u8::from(channels[2].kind), 15);
  }

  #[test]
  fn test_message_requires_author() {
    let result: serde_json::Result<Message> = from_value(json!({
      "id": "1",
      "channel_id": "2",
      "content": "hello",
      "timestamp": "2024-01-01T00:00:00+00:00"
    }));

    assert!(result.is_err());
  }
}
