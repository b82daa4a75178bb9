//! Domain DTOs for the Flipped API.
//!
//! # Design
//! Request payloads serialize to exactly the keys the server reads. Response
//! types default every optional key so that older server builds that omit a
//! field still decode; only identity keys (`user_id`, `token`, `url`) are
//! required and their absence is a decode error.

use serde::{Deserialize, Serialize};

/// Kind of account, sent as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UserType {
    Standard,
    Premium,
}

impl From<UserType> for u8 {
    fn from(t: UserType) -> u8 {
        match t {
            UserType::Standard => 0,
            UserType::Premium => 1,
        }
    }
}

impl TryFrom<u8> for UserType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserType::Standard),
            1 => Ok(UserType::Premium),
            other => Err(format!("unknown user_type {other}")),
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    /// URL returned by a previous image upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub password: String,
}

/// Account created by `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_type: UserType,
    pub email: String,
    pub password: String,
}

/// Result of a successful login. The token is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    /// Any further keys the server attached to the login response.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Raw image handed to `upload_image`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// Generated from a uuid when absent.
    pub file_name: Option<String>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
            content_type: "image/jpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

/// Full profile record as shown on the detail and settings screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub work: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub age_min: Option<u32>,
    #[serde(default)]
    pub age_max: Option<u32>,
    /// Primary photo first, then up to three more.
    #[serde(default)]
    pub photos: Vec<String>,
}

/// One card on the home feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub work: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub collected: bool,
}

/// Whether `toggle_collect` adds or removes the bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectAction {
    Collect,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub action: CollectAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectAck {
    pub user_id: String,
    pub collected: bool,
}

/// Payload for `save_profile`. `photos[0]` is the primary photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub photos: Vec<String>,
    pub name: String,
    pub age: u32,
    pub work: String,
    pub bio: String,
    pub age_min: u32,
    pub age_max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRecord {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectRecord {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default = "default_collected")]
    pub collected: bool,
}

fn default_collected() -> bool {
    true
}
