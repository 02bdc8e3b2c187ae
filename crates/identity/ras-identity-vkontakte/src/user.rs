//! VK user records and the mapping from raw API payloads.

use crate::error::{VkontakteError, VkontakteResult};
use crate::validation::is_blank;
use ras_identity_oauth2::AccessToken;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Gender as reported by the `sex` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Unspecified,
    Female,
    Male,
}

/// A VK user profile. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VkontakteUser {
    data: Map<String, Value>,
}

impl VkontakteUser {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn id(&self) -> Option<i64> {
        self.data.get("id").and_then(as_i64)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.str_field("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.str_field("last_name")
    }

    /// First and last name joined by a space, skipping missing parts.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    /// `screen_name`, falling back to `domain`.
    pub fn screen_name(&self) -> Option<&str> {
        self.str_field("screen_name").or_else(|| self.domain())
    }

    pub fn domain(&self) -> Option<&str> {
        self.str_field("domain")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.str_field("nickname")
    }

    pub fn maiden_name(&self) -> Option<&str> {
        self.str_field("maiden_name")
    }

    /// `D.M.YYYY`, or `D.M` when the year is hidden.
    pub fn birthday(&self) -> Option<&str> {
        self.str_field("bdate")
    }

    pub fn sex(&self) -> Option<Sex> {
        match self.data.get("sex").and_then(as_i64)? {
            1 => Some(Sex::Female),
            2 => Some(Sex::Male),
            _ => Some(Sex::Unspecified),
        }
    }

    pub fn city(&self) -> Option<&str> {
        self.titled_field("city")
    }

    pub fn country(&self) -> Option<&str> {
        self.titled_field("country")
    }

    pub fn home_town(&self) -> Option<&str> {
        self.str_field("home_town")
    }

    /// Largest available photo.
    pub fn photo_url(&self) -> Option<&str> {
        self.str_field("photo_max_orig")
            .or_else(|| self.str_field("photo_max"))
    }

    pub fn has_photo(&self) -> bool {
        self.flag("has_photo")
    }

    pub fn is_friend(&self) -> bool {
        self.flag("is_friend")
    }

    pub fn friend_status(&self) -> Option<i64> {
        self.data.get("friend_status").and_then(as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn titled_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.get("title"))
            .and_then(Value::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|v| !is_blank(v))
    }
}

/// One element of a user list: friend lists may hold bare ids.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEntry {
    BareId(i64),
    ProfileRecord(Map<String, Value>),
}

impl UserEntry {
    pub fn from_value(value: Value) -> VkontakteResult<Self> {
        match value {
            Value::Object(record) => Ok(Self::ProfileRecord(record)),
            other => as_i64(&other).map(Self::BareId).ok_or_else(|| {
                VkontakteError::UnexpectedResponse(format!("unrecognised user entry: {}", other))
            }),
        }
    }
}

impl From<UserEntry> for VkontakteUser {
    fn from(entry: UserEntry) -> Self {
        match entry {
            UserEntry::BareId(id) => {
                let mut data = Map::new();
                data.insert("id".to_string(), Value::from(id));
                VkontakteUser::new(data)
            }
            UserEntry::ProfileRecord(record) => VkontakteUser::new(record),
        }
    }
}

/// Unwraps the `response` member of a successful API reply.
pub(crate) fn response_payload(mut body: Value) -> VkontakteResult<Value> {
    body.get_mut("response")
        .map(Value::take)
        .ok_or_else(|| VkontakteError::UnexpectedResponse("missing `response` member".to_string()))
}

/// Accepts either `{"items": [...]}` or a bare list.
pub(crate) fn user_entries(payload: Value) -> VkontakteResult<Vec<UserEntry>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(VkontakteError::UnexpectedResponse(
                    "expected a user list or an `items` envelope".to_string(),
                ));
            }
        },
        other => {
            return Err(VkontakteError::UnexpectedResponse(format!(
                "expected a user list, got {}",
                other
            )));
        }
    };

    items.into_iter().map(UserEntry::from_value).collect()
}

/// Maps a `users.get` reply for the token owner.
///
/// `email` and `user_id` travel on the token rather than the profile; when
/// present they overlay the profile's `email` and `id`.
pub fn resource_owner_from_response(
    body: Value,
    token: &AccessToken,
    legacy_uid_fallback: bool,
) -> VkontakteResult<VkontakteUser> {
    let payload = response_payload(body)?;
    let mut record = match user_entries(payload)?.into_iter().next() {
        Some(UserEntry::ProfileRecord(record)) => record,
        Some(UserEntry::BareId(id)) => {
            let mut record = Map::new();
            record.insert("id".to_string(), Value::from(id));
            record
        }
        None => {
            return Err(VkontakteError::UnexpectedResponse(
                "empty profile list".to_string(),
            ));
        }
    };

    if let Some(email) = token.value("email").filter(|v| !is_blank(v)) {
        record.insert("email".to_string(), email.clone());
    }

    if legacy_uid_fallback {
        if let Some(uid) = record.get("uid").filter(|v| !is_blank(v)).cloned() {
            record.insert("id".to_string(), uid);
        }
    }

    if let Some(user_id) = token.value("user_id").filter(|v| !is_blank(v)) {
        record.insert("id".to_string(), user_id.clone());
    }

    Ok(VkontakteUser::new(record))
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
