//! VK adapter configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_OAUTH_BASE_URI: &str = "https://id.vk.com";
pub const DEFAULT_API_BASE_URI: &str = "https://api.vk.com/method";
pub const DEFAULT_API_VERSION: &str = "5.199";

/// See https://vk.com/dev/permissions
pub const DEFAULT_SCOPES: [&str; 3] = ["email", "friends", "offline"];

/// See https://vk.com/dev/fields
pub const DEFAULT_FIELDS: [&str; 17] = [
    "bdate",
    "city",
    "country",
    "domain",
    "first_name",
    "friend_status",
    "has_photo",
    "home_town",
    "id",
    "is_friend",
    "last_name",
    "maiden_name",
    "nickname",
    "photo_max",
    "photo_max_orig",
    "screen_name",
    "sex",
];

/// Keeps the first occurrence of every name.
fn unique_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        let name = name.into();
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Requested OAuth permission scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(unique_names(scopes))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self::new(DEFAULT_SCOPES)
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(scopes: Vec<String>) -> Self {
        Self::new(scopes)
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(set: ScopeSet) -> Self {
        set.0
    }
}

/// Profile fields requested on every user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(unique_names(fields))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form of the `fields` parameter.
    pub fn to_param(&self) -> String {
        self.0.join(",")
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new(DEFAULT_FIELDS)
    }
}

impl From<Vec<String>> for FieldSet {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<FieldSet> for Vec<String> {
    fn from(set: FieldSet) -> Self {
        set.0
    }
}

/// Settings for the VK adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VkontakteConfig {
    pub oauth_base_uri: String,
    pub api_base_uri: String,
    pub api_version: String,
    pub language: Option<String>,
    pub scopes: ScopeSet,
    pub fields: FieldSet,
    /// Random bytes per PKCE verifier; the verifier is twice as long in hex.
    pub verifier_length: usize,
    /// Copy a legacy `uid` into `id` when mapping the resource owner.
    /// Unset means: only for API version 4.x.
    pub legacy_uid_fallback: Option<bool>,
}

impl Default for VkontakteConfig {
    fn default() -> Self {
        Self {
            oauth_base_uri: DEFAULT_OAUTH_BASE_URI.to_string(),
            api_base_uri: DEFAULT_API_BASE_URI.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            language: None,
            scopes: ScopeSet::default(),
            fields: FieldSet::default(),
            verifier_length: crate::pkce::DEFAULT_VERIFIER_LENGTH,
            legacy_uid_fallback: None,
        }
    }
}

impl VkontakteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oauth_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.oauth_base_uri = uri.into();
        self
    }

    pub fn with_api_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.api_base_uri = uri.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.set_language(language);
        self
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = Some(language.into());
    }

    pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_verifier_length(mut self, length: usize) -> Self {
        self.verifier_length = length;
        self
    }

    pub fn with_legacy_uid_fallback(mut self, enabled: bool) -> Self {
        self.legacy_uid_fallback = Some(enabled);
        self
    }

    /// Integer part of the API version, `5` for `5.199`.
    pub fn api_major_version(&self) -> Option<u32> {
        self.api_version.split('.').next()?.trim().parse().ok()
    }

    pub fn uses_legacy_uid_fallback(&self) -> bool {
        self.legacy_uid_fallback
            .unwrap_or_else(|| self.api_major_version() == Some(4))
    }
}
