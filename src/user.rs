use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

const USER_ATTRS_STARTING_CAPACITY: usize = 10;

/// A collection of attributes that can affect toggle evaluation, usually corresponding to a user
/// of your application.
///
/// The only mandatory property is the key, which anchors percentage rollouts: a user keeps the
/// same key across evaluations to keep landing in the same split bucket. All other attributes
/// are free-form strings that rule conditions compare against.
///
/// User fields are immutable and can be accessed only via getter methods. To construct a User,
/// use the [UserBuilder] by calling [User::with_key].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "key")]
    _key: String,
    #[serde(default)]
    attrs: HashMap<String, String>,
}

impl User {
    /// Create a new [UserBuilder], seeding it with the provided user key.
    pub fn with_key(key: impl Into<String>) -> UserBuilder {
        UserBuilder::new(key)
    }

    /// Create a new [UserBuilder] whose key is the current epoch timestamp in milliseconds.
    ///
    /// Such users are not stable across requests, so percentage rollouts will not stick to them.
    pub fn anonymous() -> UserBuilder {
        UserBuilder::new(Utc::now().timestamp_millis().to_string())
    }

    /// Returns the key of the user.
    pub fn key(&self) -> &str {
        &self._key
    }

    /// Returns all custom attributes of the user.
    pub fn attrs(&self) -> &HashMap<String, String> {
        &self.attrs
    }

    /// Returns the value of the named attribute, if the user has it.
    pub fn value_of(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }

    pub fn has_attr(&self, attr: &str) -> bool {
        self.attrs.contains_key(attr)
    }
}

/// Contains methods for configuring a user.
pub struct UserBuilder {
    key: String,
    attrs: HashMap<String, String>,
}

impl UserBuilder {
    /// Create a new user builder, setting the user key value to `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attrs: HashMap::with_capacity(USER_ATTRS_STARTING_CAPACITY),
        }
    }

    /// Replace the key used for stable percentage rollout.
    pub fn stable_rollout(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = key.into();
        self
    }

    /// Set a single attribute, overwriting any previous value.
    pub fn attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Merge the provided attributes into this builder instance.
    pub fn attrs(&mut self, attrs: HashMap<String, String>) -> &mut Self {
        self.attrs.extend(attrs);
        self
    }

    /// Create a new [User] instance.
    pub fn build(&self) -> User {
        User {
            _key: self.key.clone(),
            attrs: self.attrs.clone(),
        }
    }
}
