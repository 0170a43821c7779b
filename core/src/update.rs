//! Builder for `update_user` request bodies.

use std::collections::BTreeMap;

use serde::Serialize;

/// A user attribute the service lets callers change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserField {
    FirstName(String),
    LastName(String),
    Email(String),
    Password(String),
    Locale(String),
    DefaultCurrency(String),
}

impl UserField {
    /// Field for a wire key such as `"first_name"`; `None` for keys the
    /// service does not accept.
    pub fn from_key(key: &str, value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        match key {
            "first_name" => Some(UserField::FirstName(value)),
            "last_name" => Some(UserField::LastName(value)),
            "email" => Some(UserField::Email(value)),
            "password" => Some(UserField::Password(value)),
            "locale" => Some(UserField::Locale(value)),
            "default_currency" => Some(UserField::DefaultCurrency(value)),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            UserField::FirstName(_) => "first_name",
            UserField::LastName(_) => "last_name",
            UserField::Email(_) => "email",
            UserField::Password(_) => "password",
            UserField::Locale(_) => "locale",
            UserField::DefaultCurrency(_) => "default_currency",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            UserField::FirstName(v)
            | UserField::LastName(v)
            | UserField::Email(v)
            | UserField::Password(v)
            | UserField::Locale(v)
            | UserField::DefaultCurrency(v) => v,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            UserField::FirstName(v)
            | UserField::LastName(v)
            | UserField::Email(v)
            | UserField::Password(v)
            | UserField::Locale(v)
            | UserField::DefaultCurrency(v) => v,
        }
    }
}

/// Set of field changes, encoded as one JSON object with sorted keys.
///
/// Setting the same field twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserUpdate {
    fields: BTreeMap<&'static str, String>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: UserField) -> Self {
        self.fields.insert(field.key(), field.into_value());
        self
    }

    pub fn first_name(self, value: impl Into<String>) -> Self {
        self.set(UserField::FirstName(value.into()))
    }

    pub fn last_name(self, value: impl Into<String>) -> Self {
        self.set(UserField::LastName(value.into()))
    }

    pub fn email(self, value: impl Into<String>) -> Self {
        self.set(UserField::Email(value.into()))
    }

    pub fn password(self, value: impl Into<String>) -> Self {
        self.set(UserField::Password(value.into()))
    }

    pub fn locale(self, value: impl Into<String>) -> Self {
        self.set(UserField::Locale(value.into()))
    }

    pub fn default_currency(self, value: impl Into<String>) -> Self {
        self.set(UserField::DefaultCurrency(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

impl FromIterator<UserField> for UserUpdate {
    fn from_iter<I: IntoIterator<Item = UserField>>(iter: I) -> Self {
        iter.into_iter().fold(UserUpdate::new(), UserUpdate::set)
    }
}
