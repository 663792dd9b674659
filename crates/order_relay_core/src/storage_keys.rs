use crate::error::{RelayError, RelayResult};

pub const ARCHIVE_CONTENT_TYPE: &str = "application/json";
pub const LEGACY_FIXED_ARCHIVE_KEY: &str = "order.json";

pub fn archive_object_key(attribute: &str, value: &str) -> String {
    format!("{attribute}_{value}.json")
}

/// How an archived order's object key is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveKeyScheme {
    /// `"<attribute>_<value>.json"`, value read from the routing attribute.
    Attribute(String),
    /// The same literal key for every order; each archive overwrites the last.
    Fixed(String),
}

impl ArchiveKeyScheme {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    pub fn fixed(key: impl Into<String>) -> Self {
        Self::Fixed(key.into())
    }

    /// Name of the attribute the key depends on, if any.
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Self::Attribute(name) => Some(name),
            Self::Fixed(_) => None,
        }
    }

    pub fn resolve<'a>(&self, lookup: impl FnOnce(&str) -> Option<&'a str>) -> RelayResult<String> {
        match self {
            Self::Fixed(key) => Ok(key.clone()),
            Self::Attribute(name) => {
                let value = lookup(name)
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| RelayError::missing_attribute(name.clone()))?;
                Ok(archive_object_key(name, value))
            }
        }
    }
}
