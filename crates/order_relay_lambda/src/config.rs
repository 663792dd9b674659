//! Environment-provided configuration, read once per cold start.

use std::time::Duration;

use order_relay_core::routing::{RoutingProfile, DEFAULT_PROFILE};
use order_relay_core::storage_keys::ArchiveKeyScheme;
use order_relay_core::{RelayError, RelayResult};

pub const TOPIC_ENV: &str = "TOPIC";
pub const TABLE_ENV: &str = "TABLENAME";
pub const BUCKET_ENV: &str = "BUCKETNAME";
pub const ROUTING_PROFILE_ENV: &str = "ROUTING_PROFILE";
pub const ARCHIVE_FIXED_KEY_ENV: &str = "ARCHIVE_FIXED_KEY";
pub const PRESIGNED_URL_TTL_ENV: &str = "PRESIGNED_URL_TTL_SECS";
pub const DEFAULT_PRESIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    pub topic: String,
    pub profile: RoutingProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table: String,
    pub profile: RoutingProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketConfig {
    pub bucket: String,
    pub profile: RoutingProfile,
    pub presigned_url_ttl: Duration,
}

impl TopicConfig {
    pub fn from_env() -> RelayResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        Ok(Self {
            topic: required(&lookup, TOPIC_ENV)?,
            profile: routing_profile(&lookup)?,
        })
    }
}

impl TableConfig {
    pub fn from_env() -> RelayResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        Ok(Self {
            table: required(&lookup, TABLE_ENV)?,
            profile: routing_profile(&lookup)?,
        })
    }
}

impl BucketConfig {
    pub fn from_env() -> RelayResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        let ttl_secs = match optional(&lookup, PRESIGNED_URL_TTL_ENV) {
            Some(raw) => raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                RelayError::misconfiguration(format!(
                    "{PRESIGNED_URL_TTL_ENV} must be a positive number of seconds"
                ))
            })?,
            None => DEFAULT_PRESIGNED_URL_TTL_SECS,
        };

        Ok(Self {
            bucket: required(&lookup, BUCKET_ENV)?,
            profile: routing_profile(&lookup)?,
            presigned_url_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> RelayResult<String> {
    optional(lookup, name)
        .ok_or_else(|| RelayError::misconfiguration(format!("{name} must be configured")))
}

fn routing_profile(lookup: &impl Fn(&str) -> Option<String>) -> RelayResult<RoutingProfile> {
    let name = optional(lookup, ROUTING_PROFILE_ENV).unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let profile = RoutingProfile::named(&name)?;

    Ok(match optional(lookup, ARCHIVE_FIXED_KEY_ENV) {
        Some(key) => profile.with_archive_key(ArchiveKeyScheme::fixed(key)),
        None => profile,
    })
}
