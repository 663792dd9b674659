use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::contract::{MessageAttribute, Order};
use crate::error::{RelayError, RelayResult};
use crate::storage_keys::ArchiveKeyScheme;

pub const DEFAULT_PROFILE: &str = "account";

const ALL_DETAIL_FIELDS: [&str; 4] = ["coffeetype", "coffeesize", "unitprice", "quantity"];

/// Record written to the key-value table.
pub type PersistedRecord = BTreeMap<String, Value>;

/// Fields copied from an order into its persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<&'static str>,
    pub detail_fields: Vec<&'static str>,
}

/// Declarative description of one deployment variant: which order fields
/// route the message, key the record, and name the archived object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingProfile {
    pub name: &'static str,
    pub publish_attributes: Vec<&'static str>,
    pub annotation_fields: Vec<&'static str>,
    pub key_fields: Vec<&'static str>,
    pub projection: Projection,
    pub archive_key: ArchiveKeyScheme,
}

impl Default for RoutingProfile {
    fn default() -> Self {
        Self::account()
    }
}

impl RoutingProfile {
    pub fn named(name: &str) -> RelayResult<Self> {
        match name.trim() {
            "account" => Ok(Self::account()),
            "account_vendor" => Ok(Self::account_vendor()),
            "order" => Ok(Self::order()),
            other => Err(RelayError::misconfiguration(format!(
                "unknown routing profile '{other}' (expected account, account_vendor or order)"
            ))),
        }
    }

    pub fn account() -> Self {
        Self {
            name: "account",
            publish_attributes: vec!["accountid"],
            annotation_fields: vec!["accountid"],
            key_fields: vec!["accountid", "vendorid"],
            projection: Projection {
                fields: vec!["accountid", "vendorid", "orderdate", "details"],
                detail_fields: ALL_DETAIL_FIELDS.to_vec(),
            },
            archive_key: ArchiveKeyScheme::attribute("accountid"),
        }
    }

    pub fn account_vendor() -> Self {
        Self {
            name: "account_vendor",
            publish_attributes: vec!["accountid", "vendorid"],
            annotation_fields: vec!["accountid", "vendorid"],
            key_fields: vec!["accountid", "vendorid"],
            projection: Projection {
                fields: vec!["accountid", "vendorid", "orderdate", "city", "details"],
                detail_fields: ALL_DETAIL_FIELDS.to_vec(),
            },
            archive_key: ArchiveKeyScheme::attribute("accountid"),
        }
    }

    pub fn order() -> Self {
        Self {
            name: "order",
            publish_attributes: vec!["orderid"],
            annotation_fields: vec!["orderid", "accountid"],
            key_fields: vec!["orderid"],
            projection: Projection {
                fields: vec![
                    "orderid",
                    "accountid",
                    "vendorid",
                    "orderdate",
                    "city",
                    "details",
                ],
                detail_fields: ALL_DETAIL_FIELDS.to_vec(),
            },
            archive_key: ArchiveKeyScheme::attribute("orderid"),
        }
    }

    pub fn with_archive_key(mut self, scheme: ArchiveKeyScheme) -> Self {
        self.archive_key = scheme;
        self
    }

    /// Message attributes forwarded with a publish. Every configured
    /// attribute must be present on the order.
    pub fn message_attributes(
        &self,
        order: &Order,
    ) -> RelayResult<BTreeMap<String, MessageAttribute>> {
        self.publish_attributes
            .iter()
            .map(|&name| {
                order
                    .text_field(name)
                    .map(|value| (name.to_string(), MessageAttribute::string(value)))
                    .ok_or_else(|| {
                        RelayError::malformed(format!(
                            "order is missing '{name}' required for routing"
                        ))
                    })
            })
            .collect()
    }

    pub fn annotations(&self, order: &Order) -> Vec<(String, String)> {
        self.annotation_fields
            .iter()
            .filter_map(|&name| {
                order
                    .text_field(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Projects an order into the record written to the table. Key fields
    /// must be present; other absent fields are left out.
    pub fn project(&self, order: &Order) -> RelayResult<PersistedRecord> {
        for &name in &self.key_fields {
            if order.text_field(name).is_none() {
                return Err(RelayError::malformed(format!(
                    "order is missing key field '{name}'"
                )));
            }
        }

        let mut record = PersistedRecord::new();
        for &name in &self.projection.fields {
            if name == "details" {
                if let Some(details) = &order.details {
                    let projected: Map<String, Value> = self
                        .projection
                        .detail_fields
                        .iter()
                        .filter_map(|&field| {
                            details
                                .field(field)
                                .map(|value| (field.to_string(), value.clone()))
                        })
                        .collect();
                    record.insert(name.to_string(), Value::Object(projected));
                }
                continue;
            }
            if let Some(value) = order.field(name) {
                record.insert(name.to_string(), value);
            }
        }

        Ok(record)
    }

    /// Key attributes of a projected record.
    pub fn record_key(&self, record: &PersistedRecord) -> PersistedRecord {
        self.key_fields
            .iter()
            .filter_map(|&name| {
                record
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// Builds a lookup key from request parameters.
    pub fn lookup_key<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> RelayResult<PersistedRecord> {
        self.key_fields
            .iter()
            .map(|&name| {
                lookup(name)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (name.to_string(), Value::String(value.to_string())))
                    .ok_or_else(|| RelayError::missing_attribute(name))
            })
            .collect()
    }
}
