//! Runtime key-value configuration.
//!
//! Values are stored as text with a declared type. The whole table is loaded
//! into an immutable [`ConfigSnapshot`] that consumers receive by injection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

/// Well-known configuration keys.
pub mod keys {
    pub const SITE_NAME: &str = "site.name";
    pub const ONE_PURCHASE_PER_PROMPT: &str = "commerce.one_purchase_per_prompt";
    pub const REGISTRATION_OPEN: &str = "auth.registration_open";
    pub const CATALOG_PAGE_SIZE: &str = "catalog.page_size";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Json,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::String => "string",
            ConfigType::Integer => "integer",
            ConfigType::Float => "float",
            ConfigType::Boolean => "boolean",
            ConfigType::Json => "json",
        }
    }

    /// Parses raw text according to this type.
    pub fn parse(&self, raw: &str) -> Result<ConfigValue, DomainError> {
        let invalid = || {
            DomainError::validation(format!("'{}' is not a valid {} value", raw, self.as_str()))
        };
        match self {
            ConfigType::String => Ok(ConfigValue::String(raw.to_string())),
            ConfigType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|_| invalid()),
            ConfigType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(ConfigValue::Float)
                .ok_or_else(invalid),
            ConfigType::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(ConfigValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(ConfigValue::Boolean(false)),
                _ => Err(invalid()),
            },
            ConfigType::Json => serde_json::from_str(raw)
                .map(ConfigValue::Json)
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ConfigType::String),
            "integer" | "int" => Ok(ConfigType::Integer),
            "float" => Ok(ConfigType::Float),
            "boolean" | "bool" => Ok(ConfigType::Boolean),
            "json" => Ok(ConfigType::Json),
            _ => Err(format!("Unknown config type: {}", s)),
        }
    }
}

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Json(serde_json::Value),
}

/// A stored configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfigEntry {
    pub key: String,
    pub value: String,
    pub config_type: ConfigType,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl SystemConfigEntry {
    pub fn typed_value(&self) -> Result<ConfigValue, DomainError> {
        self.config_type.parse(&self.value)
    }
}

/// Entry as returned by the API, value already typed.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntryView {
    pub key: String,
    pub value: ConfigValue,
    pub config_type: ConfigType,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetConfigRequest {
    #[validate(length(max = 10000))]
    pub value: String,

    /// Keeps the stored type when absent; `string` for new keys.
    pub config_type: Option<ConfigType>,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    pub is_public: Option<bool>,
}

/// Immutable view of every configuration entry at load time.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    entries: HashMap<String, SystemConfigEntry>,
    loaded_at: Option<DateTime<Utc>>,
}

impl ConfigSnapshot {
    pub fn new(entries: Vec<SystemConfigEntry>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
            loaded_at: Some(loaded_at),
        }
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<&SystemConfigEntry> {
        self.entries.get(key)
    }

    /// Typed value, `None` when absent or unparseable.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let entry = self.entries.get(key)?;
        match entry.typed_value() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unparseable config value");
                None
            }
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(ConfigValue::Boolean(b)) => b,
            _ => default,
        }
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(ConfigValue::Integer(i)) => i,
            _ => default,
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(ConfigValue::Float(f)) => f,
            Some(ConfigValue::Integer(i)) => i as f64,
            _ => default,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(ConfigValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Entries flagged public, sorted by key.
    pub fn public_entries(&self) -> Vec<&SystemConfigEntry> {
        let mut entries: Vec<_> = self.entries.values().filter(|e| e.is_public).collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn all_entries(&self) -> Vec<&SystemConfigEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}
