//! Runtime system configuration.
//!
//! The table is loaded into an immutable [`ConfigSnapshot`] at boot. Writes go
//! to the database first, then the snapshot is reloaded and swapped so readers
//! never observe a half-applied change.

use chrono::Utc;
use domain::models::rbac::{codes, Actor, CrudAction};
use domain::models::system_config::{
    ConfigEntryView, ConfigSnapshot, ConfigType, SetConfigRequest, SystemConfigEntry,
};
use domain::services::ensure;
use persistence::repositories::{ConfigWrite, SystemConfigRepository};
use sqlx::PgPool;
use std::sync::{Arc, RwLock};

use crate::error::{ApiError, ApiResult};

/// Shared handle to the current snapshot.
#[derive(Clone, Default)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl ConfigStore {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn replace(&self, snapshot: ConfigSnapshot) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(snapshot);
    }

    /// Reads every row and swaps in a fresh snapshot.
    pub async fn reload(&self, pool: &PgPool) -> ApiResult<Arc<ConfigSnapshot>> {
        let entries: Vec<SystemConfigEntry> = SystemConfigRepository::new(pool.clone())
            .list()
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let count = entries.len();
        self.replace(ConfigSnapshot::new(entries, Utc::now()));
        tracing::debug!(entries = count, "System config snapshot reloaded");
        Ok(self.snapshot())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ConfigStore")
            .field("entries", &snapshot.len())
            .field("loaded_at", &snapshot.loaded_at())
            .finish()
    }
}

pub fn entry_view(entry: &SystemConfigEntry) -> ApiResult<ConfigEntryView> {
    Ok(ConfigEntryView {
        key: entry.key.clone(),
        value: entry.typed_value()?,
        config_type: entry.config_type,
        description: entry.description.clone(),
        is_public: entry.is_public,
        updated_at: entry.updated_at,
    })
}

/// Entries that fail to parse are skipped so one bad row cannot hide the rest.
fn views<'a>(entries: impl IntoIterator<Item = &'a SystemConfigEntry>) -> Vec<ConfigEntryView> {
    entries
        .into_iter()
        .filter_map(|entry| match entry_view(entry) {
            Ok(view) => Some(view),
            Err(e) => {
                tracing::warn!(key = %entry.key, error = %e, "Skipping unparseable config entry");
                None
            }
        })
        .collect()
}

pub struct ConfigService {
    pool: PgPool,
    store: ConfigStore,
}

impl ConfigService {
    pub fn new(pool: PgPool, store: ConfigStore) -> Self {
        Self { pool, store }
    }

    pub fn public_entries(&self) -> Vec<ConfigEntryView> {
        views(self.store.snapshot().public_entries())
    }

    pub fn all_entries(&self, actor: &Actor) -> ApiResult<Vec<ConfigEntryView>> {
        ensure(actor, codes::CONFIG_MANAGE, CrudAction::Read, None)?;
        Ok(views(self.store.snapshot().all_entries()))
    }

    /// Validates the value against its type, writes it and swaps the snapshot.
    pub async fn set(
        &self,
        actor: &Actor,
        key: &str,
        request: &SetConfigRequest,
    ) -> ApiResult<ConfigEntryView> {
        ensure(actor, codes::CONFIG_MANAGE, CrudAction::Update, None)?;
        if key.trim().is_empty() || key.len() > 100 {
            return Err(ApiError::Validation(
                "Config key must be 1-100 characters".into(),
            ));
        }

        let snapshot = self.store.snapshot();
        let config_type = request
            .config_type
            .or_else(|| snapshot.entry(key).map(|e| e.config_type))
            .unwrap_or(ConfigType::String);
        config_type.parse(&request.value)?;

        let entity = SystemConfigRepository::new(self.pool.clone())
            .upsert(ConfigWrite {
                key,
                value: &request.value,
                config_type: Some(config_type),
                description: request.description.as_deref(),
                is_public: request.is_public,
                updated_by: Some(actor.user_id),
            })
            .await?;

        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            key = %key,
            config_type = %config_type,
            "System config updated"
        );

        self.store.reload(&self.pool).await?;
        entry_view(&entity.into())
    }
}
