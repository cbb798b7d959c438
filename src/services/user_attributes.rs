use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::sync::RwLock;

use crate::entities::user_meta_entity as user_meta;
use crate::error::AppResult;

/// Attribute keys the gateway reads and writes.
pub mod keys {
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const PHONE_VERIFIED: &str = "whatsapp_phone_verified";
    pub const VERIFICATION_CODE: &str = "verification_code";
    pub const VERIFICATION_CODE_ISSUED_AT: &str = "verification_code_issued_at";
}

/// Per-user key/value attributes owned by the host application.
#[async_trait]
pub trait UserAttributeStore: Send + Sync {
    async fn get(&self, user_id: i64, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, user_id: i64, key: &str, value: &str) -> AppResult<()>;

    async fn delete(&self, user_id: i64, key: &str) -> AppResult<()>;
}

pub fn encode_flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// `"1"`, `"true"` and other non-zero integers are true; absent or anything
/// else is false.
pub fn parse_flag(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) => v.parse::<i64>().map(|n| n != 0).unwrap_or(false),
    }
}

/// Store backed by the `user_meta` table.
pub struct DbUserAttributeStore {
    pool: DatabaseConnection,
}

impl DbUserAttributeStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserAttributeStore for DbUserAttributeStore {
    async fn get(&self, user_id: i64, key: &str) -> AppResult<Option<String>> {
        let row = user_meta::Entity::find()
            .filter(user_meta::Column::UserId.eq(user_id))
            .filter(user_meta::Column::MetaKey.eq(key))
            .one(&self.pool)
            .await?;
        Ok(row.map(|m| m.meta_value))
    }

    async fn set(&self, user_id: i64, key: &str, value: &str) -> AppResult<()> {
        let model = user_meta::ActiveModel {
            user_id: Set(user_id),
            meta_key: Set(key.to_string()),
            meta_value: Set(value.to_string()),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        // single-statement upsert on (user_id, meta_key)
        user_meta::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([user_meta::Column::UserId, user_meta::Column::MetaKey])
                    .update_columns([user_meta::Column::MetaValue, user_meta::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, user_id: i64, key: &str) -> AppResult<()> {
        user_meta::Entity::delete_many()
            .filter(user_meta::Column::UserId.eq(user_id))
            .filter(user_meta::Column::MetaKey.eq(key))
            .exec(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-process store, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryUserAttributeStore {
    attributes: Arc<RwLock<HashMap<(i64, String), String>>>,
}

impl MemoryUserAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attribute currently stored for the user, sorted by key.
    pub async fn snapshot(&self, user_id: i64) -> Vec<(String, String)> {
        let attributes = self.attributes.read().await;
        let mut entries: Vec<(String, String)> = attributes
            .iter()
            .filter(|((id, _), _)| *id == user_id)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect();
        entries.sort();
        entries
    }
}

#[async_trait]
impl UserAttributeStore for MemoryUserAttributeStore {
    async fn get(&self, user_id: i64, key: &str) -> AppResult<Option<String>> {
        let attributes = self.attributes.read().await;
        Ok(attributes.get(&(user_id, key.to_string())).cloned())
    }

    async fn set(&self, user_id: i64, key: &str, value: &str) -> AppResult<()> {
        let mut attributes = self.attributes.write().await;
        attributes.insert((user_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, user_id: i64, key: &str) -> AppResult<()> {
        let mut attributes = self.attributes.write().await;
        attributes.remove(&(user_id, key.to_string()));
        Ok(())
    }
}
