use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::items::{ItemDraft, ItemList};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub trading_plans: Json<ItemList>,
    pub reflection: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyRecord {
    pub fn new(user_id: Uuid, date: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            trading_plans: Json(ItemList::default()),
            reflection: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// PUT /api/daily/:date. Omitted fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDailyRecordRequest {
    pub trading_plans: Option<Vec<ItemDraft>>,
    pub reflection: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}
