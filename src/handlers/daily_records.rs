use axum::{extract::State, Extension};
use chrono::{Duration, Utc};
use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::daily_record::{DailyRangeQuery, DailyRecord, UpsertDailyRecordRequest};
use crate::models::items::{CreateItemRequest, ItemList, TitledItem, UpdateItemRequest};
use crate::services::checkin_stats::{format_date, today};
use crate::services::validate::parse_date;
use crate::AppState;

/// Normalizes a path date to `YYYY-MM-DD`, rejecting impossible dates.
fn record_date(raw: &str) -> AppResult<String> {
    parse_date(raw).map(format_date)
}

async fn fetch_record(db: &SqlitePool, user_id: Uuid, date: &str) -> AppResult<Option<DailyRecord>> {
    Ok(sqlx::query_as::<_, DailyRecord>(
        "SELECT * FROM daily_records WHERE user_id = ? AND date = ?",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(db)
    .await?)
}

async fn existing_record(db: &SqlitePool, user_id: Uuid, date: &str) -> AppResult<DailyRecord> {
    fetch_record(db, user_id, date)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily record not found".into()))
}

/// Upsert keyed on `(user_id, date)`; the caller bumps `updated_at`.
async fn save_record(db: &SqlitePool, record: &DailyRecord) -> AppResult<DailyRecord> {
    Ok(sqlx::query_as::<_, DailyRecord>(
        r#"
        INSERT INTO daily_records (id, user_id, date, trading_plans, reflection, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE SET
            trading_plans = excluded.trading_plans,
            reflection = excluded.reflection,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(&record.date)
    .bind(&record.trading_plans)
    .bind(&record.reflection)
    .bind(record.created_at)
    .bind(record.updated_at)
    .fetch_one(db)
    .await?)
}

async fn load_or_new(db: &SqlitePool, user_id: Uuid, date: String) -> AppResult<DailyRecord> {
    Ok(match fetch_record(db, user_id, &date).await? {
        Some(record) => record,
        None => DailyRecord::new(user_id, date, Utc::now()),
    })
}

pub async fn list_daily_records(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<DailyRangeQuery>,
) -> AppResult<ApiResponse<Vec<DailyRecord>>> {
    let end = match query.end.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    let start = match query.start.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => end - Duration::days(30),
    };
    if start > end {
        return Err(AppError::Validation("start must not be after end".into()));
    }

    let records = sqlx::query_as::<_, DailyRecord>(
        r#"
        SELECT * FROM daily_records
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(format_date(start))
    .bind(format_date(end))
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(records))
}

/// `data` is null when nothing was saved for that date yet.
pub async fn get_daily_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(date): ApiPath<String>,
) -> AppResult<ApiResponse<Option<DailyRecord>>> {
    let date = record_date(&date)?;
    let record = fetch_record(&state.db, auth_user.id, &date).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn upsert_daily_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(date): ApiPath<String>,
    ApiJson(body): ApiJson<UpsertDailyRecordRequest>,
) -> AppResult<ApiResponse<DailyRecord>> {
    let date = record_date(&date)?;
    let mut record = load_or_new(&state.db, auth_user.id, date).await?;

    if let Some(plans) = body.trading_plans {
        record.trading_plans = Json(ItemList::from_drafts(plans));
    }
    if let Some(reflection) = body.reflection {
        record.reflection = reflection;
    }
    record.updated_at = Utc::now();

    let saved = save_record(&state.db, &record).await?;
    tracing::info!(user_id = %auth_user.id, date = %saved.date, "Daily record saved");
    Ok(ApiResponse::with_message("Daily record saved", saved))
}

pub async fn add_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(date): ApiPath<String>,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let date = record_date(&date)?;
    let mut record = load_or_new(&state.db, auth_user.id, date).await?;

    let item = record.trading_plans.0.push(&body.title, body.content)?.clone();
    record.updated_at = Utc::now();
    save_record(&state.db, &record).await?;

    Ok(ApiResponse::with_message("Plan added", item))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath((date, item_id)): ApiPath<(String, String)>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let date = record_date(&date)?;
    let mut record = existing_record(&state.db, auth_user.id, &date).await?;

    let item = record.trading_plans.0.update(&item_id, body)?.clone();
    record.updated_at = Utc::now();
    save_record(&state.db, &record).await?;

    Ok(ApiResponse::with_message("Plan updated", item))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath((date, item_id)): ApiPath<(String, String)>,
) -> AppResult<ApiResponse<TitledItem>> {
    let date = record_date(&date)?;
    let mut record = existing_record(&state.db, auth_user.id, &date).await?;

    let removed = record.trading_plans.0.remove(&item_id)?;
    record.updated_at = Utc::now();
    save_record(&state.db, &record).await?;

    tracing::info!(user_id = %auth_user.id, date = %date, item_id = %item_id, "Daily plan deleted");
    Ok(ApiResponse::with_message("Plan deleted", removed))
}
