use axum::{extract::State, Extension};
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::ApiResponse;
use crate::error::{conflict_on_unique, AppResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::checkin::{
    CheckInKind, CheckInRecord, CreateCheckInRequest, MonthQuery, TodayStatus,
};
use crate::services::checkin_stats::{
    compute_stats, format_date, today, CheckInStats, MonthWindow, MonthlyCheckIns,
};
use crate::services::validate::parse_date;
use crate::AppState;

/// Records one check-in. The `(user_id, date)` UNIQUE constraint rejects a
/// second record for the same day, including two racing requests.
pub async fn create_checkin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateCheckInRequest>,
) -> AppResult<ApiResponse<CheckInRecord>> {
    let kind: CheckInKind = body.kind.as_deref().unwrap_or_default().parse()?;
    let date = match body.date.as_deref() {
        Some(raw) => format_date(parse_date(raw)?),
        None => format_date(today()),
    };

    let record = sqlx::query_as::<_, CheckInRecord>(
        r#"
        INSERT INTO checkins (id, user_id, date, kind, is_completed, incomplete_tasks, note, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&date)
    .bind(kind)
    .bind(kind.is_completed())
    .bind(Json(&body.incomplete_tasks))
    .bind(&body.note)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, "Already checked in for this date"))?;

    tracing::info!(user_id = %auth_user.id, date = %record.date, kind = %kind, "Check-in recorded");
    Ok(ApiResponse::with_message("Check-in recorded", record))
}

pub async fn list_month(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> AppResult<ApiResponse<MonthlyCheckIns>> {
    let window = MonthWindow::resolve(query.year, query.month, today())?;

    let records = sqlx::query_as::<_, CheckInRecord>(
        r#"
        SELECT * FROM checkins
        WHERE user_id = ? AND date >= ? AND date <= ?
        ORDER BY date ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(window.start())
    .bind(window.end())
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(MonthlyCheckIns::new(&window, records)))
}

pub async fn today_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<ApiResponse<TodayStatus>> {
    let record = sqlx::query_as::<_, CheckInRecord>(
        "SELECT * FROM checkins WHERE user_id = ? AND date = ?",
    )
    .bind(auth_user.id)
    .bind(format_date(today()))
    .fetch_optional(&state.db)
    .await?;

    Ok(ApiResponse::ok(TodayStatus {
        checked_in: record.is_some(),
        record,
    }))
}

/// Statistics are derived from the full history on every call; gaps can sit
/// anywhere, so nothing short of all records gives a correct streak.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<ApiResponse<CheckInStats>> {
    let records = sqlx::query_as::<_, CheckInRecord>(
        "SELECT * FROM checkins WHERE user_id = ? ORDER BY date DESC",
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let stats = compute_stats(&records, today());
    tracing::debug!(
        user_id = %auth_user.id,
        records = records.len(),
        streak = stats.streak,
        "Computed check-in stats"
    );
    Ok(ApiResponse::ok(stats))
}
