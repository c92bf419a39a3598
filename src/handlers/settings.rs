use axum::{extract::State, Extension};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::items::{CreateItemRequest, ItemList, TitledItem, UpdateItemRequest};
use crate::models::settings::{UpdateSettingsRequest, UserSettings};
use crate::AppState;

/// Which titled list inside the settings document a sub-item route targets.
#[derive(Debug, Clone, Copy)]
enum SettingsList {
    Homework,
    Plans,
}

impl SettingsList {
    fn of(self, settings: &mut UserSettings) -> &mut ItemList {
        match self {
            SettingsList::Homework => &mut settings.trading_homework.0,
            SettingsList::Plans => &mut settings.trading_plans.0,
        }
    }
}

async fn fetch_settings(db: &SqlitePool, user_id: Uuid) -> AppResult<Option<UserSettings>> {
    Ok(
        sqlx::query_as::<_, UserSettings>("SELECT * FROM user_settings WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(db)
            .await?,
    )
}

/// Last write wins.
async fn save_settings(db: &SqlitePool, settings: &UserSettings) -> AppResult<UserSettings> {
    let saved = sqlx::query_as::<_, UserSettings>(
        r#"
        INSERT INTO user_settings
            (user_id, preset_principles, custom_principles, trading_homework, trading_plans, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id) DO UPDATE SET
            preset_principles = excluded.preset_principles,
            custom_principles = excluded.custom_principles,
            trading_homework = excluded.trading_homework,
            trading_plans = excluded.trading_plans,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(settings.user_id)
    .bind(&settings.preset_principles)
    .bind(&settings.custom_principles)
    .bind(&settings.trading_homework)
    .bind(&settings.trading_plans)
    .bind(settings.updated_at)
    .fetch_one(db)
    .await?;
    Ok(saved)
}

/// Creates the document with defaults on first access and refills empty
/// homework/plan lists on later ones.
async fn load_or_create(db: &SqlitePool, user_id: Uuid) -> AppResult<UserSettings> {
    match fetch_settings(db, user_id).await? {
        Some(mut settings) => {
            if settings.backfill_defaults() {
                settings.updated_at = Utc::now();
                return save_settings(db, &settings).await;
            }
            Ok(settings)
        }
        None => {
            let settings = UserSettings::with_defaults(user_id, Utc::now());
            sqlx::query(
                r#"
                INSERT INTO user_settings
                    (user_id, preset_principles, custom_principles, trading_homework, trading_plans, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(settings.user_id)
            .bind(&settings.preset_principles)
            .bind(&settings.custom_principles)
            .bind(&settings.trading_homework)
            .bind(&settings.trading_plans)
            .bind(settings.updated_at)
            .execute(db)
            .await?;
            tracing::debug!(user_id = %user_id, "Created default settings");

            // A concurrent request may have created it first; read back whichever won.
            fetch_settings(db, user_id)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Settings vanished after insert")))
        }
    }
}

async fn existing_settings(db: &SqlitePool, user_id: Uuid) -> AppResult<UserSettings> {
    fetch_settings(db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Settings not found".into()))
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<ApiResponse<UserSettings>> {
    let settings = load_or_create(&state.db, auth_user.id).await?;
    Ok(ApiResponse::ok(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<UpdateSettingsRequest>,
) -> AppResult<ApiResponse<UserSettings>> {
    let mut settings = load_or_create(&state.db, auth_user.id).await?;
    settings.apply(body);
    settings.updated_at = Utc::now();

    let saved = save_settings(&state.db, &settings).await?;
    tracing::info!(user_id = %auth_user.id, "Settings updated");
    Ok(ApiResponse::with_message("Settings saved", saved))
}

async fn add_item(
    state: &AppState,
    user_id: Uuid,
    list: SettingsList,
    body: CreateItemRequest,
) -> AppResult<TitledItem> {
    let mut settings = load_or_create(&state.db, user_id).await?;
    let item = list.of(&mut settings).push(&body.title, body.content)?.clone();
    settings.updated_at = Utc::now();
    save_settings(&state.db, &settings).await?;
    Ok(item)
}

async fn update_item(
    state: &AppState,
    user_id: Uuid,
    list: SettingsList,
    item_id: &str,
    body: UpdateItemRequest,
) -> AppResult<TitledItem> {
    let mut settings = existing_settings(&state.db, user_id).await?;
    let item = list.of(&mut settings).update(item_id, body)?.clone();
    settings.updated_at = Utc::now();
    save_settings(&state.db, &settings).await?;
    Ok(item)
}

async fn delete_item(
    state: &AppState,
    user_id: Uuid,
    list: SettingsList,
    item_id: &str,
) -> AppResult<TitledItem> {
    let mut settings = existing_settings(&state.db, user_id).await?;
    let removed = list.of(&mut settings).remove(item_id)?;
    settings.updated_at = Utc::now();
    save_settings(&state.db, &settings).await?;
    tracing::info!(user_id = %user_id, item_id = %item_id, list = ?list, "Settings item deleted");
    Ok(removed)
}

pub async fn add_homework(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = add_item(&state, auth_user.id, SettingsList::Homework, body).await?;
    Ok(ApiResponse::with_message("Homework added", item))
}

pub async fn update_homework(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(item_id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = update_item(&state, auth_user.id, SettingsList::Homework, &item_id, body).await?;
    Ok(ApiResponse::with_message("Homework updated", item))
}

pub async fn delete_homework(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(item_id): ApiPath<String>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = delete_item(&state, auth_user.id, SettingsList::Homework, &item_id).await?;
    Ok(ApiResponse::with_message("Homework deleted", item))
}

pub async fn add_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = add_item(&state, auth_user.id, SettingsList::Plans, body).await?;
    Ok(ApiResponse::with_message("Plan added", item))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(item_id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = update_item(&state, auth_user.id, SettingsList::Plans, &item_id, body).await?;
    Ok(ApiResponse::with_message("Plan updated", item))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(item_id): ApiPath<String>,
) -> AppResult<ApiResponse<TitledItem>> {
    let item = delete_item(&state, auth_user.id, SettingsList::Plans, &item_id).await?;
    Ok(ApiResponse::with_message("Plan deleted", item))
}
