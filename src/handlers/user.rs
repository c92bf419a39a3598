use axum::{extract::State, Extension};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    jwt::create_token,
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::dto::{ApiResponse, AuthResponse, CodeVerification};
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::models::user::{
    ChangePasswordRequest, ChangeUsernameRequest, LoginRequest, RegisterRequest, SendCodeRequest,
    User, UserProfile, VerifyCodeRequest,
};
use crate::services::validate::mask_phone;
use crate::AppState;

const PHONE_TAKEN: &str = "Phone number already registered";
const USERNAME_TAKEN: &str = "Username already taken";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterByCodeRequest {
    #[validate(custom = "crate::services::validate::validate_phone")]
    pub phone: String,
    pub code: String,
}

/// Distinguishes which UNIQUE column a failed insert/update collided with.
fn user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = if db.message().contains("phone") {
                PHONE_TAKEN
            } else {
                USERNAME_TAKEN
            };
            return AppError::Conflict(message.into());
        }
    }
    AppError::Database(err)
}

pub(crate) async fn find_user(db: &SqlitePool, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn phone_exists(db: &SqlitePool, phone: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE phone = ?")
        .bind(phone)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

async fn username_exists(db: &SqlitePool, username: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

/// Hashes the password and inserts the user. The UNIQUE constraints are the
/// final word on duplicates, so callers' pre-checks only improve messages.
async fn insert_user(
    db: &SqlitePool,
    username: &str,
    phone: &str,
    password: &str,
) -> AppResult<User> {
    let password_hash = hash_password(password)?;
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, phone, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(phone)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
    .map_err(user_conflict)
}

fn auth_response(user: User, state: &AppState) -> AppResult<AuthResponse> {
    let token = create_token(user.id, &user.phone, &state.config)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<RegisterRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    body.username = body.username.trim().to_string();
    body.phone = body.phone.trim().to_string();
    body.validate()?;

    if phone_exists(&state.db, &body.phone).await? {
        return Err(AppError::Conflict(PHONE_TAKEN.into()));
    }
    if username_exists(&state.db, &body.username).await? {
        return Err(AppError::Conflict(USERNAME_TAKEN.into()));
    }

    let user = insert_user(&state.db, &body.username, &body.phone, &body.password).await?;
    tracing::info!(user_id = %user.id, phone = %mask_phone(&user.phone), "User registered");

    Ok(ApiResponse::with_message(
        "Registration successful",
        auth_response(user, &state)?,
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let phone = body.phone.trim();
    if phone.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Phone number and password are required".into(),
        ));
    }

    // Unknown phone and wrong password produce the same error.
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = ?")
        .bind(phone)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&body.password, &user.password_hash)? {
        tracing::info!(phone = %mask_phone(phone), "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiResponse::with_message(
        "Login successful",
        auth_response(user, &state)?,
    ))
}

pub async fn send_code(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<SendCodeRequest>,
) -> AppResult<ApiResponse<()>> {
    body.phone = body.phone.trim().to_string();
    body.validate()?;

    let code = state.codes.issue(&body.phone).await;
    state
        .sms
        .send_code(&body.phone, &code)
        .map_err(|e| AppError::Internal(e.context("Failed to send verification code")))?;

    Ok(ApiResponse::message("Verification code sent"))
}

pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<VerifyCodeRequest>,
) -> AppResult<ApiResponse<CodeVerification>> {
    body.phone = body.phone.trim().to_string();
    body.validate()?;

    let check = state.codes.verify(&body.phone, &body.code).await;
    Ok(ApiResponse::with_message(
        check.message(),
        CodeVerification {
            valid: check.is_valid(),
        },
    ))
}

/// Phone-only sign-up: the verified phone gets a generated username and the
/// configured default password.
pub async fn register_by_code(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<RegisterByCodeRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    body.phone = body.phone.trim().to_string();
    body.validate()?;

    if phone_exists(&state.db, &body.phone).await? {
        return Err(AppError::Conflict(PHONE_TAKEN.into()));
    }

    let check = state.codes.verify(&body.phone, &body.code).await;
    if !check.is_valid() {
        return Err(AppError::Validation(check.message().into()));
    }

    let username = generate_username(&state.db).await?;
    let user = insert_user(
        &state.db,
        &username,
        &body.phone,
        &state.config.default_password,
    )
    .await?;
    tracing::info!(
        user_id = %user.id,
        phone = %mask_phone(&user.phone),
        "User registered by verification code"
    );

    Ok(ApiResponse::with_message(
        "Registration successful",
        auth_response(user, &state)?,
    ))
}

async fn generate_username(db: &SqlitePool) -> AppResult<String> {
    for _ in 0..10 {
        let candidate = format!("trader{:06}", rand::thread_rng().gen_range(0..1_000_000));
        if !username_exists(db, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "Could not generate a unique username"
    )))
}

pub async fn info(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<ApiResponse<UserProfile>> {
    let user = find_user(&state.db, auth_user.id).await?;
    Ok(ApiResponse::ok(user.into()))
}

pub async fn change_username(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(mut body): ApiJson<ChangeUsernameRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    body.username = body.username.trim().to_string();
    body.validate()?;

    let user = find_user(&state.db, auth_user.id).await?;
    if user.username == body.username {
        return Ok(ApiResponse::ok(user.into()));
    }
    if username_exists(&state.db, &body.username).await? {
        return Err(AppError::Conflict(USERNAME_TAKEN.into()));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET username = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&body.username)
    .bind(Utc::now())
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await
    .map_err(user_conflict)?;

    tracing::info!(user_id = %user.id, "Username changed");
    Ok(ApiResponse::with_message("Username updated", user.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    body.validate()?;

    let user = find_user(&state.db, auth_user.id).await?;
    if !verify_password(&body.old_password, &user.password_hash)? {
        return Err(AppError::Validation("Old password is incorrect".into()));
    }

    let password_hash = hash_password(&body.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id = %auth_user.id, "Password changed");
    Ok(ApiResponse::message("Password updated"))
}

/// Tokens are not revoked; the client discards its copy.
pub async fn logout(Extension(auth_user): Extension<AuthUser>) -> ApiResponse<()> {
    tracing::info!(
        user_id = %auth_user.id,
        phone = %mask_phone(&auth_user.phone),
        "User logged out"
    );
    ApiResponse::message("Logged out")
}
