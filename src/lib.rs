use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::verification::{LogSmsSender, SmsSender, VerificationCodes};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
    pub codes: VerificationCodes,
    pub sms: Arc<dyn SmsSender>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self::with_sms_sender(db, config, Arc::new(LogSmsSender))
    }

    pub fn with_sms_sender(db: SqlitePool, config: Config, sms: Arc<dyn SmsSender>) -> Self {
        let rate_limiter =
            RateLimitState::new(config.auth_rate_limit_max, config.auth_rate_limit_window_secs);
        let codes = VerificationCodes::new(Duration::from_secs(config.sms_code_ttl_secs));
        Self {
            db,
            config: Arc::new(config),
            rate_limiter,
            codes,
            sms,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let user_public_routes = Router::new()
        .route("/api/user/register", post(handlers::user::register))
        .route("/api/user/login", post(handlers::user::login))
        .route("/api/user/send-code", post(handlers::user::send_code))
        .route("/api/user/verify-code", post(handlers::user::verify_code))
        .route(
            "/api/user/register-by-code",
            post(handlers::user::register_by_code),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(user_public_routes);

    let protected_routes = Router::new()
        // Account
        .route("/api/user/info", get(handlers::user::info))
        .route("/api/user/username", put(handlers::user::change_username))
        .route("/api/user/password", put(handlers::user::change_password))
        .route("/api/user/logout", post(handlers::user::logout))
        // Check-ins
        .route(
            "/api/checkin",
            post(handlers::checkins::create_checkin).get(handlers::checkins::list_month),
        )
        .route("/api/checkin/today", get(handlers::checkins::today_status))
        .route("/api/checkin/stats", get(handlers::checkins::get_stats))
        // Settings
        .route(
            "/api/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/api/settings/homework",
            post(handlers::settings::add_homework),
        )
        .route(
            "/api/settings/homework/:id",
            put(handlers::settings::update_homework).delete(handlers::settings::delete_homework),
        )
        .route("/api/settings/plans", post(handlers::settings::add_plan))
        .route(
            "/api/settings/plans/:id",
            put(handlers::settings::update_plan).delete(handlers::settings::delete_plan),
        )
        // Daily records
        .route("/api/daily", get(handlers::daily_records::list_daily_records))
        .route(
            "/api/daily/:date",
            get(handlers::daily_records::get_daily_record)
                .put(handlers::daily_records::upsert_daily_record),
        )
        .route(
            "/api/daily/:date/plans",
            post(handlers::daily_records::add_plan),
        )
        .route(
            "/api/daily/:date/plans/:id",
            put(handlers::daily_records::update_plan)
                .delete(handlers::daily_records::delete_plan),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(config.frontend_url.as_str())
        .chain(config.cors_extra_origins.iter().map(String::as_str))
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
