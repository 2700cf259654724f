//! Authentication Handlers
//!
//! Handles admin registration, login and token introspection

use std::time::Duration;

use axum::{extract::State, Extension, Json};

use crate::auth::{password, CurrentAdmin};
use crate::core::ServerState;
use crate::db::repository::admin;
use crate::utils::validation::{validate_password, validate_required_text, MAX_EMAIL_LEN, MAX_NAME_LEN};
use shared::models::{AdminInfo, LoginRequest, LoginResponse, RegisterRequest};
use shared::{AppError, AppResult};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// POST /api/auth/register - 创建管理员账号
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<LoginResponse>> {
    validate_required_text(&req.email, "email", MAX_EMAIL_LEN)?;
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    validate_password(&req.password)?;

    if admin::find_by_email(&state.db, &req.email)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::already_exists("User with this email"));
    }

    let hash = password::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
    let created = admin::create(&state.db, &req.email, &hash, &req.name)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let token = state
        .jwt_service
        .generate_token(created.id, &created.email, &created.name, &created.role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(admin_id = created.id, email = %created.email, "Admin registered");

    Ok(Json(LoginResponse {
        token,
        user: AdminInfo::from(&created),
    }))
}

/// POST /api/auth/login - 管理员登录
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let account = admin::find_by_email(&state.db, &req.email)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // 统一错误信息，避免邮箱枚举
    let account = match account {
        Some(a) => {
            if !a.is_active {
                return Err(AppError::forbidden("Account has been disabled"));
            }

            let password_valid = password::verify_password(&req.password, &a.password_hash)
                .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;

            if !password_valid {
                tracing::warn!(email = %req.email, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }

            a
        }
        None => {
            tracing::warn!(email = %req.email, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let token = state
        .jwt_service
        .generate_token(account.id, &account.email, &account.name, &account.role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(admin_id = account.id, email = %account.email, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        user: AdminInfo::from(&account),
    }))
}

/// GET /api/auth/me - 当前登录管理员信息
pub async fn me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentAdmin>,
) -> AppResult<Json<AdminInfo>> {
    let account = admin::find_by_id(&state.db, current.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Admin"))?;
    Ok(Json(AdminInfo::from(&account)))
}
