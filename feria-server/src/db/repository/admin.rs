//! Admin Repository

use super::{RepoError, RepoResult};
use shared::models::Admin;
use sqlx::SqlitePool;

const ADMIN_SELECT: &str =
    "SELECT id, email, password_hash, name, role, is_active, created_at, updated_at FROM admin";

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<Admin>> {
    let sql = format!("{} WHERE email = ?", ADMIN_SELECT);
    let row = sqlx::query_as::<_, Admin>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Admin>> {
    let sql = format!("{} WHERE id = ?", ADMIN_SELECT);
    let row = sqlx::query_as::<_, Admin>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    name: &str,
) -> RepoResult<Admin> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO admin (id, email, password_hash, name, role, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, 'admin', 1, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create admin".into()))
}
