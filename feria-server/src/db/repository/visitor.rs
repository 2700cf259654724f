//! Visitor Repository

use super::{RepoError, RepoResult};
use shared::models::{
    MovementAction, MovementWithVisitor, Visitor, VisitorCreate, VisitorStatus,
};
use sqlx::SqlitePool;

const VISITOR_SELECT: &str = "SELECT id, qr_data, visitor_name, booking_reference, guest_count, phone, email, company, purpose, status, entry_time, exit_time, is_active, created_at FROM visitor";

pub async fn find_all(
    pool: &SqlitePool,
    status: Option<VisitorStatus>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Visitor>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "{} WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                VISITOR_SELECT
            );
            sqlx::query_as::<_, Visitor>(&sql)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
                VISITOR_SELECT
            );
            sqlx::query_as::<_, Visitor>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn count(pool: &SqlitePool, status: Option<VisitorStatus>) -> RepoResult<i64> {
    let total = match status {
        Some(status) => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visitor WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visitor")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(total)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Visitor>> {
    let sql = format!("{} WHERE id = ?", VISITOR_SELECT);
    let row = sqlx::query_as::<_, Visitor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_qr_data(pool: &SqlitePool, qr_data: &str) -> RepoResult<Option<Visitor>> {
    let sql = format!("{} WHERE qr_data = ?", VISITOR_SELECT);
    let row = sqlx::query_as::<_, Visitor>(&sql)
        .bind(qr_data)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(
    pool: &SqlitePool,
    qr_data: &str,
    data: VisitorCreate,
) -> RepoResult<Visitor> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let guest_count = data.guest_count.unwrap_or(1);
    sqlx::query(
        "INSERT INTO visitor (id, qr_data, visitor_name, booking_reference, guest_count, phone, email, company, purpose, status, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'registered', 1, ?)",
    )
    .bind(id)
    .bind(qr_data)
    .bind(&data.visitor_name)
    .bind(&data.booking_reference)
    .bind(guest_count)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.company)
    .bind(&data.purpose)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create visitor".into()))
}

/// Flip badge activation (revocation / reinstatement)
pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE visitor SET is_active = ? WHERE id = ?")
        .bind(is_active)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    // Movements cascade via the FK
    let rows = sqlx::query("DELETE FROM visitor WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// registered/exited → entered; a re-entry clears the stale exit timestamp
pub async fn mark_entered(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<()> {
    sqlx::query("UPDATE visitor SET status = 'entered', entry_time = ?, exit_time = NULL WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// entered → exited
pub async fn mark_exited(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<()> {
    sqlx::query("UPDATE visitor SET status = 'exited', exit_time = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Append a gate scan to the audit log
pub async fn record_movement(
    pool: &SqlitePool,
    visitor_id: i64,
    action: MovementAction,
    gate_location: &str,
    scanned_by: &str,
    timestamp: i64,
) -> RepoResult<()> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO visitor_movement (id, visitor_id, action, gate_location, scanned_by, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(visitor_id)
    .bind(action)
    .bind(gate_location)
    .bind(scanned_by)
    .bind(timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

const MOVEMENT_SELECT: &str = "SELECT vm.id, vm.visitor_id, v.visitor_name, vm.action, vm.gate_location, vm.scanned_by, vm.timestamp FROM visitor_movement vm JOIN visitor v ON vm.visitor_id = v.id";

pub async fn find_movements(
    pool: &SqlitePool,
    visitor_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<MovementWithVisitor>> {
    let rows = match visitor_id {
        Some(visitor_id) => {
            let sql = format!(
                "{} WHERE vm.visitor_id = ? ORDER BY vm.timestamp DESC LIMIT ? OFFSET ?",
                MOVEMENT_SELECT
            );
            sqlx::query_as::<_, MovementWithVisitor>(&sql)
                .bind(visitor_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "{} ORDER BY vm.timestamp DESC LIMIT ? OFFSET ?",
                MOVEMENT_SELECT
            );
            sqlx::query_as::<_, MovementWithVisitor>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn count_movements(pool: &SqlitePool, visitor_id: Option<i64>) -> RepoResult<i64> {
    let total = match visitor_id {
        Some(visitor_id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM visitor_movement WHERE visitor_id = ?",
            )
            .bind(visitor_id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visitor_movement")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(total)
}
