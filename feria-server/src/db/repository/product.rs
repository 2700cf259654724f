//! Product Repository

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate, ProductUpdate};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Arguments, SqlitePool};

const PRODUCT_SELECT: &str = "SELECT id, name, price, stock, category, image_url, is_active, created_at, updated_at FROM product";

/// List filter (category / active flag / name search)
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn build_where(filter: &ProductFilter, args: &mut SqliteArguments<'_>) -> RepoResult<String> {
    let mut conditions: Vec<&str> = Vec::new();
    if let Some(ref category) = filter.category {
        conditions.push("category = ?");
        args.add(category.clone())
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if let Some(is_active) = filter.is_active {
        conditions.push("is_active = ?");
        args.add(is_active)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if let Some(ref search) = filter.search {
        conditions.push("(name LIKE ? OR category LIKE ?)");
        let pattern = format!("%{search}%");
        args.add(pattern.clone())
            .map_err(|e| RepoError::Database(e.to_string()))?;
        args.add(pattern)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if conditions.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

pub async fn find_all(
    pool: &SqlitePool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Product>> {
    let mut args = SqliteArguments::default();
    let where_clause = build_where(filter, &mut args)?;
    args.add(limit)
        .map_err(|e| RepoError::Database(e.to_string()))?;
    args.add(offset)
        .map_err(|e| RepoError::Database(e.to_string()))?;
    let sql = format!(
        "{PRODUCT_SELECT}{where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as_with::<_, Product, _>(&sql, args)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool, filter: &ProductFilter) -> RepoResult<i64> {
    let mut args = SqliteArguments::default();
    let where_clause = build_where(filter, &mut args)?;
    let sql = format!("SELECT COUNT(*) FROM product{where_clause}");
    let total = sqlx::query_scalar_with::<_, i64, _>(&sql, args)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{} WHERE id = ?", PRODUCT_SELECT);
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let stock = data.stock.unwrap_or(0);
    sqlx::query(
        "INSERT INTO product (id, name, price, stock, category, image_url, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.price)
    .bind(stock)
    .bind(&data.category)
    .bind(&data.image_url)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ProductUpdate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET name = COALESCE(?, name), price = COALESCE(?, price), stock = COALESCE(?, stock), category = COALESCE(?, category), image_url = COALESCE(?, image_url), is_active = COALESCE(?, is_active), updated_at = ? WHERE id = ?",
    )
    .bind(&data.name)
    .bind(data.price)
    .bind(data.stock)
    .bind(&data.category)
    .bind(&data.image_url)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Distinct categories of active products (shop filter dropdown)
pub async fn categories(pool: &SqlitePool) -> RepoResult<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM product WHERE is_active = 1 ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
