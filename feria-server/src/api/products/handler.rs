//! Product API Handlers
//!
//! Create/update consume `multipart/form-data` (text fields + optional image
//! file), mirroring the admin dashboard form. Numeric fields arrive as
//! strings and are rejected at parse time.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::repository::product::{self, ProductFilter};
use crate::utils::validation::{validate_required_text, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::{AppError, AppResult, ErrorCode};

/// Query params for listing products
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Paginated product list
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub products: Vec<Product>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Multipart form fields collected for create/update
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<String>,
    stock: Option<String>,
    category: Option<String>,
    is_active: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<ProductForm> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::validation("No filename provided in image field"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
                    .to_vec();
                form.image = Some((filename, data));
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
                match name.as_str() {
                    "name" => form.name = Some(value),
                    "price" => form.price = Some(value),
                    "stock" => form.stock = Some(value),
                    "category" => form.category = Some(value),
                    "is_active" => form.is_active = Some(value),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

/// 数字字段来自表单字符串，解析失败即拒绝
fn parse_price(value: &str) -> AppResult<f64> {
    let price: f64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::validation("Price must be a valid positive number"))?;
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("Price must be a valid positive number"));
    }
    Ok(price)
}

fn parse_stock(value: &str) -> AppResult<i64> {
    let stock: i64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::validation("Stock must be a non-negative number"))?;
    if stock < 0 {
        return Err(AppError::validation("Stock must be a non-negative number"));
    }
    Ok(stock)
}

fn parse_bool(value: &str) -> AppResult<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::validation("is_active must be true or false")),
    }
}

/// GET /api/products - 商品列表 (公共路由)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let filter = ProductFilter {
        category: query.category,
        is_active: query.is_active,
        search: query.search,
    };
    let products = product::find_all(&state.db, &filter, query.limit, query.offset)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let total = product::count(&state.db, &filter)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(ListResponse {
        products,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// GET /api/products/{id} - 单个商品 (公共路由)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    let found = product::find_by_id(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(Json(found))
}

/// GET /api/products/meta/categories - 分类列表 (公共路由)
pub async fn categories(State(state): State<ServerState>) -> AppResult<Json<Vec<String>>> {
    let categories = product::categories(&state.db)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(categories))
}

/// POST /api/products - 创建商品
pub async fn create(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> AppResult<Json<Product>> {
    let form = read_form(multipart).await?;

    let name = form
        .name
        .ok_or_else(|| AppError::validation("Name, price, and category are required"))?;
    let price = form
        .price
        .ok_or_else(|| AppError::validation("Name, price, and category are required"))?;
    let category = form
        .category
        .ok_or_else(|| AppError::validation("Name, price, and category are required"))?;

    validate_required_text(&name, "name", MAX_NAME_LEN)?;
    validate_required_text(&category, "category", MAX_SHORT_TEXT_LEN)?;
    let price = parse_price(&price)?;
    let stock = form.stock.as_deref().map(parse_stock).transpose()?;

    let image_url = match form.image {
        Some((filename, data)) => Some(state.storage().save_product_image(&data, &filename)?),
        None => None,
    };

    let created = product::create(
        &state.db,
        ProductCreate {
            name,
            price,
            stock,
            category,
            image_url,
        },
    )
    .await
    .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(product_id = created.id, name = %created.name, "Product created");

    Ok(Json(created))
}

/// PUT /api/products/{id} - 更新商品 (换图时删除旧图)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<Product>> {
    let existing = product::find_by_id(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let form = read_form(multipart).await?;

    let price = form.price.as_deref().map(parse_price).transpose()?;
    let stock = form.stock.as_deref().map(parse_stock).transpose()?;
    let is_active = form.is_active.as_deref().map(parse_bool).transpose()?;
    if let Some(ref name) = form.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(ref category) = form.category {
        validate_required_text(category, "category", MAX_SHORT_TEXT_LEN)?;
    }

    let image_url = match form.image {
        Some((filename, data)) => {
            let url = state.storage().save_product_image(&data, &filename)?;
            // 新旧不同才删除旧文件 (内容寻址：同图同名)
            if let Some(ref old) = existing.image_url
                && old != &url
            {
                state.storage().delete(old);
            }
            Some(url)
        }
        None => None,
    };

    if form.name.is_none()
        && price.is_none()
        && stock.is_none()
        && form.category.is_none()
        && is_active.is_none()
        && image_url.is_none()
    {
        return Err(AppError::validation("No fields to update"));
    }

    let updated = product::update(
        &state.db,
        id,
        ProductUpdate {
            name: form.name,
            price,
            stock,
            category: form.category,
            image_url,
            is_active,
        },
    )
    .await
    .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(product_id = id, "Product updated");

    Ok(Json(updated))
}

/// DELETE /api/products/{id} - 删除商品及其图片
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let existing = product::find_by_id(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    product::delete(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    if let Some(ref image_url) = existing.image_url {
        state.storage().delete(image_url);
    }

    tracing::info!(product_id = id, "Product deleted");

    Ok(Json(true))
}
