//! Order API Handlers
//!
//! 下单接口消费 `multipart/form-data`：`visitor_id`、`total_amount` 为数字
//! 字符串，`items` 为 JSON 文本，`payment_proof` 为可选文件。全部解析成
//! 强类型的 [`CreateOrderRequest`] 之后才交给事务处理器。

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::repository::order::{self, OrderFilter};
use shared::message::EventType;
use shared::models::{
    CreateOrderRequest, Order, OrderItemInput, OrderStats, OrderWithItems, PaymentStatus,
    ValidatePaymentRequest,
};
use shared::{AppError, AppResult, ErrorCode};

const RESOURCE_ORDER: &str = "order";

/// Multipart form fields of a candidate order
#[derive(Debug, Default)]
struct OrderForm {
    visitor_id: Option<String>,
    items: Option<String>,
    total_amount: Option<String>,
    payment_proof: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<OrderForm> {
    let mut form = OrderForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "payment_proof" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::validation("No filename provided in payment_proof"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
                    .to_vec();
                form.payment_proof = Some((filename, data));
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
                match name.as_str() {
                    "visitor_id" => form.visitor_id = Some(value),
                    "items" => form.items = Some(value),
                    "total_amount" => form.total_amount = Some(value),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

/// 把 multipart 表单解析为强类型请求；数字串解析失败直接拒绝
fn parse_request(form: &OrderForm) -> AppResult<(i64, Vec<OrderItemInput>, f64)> {
    let (Some(visitor_id), Some(items), Some(total_amount)) =
        (&form.visitor_id, &form.items, &form.total_amount)
    else {
        return Err(AppError::validation(
            "Visitor ID, items, and total amount are required",
        ));
    };

    let visitor_id: i64 = visitor_id
        .trim()
        .parse()
        .map_err(|_| AppError::validation("Visitor ID must be a number"))?;

    let items: Vec<OrderItemInput> =
        serde_json::from_str(items).map_err(|_| AppError::validation("Invalid items format"))?;

    let total_amount: f64 = total_amount
        .trim()
        .parse()
        .map_err(|_| AppError::validation("Total amount must be a positive number"))?;

    Ok((visitor_id, items, total_amount))
}

/// POST /api/orders - 下单 (公共路由)
///
/// 校验、落库、扣库存都在 [`crate::orders::OrderProcessor`] 的单个事务内；
/// 事务提交成功后才广播 `order_created`。
pub async fn create(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> AppResult<Json<OrderWithItems>> {
    let form = read_form(multipart).await?;
    let (visitor_id, items, total_amount) = parse_request(&form)?;

    // 凭证先落盘再开事务；事务失败时留下的孤儿文件无害 (内容寻址可复用)
    let payment_proof_url = match &form.payment_proof {
        Some((filename, data)) => Some(state.storage().save_payment_proof(data, filename)?),
        None => None,
    };

    let created = state
        .order_processor()
        .create_order(CreateOrderRequest {
            visitor_id,
            items,
            total_amount,
            payment_proof_url,
        })
        .await?;

    // 广播通知 (fire-and-forget，仅在提交之后)
    state.broadcast(EventType::OrderCreated, RESOURCE_ORDER, &created);

    Ok(Json(created))
}

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<PaymentStatus>,
    pub visitor_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Paginated order list
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub orders: Vec<OrderWithItems>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/orders - 订单列表 (含订单项)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let filter = OrderFilter {
        status: query.status,
        visitor_id: query.visitor_id,
    };
    let orders = order::find_all(&state.db, &filter, query.limit, query.offset)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let total = order::count(&state.db, &filter)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(ListResponse {
        orders,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// GET /api/orders/{id} - 订单回执 (公共路由)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderWithItems>> {
    let found = order::find_with_items(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(found))
}

/// PUT /api/orders/{id}/validate - 支付审核 (pending → approved/rejected)
pub async fn validate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<ValidatePaymentRequest>,
) -> AppResult<Json<Order>> {
    let validated = state.order_processor().validate_payment(id, req).await?;

    state.broadcast(EventType::OrderValidated, RESOURCE_ORDER, &validated);

    Ok(Json(validated))
}

/// Payment proof upload response
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub file_url: String,
}

/// POST /api/orders/{id}/payment-proof - 上传/替换支付凭证 (公共路由)
///
/// 替换时删除旧凭证文件。
pub async fn upload_payment_proof(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<ProofResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        if field.name() == Some("payment_proof") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| AppError::validation("No filename provided in payment_proof"))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
                .to_vec();
            upload = Some((filename, data));
            break;
        }
    }

    let Some((filename, data)) = upload else {
        return Err(AppError::new(ErrorCode::PaymentProofRequired));
    };

    let url = state.storage().save_payment_proof(&data, &filename)?;
    let old = order::update_payment_proof(&state.db, id, &url)
        .await
        .map_err(|e| match e {
            crate::db::repository::RepoError::NotFound(_) => {
                AppError::new(ErrorCode::OrderNotFound)
            }
            other => AppError::database(other.to_string()),
        })?;

    // 替换即删除旧凭证
    if let Some(ref old_url) = old
        && old_url != &url
    {
        state.storage().delete(old_url);
    }

    tracing::info!(order_id = id, url = %url, "Payment proof uploaded");

    Ok(Json(ProofResponse { file_url: url }))
}

/// Query params for stats
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Inclusive lower bound, UTC millis
    pub date_from: Option<i64>,
    /// Inclusive upper bound, UTC millis
    pub date_to: Option<i64>,
}

/// GET /api/orders/stats/summary - 订单统计
pub async fn stats(
    State(state): State<ServerState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<OrderStats>> {
    let stats = order::stats(&state.db, query.date_from, query.date_to)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(stats))
}
