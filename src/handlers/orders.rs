use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Actor,
    entities::order::{self, OrderStatus, Payer, PaymentMethod, PaymentStatus},
    entities::order_history::{self, HistoryAction},
    entities::shipping_collection,
    errors::ServiceError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    services::orders::{
        CancelOrderRequest, ConfirmOrderRequest, CreateOrderRequest, DeliverOrderRequest,
        Delivery, ListOrdersQuery, UpdateDraftRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "tracking_number": "TRK20240309A1B2C3D4",
    "status": "pending",
    "shipping_fee": "250000",
    "discount_amount": "20000",
    "payable_fee": "230000",
    "cod_amount": "100000"
}))]
pub struct OrderResponse {
    pub id: Uuid,
    pub tracking_number: String,
    pub status: OrderStatus,
    pub sender_name: String,
    pub sender_phone: String,
    pub sender_city: String,
    pub sender_ward: Option<String>,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_city: String,
    pub recipient_ward: Option<String>,
    pub recipient_address: String,
    /// Kilograms
    pub weight: Decimal,
    pub service_type_id: Uuid,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub payable_fee: Decimal,
    pub promotion_id: Option<Uuid>,
    pub cod_amount: Decimal,
    pub payer: Payer,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub origin_office_id: Option<Uuid>,
    pub destination_office_id: Uuid,
    pub actual_recipient: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        let payable_fee = model.payable_fee();
        Self {
            id: model.id,
            tracking_number: model.tracking_number,
            status: model.status,
            sender_name: model.sender_name,
            sender_phone: model.sender_phone,
            sender_city: model.sender_city,
            sender_ward: model.sender_ward,
            sender_address: model.sender_address,
            recipient_name: model.recipient_name,
            recipient_phone: model.recipient_phone,
            recipient_city: model.recipient_city,
            recipient_ward: model.recipient_ward,
            recipient_address: model.recipient_address,
            weight: model.weight,
            service_type_id: model.service_type_id,
            shipping_fee: model.shipping_fee,
            discount_amount: model.discount_amount,
            payable_fee,
            promotion_id: model.promotion_id,
            cod_amount: model.cod_amount,
            payer: model.payer,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            origin_office_id: model.origin_office_id,
            destination_office_id: model.destination_office_id,
            actual_recipient: model.actual_recipient,
            delivered_at: model.delivered_at,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub action: HistoryAction,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub action_time: DateTime<Utc>,
}

impl From<order_history::Model> for HistoryEntryResponse {
    fn from(model: order_history::Model) -> Self {
        Self {
            id: model.id,
            action: model.action,
            from_status: model.from_status,
            to_status: model.to_status,
            from_office_id: model.from_office_id,
            to_office_id: model.to_office_id,
            shipment_id: model.shipment_id,
            actor_id: model.actor_id,
            note: model.note,
            action_time: model.action_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionResponse {
    pub id: Uuid,
    pub amount_collected: Decimal,
    pub expected_amount: Decimal,
    /// `amount_collected - expected_amount`
    pub discrepancy: Decimal,
    pub collected_at: DateTime<Utc>,
}

impl From<shipping_collection::Model> for CollectionResponse {
    fn from(model: shipping_collection::Model) -> Self {
        Self {
            id: model.id,
            amount_collected: model.amount_collected,
            expected_amount: model.expected_amount,
            discrepancy: model.discrepancy,
            collected_at: model.collected_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub order: OrderResponse,
    pub collection: CollectionResponse,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            order: delivery.order.into(),
            collection: delivery.collection.into(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown promotion code", body = crate::errors::ErrorResponse),
        (status = 409, description = "Promotion used up", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.orders.create_order(&actor, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(order.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders listed", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(query): AppQuery<ListOrdersQuery>,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let (orders, total, page, per_page) = state.services.orders.list_orders(&actor, query).await?;
    let items = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/tracking/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_by_tracking_number(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(tracking_number): AppPath<String>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .get_by_tracking_number(&actor, &tracking_number)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = ApiResponse<Vec<HistoryEntryResponse>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_history(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Vec<HistoryEntryResponse>> {
    let rows = state.services.orders.order_history(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(HistoryEntryResponse::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateDraftRequest,
    responses(
        (status = 200, description = "Draft updated and re-priced", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order is not a draft", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_draft(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateDraftRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_draft(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/submit",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Draft submitted", body = ApiResponse<OrderResponse>),
        (status = 422, description = "Order is not a draft", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn submit_order(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.submit_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ConfirmOrderRequest,
    responses(
        (status = 200, description = "Order confirmed", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Office not managed by caller", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ConfirmOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .confirm_order(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 422, description = "Order already left the origin office", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CancelOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .cancel_order(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/deliver",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = DeliverOrderRequest,
    responses(
        (status = 200, description = "Order delivered and COD recorded", body = ApiResponse<DeliveryResponse>),
        (status = 403, description = "Order belongs to another office", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order has not arrived", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn deliver_order(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<DeliverOrderRequest>,
) -> ApiResult<DeliveryResponse> {
    let delivery = state
        .services
        .orders
        .deliver_order(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(delivery.into())))
}
