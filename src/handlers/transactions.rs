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
    entities::transaction::{self, TransactionKind, TransactionPurpose, TransactionStatus},
    errors::ServiceError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    services::transactions::{ListLedgerQuery, RecordLedgerEntryRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub purpose: TransactionPurpose,
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
    pub office_id: Option<Uuid>,
    pub payment_submission_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction::Model> for LedgerEntryResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            purpose: model.purpose,
            amount: model.amount,
            order_id: model.order_id,
            office_id: model.office_id,
            payment_submission_id: model.payment_submission_id,
            status: model.status,
            description: model.description,
            created_by: model.created_by,
            resolved_by: model.resolved_by,
            resolved_at: model.resolved_at,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/ledger",
    params(ListLedgerQuery),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = ApiResponse<PaginatedResponse<LedgerEntryResponse>>)
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
pub async fn list_ledger(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(query): AppQuery<ListLedgerQuery>,
) -> ApiResult<PaginatedResponse<LedgerEntryResponse>> {
    let (entries, total, page, per_page) = state.services.ledger.list(&actor, query).await?;
    let items = entries.into_iter().map(LedgerEntryResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/ledger",
    request_body = RecordLedgerEntryRequest,
    responses(
        (status = 201, description = "Pending entry posted", body = ApiResponse<LedgerEntryResponse>),
        (status = 400, description = "Invalid amount or reserved purpose", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
pub async fn record_entry(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<RecordLedgerEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LedgerEntryResponse>>), ServiceError> {
    let entry = state.services.ledger.record(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/ledger/{id}/confirm",
    params(("id" = Uuid, Path, description = "Ledger entry id")),
    responses(
        (status = 200, description = "Entry confirmed", body = ApiResponse<LedgerEntryResponse>),
        (status = 422, description = "Entry already resolved", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
pub async fn confirm_entry(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<LedgerEntryResponse> {
    let entry = state.services.ledger.confirm(&actor, id).await?;
    Ok(Json(ApiResponse::success(entry.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/ledger/{id}/reject",
    params(("id" = Uuid, Path, description = "Ledger entry id")),
    responses(
        (status = 200, description = "Entry rejected", body = ApiResponse<LedgerEntryResponse>),
        (status = 422, description = "Entry already resolved", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
pub async fn reject_entry(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<LedgerEntryResponse> {
    let entry = state.services.ledger.reject(&actor, id).await?;
    Ok(Json(ApiResponse::success(entry.into())))
}
