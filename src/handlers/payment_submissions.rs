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
    entities::payment_submission::{self, SubmissionStatus},
    errors::ServiceError,
    handlers::transactions::LedgerEntryResponse,
    handlers::extract::{AppJson, AppPath, AppQuery},
    services::payment_submissions::{
        CodBalance, ListSubmissionsQuery, ReconcileOutcome, ReconcileRequest, SubmitCodRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "2c4e6a80-1b3d-4f5a-9c7e-0d2f4b6a8c1e",
    "status": "pending",
    "expected_amount": "500000",
    "total_amount_submitted": "480000",
    "discrepancy": "-20000"
}))]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub office_id: Uuid,
    pub submitted_by: Uuid,
    pub order_ids: Vec<Uuid>,
    pub total_amount_submitted: Decimal,
    /// Sum collected on the listed orders
    pub expected_amount: Decimal,
    /// `total_amount_submitted - expected_amount`
    pub discrepancy: Decimal,
    pub adjusted_amount: Option<Decimal>,
    pub status: SubmissionStatus,
    pub notes: Option<String>,
    pub reconciliation_notes: Option<String>,
    pub reconciled_by: Option<Uuid>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl From<payment_submission::Model> for SubmissionResponse {
    fn from(model: payment_submission::Model) -> Self {
        Self {
            order_ids: model.order_id_list(),
            id: model.id,
            office_id: model.office_id,
            submitted_by: model.submitted_by,
            total_amount_submitted: model.total_amount_submitted,
            expected_amount: model.expected_amount,
            discrepancy: model.discrepancy,
            adjusted_amount: model.adjusted_amount,
            status: model.status,
            notes: model.notes,
            reconciliation_notes: model.reconciliation_notes,
            reconciled_by: model.reconciled_by,
            reconciled_at: model.reconciled_at,
            submitted_at: model.submitted_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub submission: SubmissionResponse,
    pub ledger_entry: Option<LedgerEntryResponse>,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            submission: outcome.submission.into(),
            ledger_entry: outcome.ledger_entry.map(Into::into),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-submissions",
    request_body = SubmitCodRequest,
    responses(
        (status = 201, description = "COD batch submitted", body = ApiResponse<SubmissionResponse>),
        (status = 403, description = "Order delivered by another office", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already in a live submission", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order not delivered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cod"
)]
pub async fn submit_cod(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<SubmitCodRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponse>>), ServiceError> {
    let submission = state.services.submissions.submit(&actor, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(submission.into())),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-submissions/{id}/reconcile",
    params(("id" = Uuid, Path, description = "Submission id")),
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Submission settled", body = ApiResponse<ReconcileResponse>),
        (status = 403, description = "Submission belongs to another office", body = crate::errors::ErrorResponse),
        (status = 422, description = "Submission already settled", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cod"
)]
pub async fn reconcile_submission(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReconcileRequest>,
) -> ApiResult<ReconcileResponse> {
    let outcome = state
        .services
        .submissions
        .reconcile(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission found", body = ApiResponse<SubmissionResponse>),
        (status = 404, description = "Submission not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cod"
)]
pub async fn get_submission(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<SubmissionResponse> {
    let submission = state.services.submissions.get_submission(&actor, id).await?;
    Ok(Json(ApiResponse::success(submission.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-submissions",
    params(ListSubmissionsQuery),
    responses(
        (status = 200, description = "Submissions listed", body = ApiResponse<PaginatedResponse<SubmissionResponse>>)
    ),
    security(("bearer_auth" = [])),
    tag = "cod"
)]
pub async fn list_submissions(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(query): AppQuery<ListSubmissionsQuery>,
) -> ApiResult<PaginatedResponse<SubmissionResponse>> {
    let (submissions, total, page, per_page) = state
        .services
        .submissions
        .list_submissions(&actor, query)
        .await?;
    let items = submissions
        .into_iter()
        .map(SubmissionResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/offices/{id}/cod-balance",
    params(("id" = Uuid, Path, description = "Office id")),
    responses(
        (status = 200, description = "COD position of the office", body = ApiResponse<CodBalance>),
        (status = 403, description = "Office not visible to caller", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cod"
)]
pub async fn office_cod_balance(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<CodBalance> {
    let balance = state
        .services
        .submissions
        .office_cod_balance(&actor, id)
        .await?;
    Ok(Json(ApiResponse::success(balance)))
}
