use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::{Actor, ActorRole},
    entities::shipment::{self, ShipmentStatus},
    errors::ServiceError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    services::shipments::{
        FinishRequest, ListShipmentsQuery, PickUpRequest, PickupOutcome, ShipmentDetail,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "990e8400-e29b-41d4-a716-446655440000",
    "driver_id": "3f2b8c1e-5a6d-4e7f-8a9b-0c1d2e3f4a5b",
    "vehicle_id": null,
    "office_id": "7d9e0f1a-2b3c-4d5e-6f7a-8b9c0d1e2f3a",
    "status": "in_transit",
    "start_time": "2024-12-09T14:30:00Z",
    "end_time": null
}))]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    /// Office the batch left from
    pub office_id: Uuid,
    pub status: ShipmentStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present on single-shipment reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_ids: Option<Vec<Uuid>>,
}

impl From<shipment::Model> for ShipmentResponse {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            driver_id: model.driver_id,
            vehicle_id: model.vehicle_id,
            office_id: model.office_id,
            status: model.status,
            start_time: model.start_time,
            end_time: model.end_time,
            created_at: model.created_at,
            updated_at: model.updated_at,
            order_ids: None,
        }
    }
}

impl From<ShipmentDetail> for ShipmentResponse {
    fn from(detail: ShipmentDetail) -> Self {
        Self {
            order_ids: Some(detail.order_ids),
            ..detail.shipment.into()
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DriverFilter {
    /// Staff only; drivers always see their own trips
    pub driver_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/pickup",
    request_body = PickUpRequest,
    responses(
        (status = 201, description = "Shipment opened; per-order outcome listed", body = ApiResponse<PickupOutcome>),
        (status = 200, description = "Every order skipped; no shipment opened", body = ApiResponse<PickupOutcome>),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not office-bound", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn pick_up(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<PickUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PickupOutcome>>), ServiceError> {
    let outcome = state.services.shipments.pick_up(&actor, payload).await?;
    let status = if outcome.shipment_id.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(outcome))))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/start",
    params(("id" = Uuid, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment in transit", body = ApiResponse<ShipmentResponse>),
        (status = 403, description = "Shipment belongs to another driver", body = crate::errors::ErrorResponse),
        (status = 422, description = "Shipment is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn start_shipment(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ShipmentResponse> {
    let shipment = state.services.shipments.start(&actor, id).await?;
    Ok(Json(ApiResponse::success(shipment.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/finish",
    params(("id" = Uuid, Path, description = "Shipment id")),
    request_body = FinishRequest,
    responses(
        (status = 200, description = "Shipment completed or cancelled", body = ApiResponse<ShipmentResponse>),
        (status = 403, description = "Shipment belongs to another driver", body = crate::errors::ErrorResponse),
        (status = 422, description = "Shipment cannot reach that status", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn finish_shipment(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<FinishRequest>,
) -> ApiResult<ShipmentResponse> {
    let shipment = state.services.shipments.finish(&actor, id, payload).await?;
    Ok(Json(ApiResponse::success(shipment.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment with its orders", body = ApiResponse<ShipmentResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ShipmentResponse> {
    let detail = state.services.shipments.get_shipment(&actor, id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ListShipmentsQuery, DriverFilter),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentResponse>>),
        (status = 400, description = "driver_id missing for staff", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(filter): AppQuery<DriverFilter>,
    AppQuery(query): AppQuery<ListShipmentsQuery>,
) -> ApiResult<PaginatedResponse<ShipmentResponse>> {
    let driver_id = match actor.role {
        ActorRole::Driver => actor.user_id,
        _ => filter.driver_id.ok_or_else(|| {
            ServiceError::ValidationError("driver_id is required".to_string())
        })?,
    };
    let (shipments, total, page, per_page) = state
        .services
        .shipments
        .list_driver_shipments(driver_id, query)
        .await?;
    let items = shipments.into_iter().map(ShipmentResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}
