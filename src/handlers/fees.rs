use axum::{
    extract::State,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Actor,
    handlers::extract::{AppJson, AppQuery},
    services::fees::{FeeQuote, ListPromotionsQuery, PromotionPage, QuoteRequest},
    ApiResponse, ApiResult, AppState,
};

/// Fee quote request with an optional promotion code to try
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[schema(example = json!({
    "weight": "2.0",
    "service_type_id": "6f1c1e4a-8d3b-4c7e-9a51-2f0d3b6e7a10",
    "sender_region": "Hanoi",
    "recipient_region": "Hanoi",
    "promotion_code": "SALE20"
}))]
pub struct QuoteFeeRequest {
    #[serde(flatten)]
    pub quote: QuoteRequest,
    pub promotion_code: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/fees/quote",
    request_body = QuoteFeeRequest,
    responses(
        (status = 200, description = "Fee quoted", body = ApiResponse<FeeQuote>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fees"
)]
pub async fn quote_fee(
    State(state): State<AppState>,
    _actor: Actor,
    AppJson(payload): AppJson<QuoteFeeRequest>,
) -> ApiResult<FeeQuote> {
    let quote = match payload.promotion_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            state
                .services
                .fees
                .quote_with_promotion(payload.quote, code)
                .await?
        }
        _ => state.services.fees.quote(payload.quote).await?,
    };
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    get,
    path = "/api/v1/promotions",
    params(ListPromotionsQuery),
    responses(
        (status = 200, description = "Usable promotions ranked for the fee", body = ApiResponse<PromotionPage>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fees"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    _actor: Actor,
    AppQuery(query): AppQuery<ListPromotionsQuery>,
) -> ApiResult<PromotionPage> {
    let page = state.services.fees.list_promotions(query).await?;
    Ok(Json(ApiResponse::success(page)))
}
