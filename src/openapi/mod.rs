use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parcelflow API",
        version = "0.1.0",
        description = r#"
# Parcelflow Delivery API

Back end for a multi-office parcel network: fee quotes and promotions, the
order lifecycle, driver dispatch, and cash-on-delivery reconciliation.

## Authentication

Every endpoint expects a bearer JWT issued by the identity service:

```
Authorization: Bearer <your-jwt-token>
```

The token's `role` claim decides which route groups the caller may use and
its `office_id` claim scopes office-bound staff.

## Error Handling

Failures share one body shape:

```json
{
  "success": false,
  "error": "Unprocessable Entity",
  "message": "cannot move order from draft to confirmed",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `per_page` (default 20, max 100).
The promotion listing uses an offset `cursor` instead.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "fees", description = "Fee quotes and promotions"),
        (name = "orders", description = "Order lifecycle"),
        (name = "shipments", description = "Driver dispatch"),
        (name = "cod", description = "Cash-on-delivery submissions and reconciliation"),
        (name = "ledger", description = "Finance ledger")
    ),
    paths(
        crate::handlers::fees::quote_fee,
        crate::handlers::fees::list_promotions,

        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_by_tracking_number,
        crate::handlers::orders::get_order_history,
        crate::handlers::orders::update_draft,
        crate::handlers::orders::submit_order,
        crate::handlers::orders::confirm_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::deliver_order,

        crate::handlers::shipments::pick_up,
        crate::handlers::shipments::start_shipment,
        crate::handlers::shipments::finish_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::list_shipments,

        crate::handlers::payment_submissions::submit_cod,
        crate::handlers::payment_submissions::reconcile_submission,
        crate::handlers::payment_submissions::get_submission,
        crate::handlers::payment_submissions::list_submissions,
        crate::handlers::payment_submissions::office_cod_balance,

        crate::handlers::transactions::list_ledger,
        crate::handlers::transactions::record_entry,
        crate::handlers::transactions::confirm_entry,
        crate::handlers::transactions::reject_entry,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::auth::ActorRole,
            crate::services::shipments::SkipReason,
            crate::services::shipments::ItemOutcome,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_dispatch_and_cod_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Parcelflow API"));
        assert!(json.contains("/api/v1/shipments/pickup"));
        assert!(json.contains("/api/v1/payment-submissions/{id}/reconcile"));
        assert!(json.contains("bearer_auth"));
    }
}
