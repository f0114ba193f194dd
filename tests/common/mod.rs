#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use parcelflow_api::{
    auth::{Actor, ActorRole, AuthConfig, AuthService, Claims},
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{
        office,
        order::{self, Payer, PaymentMethod},
        promotion::{self, DiscountType},
        service_type, shipping_rate,
    },
    handlers::AppServices,
    services::{
        orders::{ConfirmOrderRequest, CreateOrderRequest, DeliverOrderRequest},
        shipments::{FinishRequest, FinishStatus, PickUpRequest},
    },
    AppState,
};

pub const JWT_SECRET: &str = "k3Jd8sL1qP0zX7vB5nM2wE9rT4yU6iOa";

/// Services over a freshly migrated SQLite database seeded with a small network:
/// two Hanoi offices, one Saigon hub, a standard tier and a few promotions.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub services: AppServices,
    /// Hanoi city hub; the origin of most test orders
    pub hanoi_hub: Uuid,
    pub hanoi_ba_dinh: Uuid,
    /// Saigon hub; the destination of most test orders
    pub saigon_hub: Uuid,
    pub standard: Uuid,
    pub retired_tier: Uuid,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to open in-memory database");
        Self::seeded(pool, None).await
    }

    /// File-backed database, for tests that go through the HTTP stack.
    pub async fn on_disk() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("parcelflow.db").display());
        let pool = db::establish_connection_with_config(&DbConfig {
            url,
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to open test database");
        Self::seeded(pool, Some(dir)).await
    }

    async fn seeded(pool: DbPool, dir: Option<TempDir>) -> Self {
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let hanoi_hub = seed_office(&pool, "HN-HUB", "Hanoi", None).await;
        let hanoi_ba_dinh = seed_office(&pool, "HN-BD", "Hanoi", Some("Ba Dinh")).await;
        let saigon_hub = seed_office(&pool, "SG-HUB", "Ho Chi Minh City", None).await;

        let standard = seed_service_type(&pool, "STD", true).await;
        let retired_tier = seed_service_type(&pool, "OLD", false).await;
        seed_rate(&pool, standard, dec!(0), Some(dec!(1)), dec!(20000), None).await;
        seed_rate(&pool, standard, dec!(1), Some(dec!(5)), dec!(35000), None).await;
        seed_rate(&pool, standard, dec!(5), None, dec!(50000), Some(dec!(5000))).await;
        seed_rate(&pool, retired_tier, dec!(0), None, dec!(10000), None).await;

        seed_promotion(&pool, "WELCOME10", DiscountType::Percentage, dec!(10), None, None).await;
        seed_promotion(&pool, "ONCE", DiscountType::Fixed, dec!(5000), Some(1), None).await;
        seed_promotion(
            &pool,
            "BIGSPEND",
            DiscountType::Fixed,
            dec!(10000),
            None,
            Some(dec!(40000)),
        )
        .await;

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        let db = Arc::new(pool);
        let services = AppServices::new(db.clone(), None, &config);

        Self {
            db,
            config,
            services,
            hanoi_hub,
            hanoi_ba_dinh,
            saigon_hub,
            standard,
            retired_tier,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            db: self.db.clone(),
            config: self.config.clone(),
            services: self.services.clone(),
        };
        let auth = Arc::new(AuthService::new(AuthConfig::from(&self.config)));
        parcelflow_api::build_router(state, auth)
    }

    pub fn operator(&self) -> Actor {
        actor(ActorRole::Operator, Some(self.hanoi_hub))
    }

    pub fn driver(&self) -> Actor {
        actor(ActorRole::Driver, Some(self.hanoi_hub))
    }

    pub fn agent(&self) -> Actor {
        actor(ActorRole::DeliveryAgent, Some(self.saigon_hub))
    }

    pub fn finance(&self) -> Actor {
        actor(ActorRole::Finance, None)
    }

    /// Hanoi to Saigon, 2 kg on the standard tier.
    pub fn order_request(&self, cod_amount: Decimal) -> CreateOrderRequest {
        CreateOrderRequest {
            sender_name: "Nguyen Van A".to_string(),
            sender_phone: "0901234567".to_string(),
            sender_city: "Hanoi".to_string(),
            sender_ward: Some("Ba Dinh".to_string()),
            sender_address: "12 Kim Ma".to_string(),
            recipient_name: "Tran Thi B".to_string(),
            recipient_phone: "0912345678".to_string(),
            recipient_city: "Ho Chi Minh City".to_string(),
            recipient_ward: Some("District 1".to_string()),
            recipient_address: "34 Le Loi".to_string(),
            weight: dec!(2),
            service_type_id: self.standard,
            cod_amount,
            payer: Payer::Customer,
            payment_method: PaymentMethod::Cash,
            promotion_code: None,
            notes: None,
        }
    }

    /// A back-office order confirmed into the Hanoi hub.
    pub async fn confirmed_order(&self, cod_amount: Decimal) -> order::Model {
        let operator = self.operator();
        let created = self
            .services
            .orders
            .create_order(&operator, self.order_request(cod_amount))
            .await
            .expect("create order");
        self.services
            .orders
            .confirm_order(&operator, created.id, ConfirmOrderRequest::default())
            .await
            .expect("confirm order")
    }

    /// Orders carried Hanoi to Saigon and landed at the Saigon hub.
    pub async fn arrived_orders(&self, count: usize, cod_amount: Decimal) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.confirmed_order(cod_amount).await.id);
        }

        let driver = self.driver();
        let shipments = &self.services.shipments;
        let pickup = shipments
            .pick_up(
                &driver,
                PickUpRequest {
                    vehicle_id: None,
                    order_ids: ids.clone(),
                },
            )
            .await
            .expect("pick up");
        let shipment_id = pickup.shipment_id.expect("shipment opened");
        shipments
            .start(&driver, shipment_id)
            .await
            .expect("start shipment");
        shipments
            .finish(
                &driver,
                shipment_id,
                FinishRequest {
                    status: FinishStatus::Completed,
                    note: None,
                },
            )
            .await
            .expect("finish shipment");
        ids
    }

    /// Arrived orders handed over by `agent`, who collects exactly the COD.
    pub async fn delivered_orders(
        &self,
        agent: &Actor,
        count: usize,
        cod_amount: Decimal,
    ) -> Vec<Uuid> {
        let ids = self.arrived_orders(count, cod_amount).await;
        for id in &ids {
            self.services
                .orders
                .deliver_order(
                    agent,
                    *id,
                    DeliverOrderRequest {
                        amount_collected: cod_amount,
                        actual_recipient: "Tran Thi B".to_string(),
                        note: None,
                    },
                )
                .await
                .expect("deliver order");
        }
        ids
    }

    pub fn token(&self, actor: &Actor) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: actor.user_id.to_string(),
            role: actor.role,
            office_id: actor.office_id,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            iss: self.config.auth_issuer.clone(),
            aud: self.config.auth_audience.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .expect("sign token")
    }

    /// Sends one request through the full router and decodes the JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&Actor>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(actor)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn actor(role: ActorRole, office_id: Option<Uuid>) -> Actor {
    Actor::new(Uuid::new_v4(), role, office_id)
}

async fn seed_office(db: &DbPool, code: &str, city: &str, ward: Option<&str>) -> Uuid {
    let id = Uuid::new_v4();
    office::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        name: Set(format!("{} office", code)),
        city: Set(city.to_string()),
        ward: Set(ward.map(str::to_string)),
        address: Set(None),
        capacity: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed office");
    id
}

async fn seed_service_type(db: &DbPool, code: &str, is_active: bool) -> Uuid {
    let id = Uuid::new_v4();
    service_type::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        name: Set(format!("{} delivery", code)),
        is_active: Set(is_active),
    }
    .insert(db)
    .await
    .expect("seed service type");
    id
}

async fn seed_rate(
    db: &DbPool,
    service_type_id: Uuid,
    weight_from: Decimal,
    weight_to: Option<Decimal>,
    price: Decimal,
    extra_price: Option<Decimal>,
) {
    shipping_rate::ActiveModel {
        id: Set(Uuid::new_v4()),
        service_type_id: Set(service_type_id),
        origin_region: Set(None),
        destination_region: Set(None),
        weight_from: Set(weight_from),
        weight_to: Set(weight_to),
        price: Set(price),
        extra_price: Set(extra_price),
    }
    .insert(db)
    .await
    .expect("seed rate");
}

async fn seed_promotion(
    db: &DbPool,
    code: &str,
    discount_type: DiscountType,
    discount_value: Decimal,
    usage_limit: Option<i32>,
    min_order_value: Option<Decimal>,
) {
    promotion::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        description: Set(None),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        max_discount_amount: Set(Some(dec!(10000))),
        min_order_value: Set(min_order_value),
        usage_limit: Set(usage_limit),
        usage_count: Set(0),
        starts_at: Set(Utc::now() - Duration::days(1)),
        ends_at: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed promotion");
}
