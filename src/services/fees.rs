//! Shipping fee and promotion calculator.
//!
//! The calculation itself is a set of pure functions over rate-table rows and
//! promotion rows; [`FeeService`] only loads those rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::promotion::{self, DiscountType, Entity as PromotionEntity};
use crate::entities::service_type::Entity as ServiceTypeEntity;
use crate::entities::shipping_rate::{self, Entity as ShippingRateEntity};
use crate::errors::ServiceError;
use crate::services::positive_decimal;

const MONEY_DP: u32 = 2;

/// Inputs to a fee quote
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct QuoteRequest {
    /// Parcel weight in kilograms
    #[validate(custom = "positive_decimal")]
    pub weight: Decimal,
    pub service_type_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub sender_region: String,
    #[validate(length(min = 1, max = 100))]
    pub recipient_region: String,
}

/// Why a requested promotion gave no discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PromotionRejection {
    /// Inactive, expired, not yet started or used up
    Unavailable,
    BelowMinimum { min_order_value: Decimal },
}

/// Result of applying a promotion to a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    Applied(Decimal),
    Rejected(PromotionRejection),
}

impl PromotionOutcome {
    pub fn discount(&self) -> Decimal {
        match self {
            PromotionOutcome::Applied(amount) => *amount,
            PromotionOutcome::Rejected(_) => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeeQuote {
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub payable: Decimal,
    /// Code of the applied promotion; `None` when none was requested or it was rejected
    pub promotion_code: Option<String>,
    #[serde(skip)]
    pub promotion_id: Option<Uuid>,
    pub promotion_rejection: Option<PromotionRejection>,
}

impl FeeQuote {
    fn without_promotion(shipping_fee: Decimal) -> Self {
        Self {
            shipping_fee,
            discount: Decimal::ZERO,
            payable: shipping_fee,
            promotion_code: None,
            promotion_id: None,
            promotion_rejection: None,
        }
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp(MONEY_DP)
}

fn region_matches(rule: Option<&str>, region: &str) -> bool {
    rule.map_or(true, |r| r.trim().eq_ignore_ascii_case(region.trim()))
}

fn weight_in_band(rate: &shipping_rate::Model, weight: Decimal) -> bool {
    weight >= rate.weight_from && rate.weight_to.map_or(true, |to| weight < to)
}

fn specificity(rate: &shipping_rate::Model) -> u8 {
    u8::from(rate.origin_region.is_some()) + u8::from(rate.destination_region.is_some())
}

/// Picks the band that covers `weight` for the region pair.
///
/// Rows naming a region beat wildcard rows; among equally specific rows the
/// one with the highest `weight_from` wins.
pub fn select_rate<'a>(
    rates: &'a [shipping_rate::Model],
    origin_region: &str,
    destination_region: &str,
    weight: Decimal,
) -> Option<&'a shipping_rate::Model> {
    rates
        .iter()
        .filter(|r| region_matches(r.origin_region.as_deref(), origin_region))
        .filter(|r| region_matches(r.destination_region.as_deref(), destination_region))
        .filter(|r| weight_in_band(r, weight))
        .max_by(|a, b| {
            specificity(a)
                .cmp(&specificity(b))
                .then_with(|| a.weight_from.cmp(&b.weight_from))
        })
}

/// Fee for one band. Open-ended bands charge `extra_price` per started unit above `weight_from`.
pub fn band_fee(rate: &shipping_rate::Model, weight: Decimal) -> Decimal {
    let fee = match (rate.weight_to, rate.extra_price) {
        (None, Some(extra)) if weight > rate.weight_from => {
            let extra_units = (weight - rate.weight_from).ceil();
            rate.price + extra * extra_units
        }
        _ => rate.price,
    };
    round_money(fee)
}

/// Discount a promotion grants on `fee` at `now`, capped by its maximum and by the fee.
pub fn promotion_discount(
    promotion: &promotion::Model,
    fee: Decimal,
    now: DateTime<Utc>,
) -> PromotionOutcome {
    if !promotion.is_usable_at(now) {
        return PromotionOutcome::Rejected(PromotionRejection::Unavailable);
    }
    apply_promotion_terms(promotion, fee)
}

/// Minimum-order and cap rules only; used when re-pricing an order that already holds the promotion.
pub fn apply_promotion_terms(promotion: &promotion::Model, fee: Decimal) -> PromotionOutcome {
    if let Some(min_order_value) = promotion.min_order_value {
        if fee < min_order_value {
            debug!(
                "Fee {} is below minimum order value {} for {}",
                fee, min_order_value, promotion.code
            );
            return PromotionOutcome::Rejected(PromotionRejection::BelowMinimum {
                min_order_value,
            });
        }
    }

    let discount = match promotion.discount_type {
        DiscountType::Fixed => promotion.discount_value,
        DiscountType::Percentage => fee * promotion.discount_value / Decimal::from(100),
    };

    let capped = match promotion.max_discount_amount {
        Some(max_discount) => discount.min(max_discount),
        None => discount,
    };

    PromotionOutcome::Applied(round_money(capped.max(Decimal::ZERO).min(fee)))
}

/// Full quote from an already-selected band and optional promotion.
pub fn quote_fee(
    rate: &shipping_rate::Model,
    weight: Decimal,
    promotion: Option<&promotion::Model>,
    now: DateTime<Utc>,
) -> FeeQuote {
    let shipping_fee = band_fee(rate, weight);
    let Some(promotion) = promotion else {
        return FeeQuote::without_promotion(shipping_fee);
    };

    match promotion_discount(promotion, shipping_fee, now) {
        PromotionOutcome::Applied(discount) => FeeQuote {
            shipping_fee,
            discount,
            payable: (shipping_fee - discount).max(Decimal::ZERO),
            promotion_code: Some(promotion.code.clone()),
            promotion_id: Some(promotion.id),
            promotion_rejection: None,
        },
        PromotionOutcome::Rejected(reason) => FeeQuote {
            promotion_rejection: Some(reason),
            ..FeeQuote::without_promotion(shipping_fee)
        },
    }
}

/// Query for the promotion listing
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListPromotionsQuery {
    /// Fee the promotions are ranked against
    pub shipping_fee: Decimal,
    /// Offset returned as `next_cursor` by the previous page
    pub cursor: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on code or description
    #[validate(length(max = 100))]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PromotionOffer {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub ends_at: Option<DateTime<Utc>>,
    pub eligible: bool,
    /// Discount this promotion grants on the queried fee
    pub discount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PromotionPage {
    pub items: Vec<PromotionOffer>,
    pub next_cursor: Option<u64>,
    pub total: u64,
}

/// Ranks usable promotions against `fee`: eligible first, larger discount first.
pub fn rank_promotions(
    promotions: Vec<promotion::Model>,
    fee: Decimal,
    search: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<PromotionOffer> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut offers: Vec<PromotionOffer> = promotions
        .into_iter()
        .filter(|p| p.is_usable_at(now))
        .filter(|p| match &needle {
            Some(n) => {
                p.code.to_lowercase().contains(n)
                    || p.description
                        .as_deref()
                        .map_or(false, |d| d.to_lowercase().contains(n))
            }
            None => true,
        })
        .map(|p| {
            let outcome = promotion_discount(&p, fee, now);
            PromotionOffer {
                id: p.id,
                eligible: matches!(outcome, PromotionOutcome::Applied(_)),
                discount: outcome.discount(),
                code: p.code,
                description: p.description,
                discount_type: p.discount_type,
                discount_value: p.discount_value,
                max_discount_amount: p.max_discount_amount,
                min_order_value: p.min_order_value,
                ends_at: p.ends_at,
            }
        })
        .collect();

    offers.sort_by(|a, b| match (a.eligible, b.eligible) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b
            .discount
            .cmp(&a.discount)
            .then_with(|| a.code.cmp(&b.code)),
    });
    offers
}

/// Loads rate tables and promotions for quoting
#[derive(Clone)]
pub struct FeeService {
    db_pool: Arc<DbPool>,
    default_page_size: u64,
    max_page_size: u64,
}

impl FeeService {
    pub fn new(db_pool: Arc<DbPool>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            db_pool,
            default_page_size,
            max_page_size,
        }
    }

    /// Quotes the base fee with no promotion.
    #[instrument(skip(self, request), fields(service_type_id = %request.service_type_id))]
    pub async fn quote(&self, request: QuoteRequest) -> Result<FeeQuote, ServiceError> {
        request.validate()?;
        let rate = load_rate(&*self.db_pool, &request).await?;
        Ok(quote_fee(&rate, request.weight, None, Utc::now()))
    }

    /// Quotes the fee and applies `promotion_code` when it qualifies.
    #[instrument(skip(self, request), fields(service_type_id = %request.service_type_id, promotion_code = %promotion_code))]
    pub async fn quote_with_promotion(
        &self,
        request: QuoteRequest,
        promotion_code: &str,
    ) -> Result<FeeQuote, ServiceError> {
        request.validate()?;
        quote_on(&*self.db_pool, &request, Some(promotion_code), Utc::now()).await
    }

    #[instrument(skip(self, query))]
    pub async fn list_promotions(
        &self,
        query: ListPromotionsQuery,
    ) -> Result<PromotionPage, ServiceError> {
        query.validate()?;
        if query.shipping_fee < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "shipping_fee cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let limit = query
            .limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let offset = query.cursor.unwrap_or(0);

        let candidates = PromotionEntity::find()
            .filter(promotion::Column::IsActive.eq(true))
            .filter(promotion::Column::StartsAt.lte(now))
            .order_by_asc(promotion::Column::Code)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load promotions");
                ServiceError::DatabaseError(e)
            })?;

        let ranked = rank_promotions(candidates, query.shipping_fee, query.search.as_deref(), now);
        let total = ranked.len() as u64;
        let items: Vec<PromotionOffer> = ranked
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        let next = offset + items.len() as u64;
        let next_cursor = (next < total).then_some(next);

        Ok(PromotionPage {
            items,
            next_cursor,
            total,
        })
    }
}

/// Finds the band for a request, rejecting unknown or inactive service tiers.
pub(crate) async fn load_rate<C: ConnectionTrait>(
    conn: &C,
    request: &QuoteRequest,
) -> Result<shipping_rate::Model, ServiceError> {
    let service_type = ServiceTypeEntity::find_by_id(request.service_type_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("service type {} not found", request.service_type_id))
        })?;
    if !service_type.is_active {
        return Err(ServiceError::ValidationError(format!(
            "service type {} is not offered",
            service_type.code
        )));
    }

    let rates = ShippingRateEntity::find()
        .filter(shipping_rate::Column::ServiceTypeId.eq(service_type.id))
        .all(conn)
        .await?;

    select_rate(
        &rates,
        &request.sender_region,
        &request.recipient_region,
        request.weight,
    )
    .cloned()
    .ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "no {} rate covers {} kg from {} to {}",
            service_type.code, request.weight, request.sender_region, request.recipient_region
        ))
    })
}

pub(crate) async fn find_promotion<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<promotion::Model, ServiceError> {
    PromotionEntity::find()
        .filter(promotion::Column::Code.eq(code.trim().to_uppercase()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("promotion {} not found", code)))
}

/// Quote inside an existing connection or transaction.
pub(crate) async fn quote_on<C: ConnectionTrait>(
    conn: &C,
    request: &QuoteRequest,
    promotion_code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<FeeQuote, ServiceError> {
    let rate = load_rate(conn, request).await?;
    let promotion = match promotion_code {
        Some(code) => Some(find_promotion(conn, code).await?),
        None => None,
    };
    Ok(quote_fee(&rate, request.weight, promotion.as_ref(), now))
}
