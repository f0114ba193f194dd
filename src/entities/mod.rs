//! Database entities for the parcel network.

pub mod office;
pub mod order;
pub mod order_history;
pub mod payment_submission;
pub mod promotion;
pub mod service_type;
pub mod shipment;
pub mod shipment_order;
pub mod shipping_collection;
pub mod shipping_rate;
pub mod transaction;
