use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::addresses::AddressRequest,
    models::{DeliveryMethod, Order, OrderSummary, PaymentMethod},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub cart_item_ids: Vec<Uuid>,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub address: AddressRequest,
}

/// Fields left out are not changed. Values are parsed so an unknown status is a 400.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
    pub delivery_status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct OrderStatusCounts {
    pub order_status: BTreeMap<String, i64>,
    pub payment_status: BTreeMap<String, i64>,
    pub delivery_status: BTreeMap<String, i64>,
}
