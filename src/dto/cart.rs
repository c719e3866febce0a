use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cart::{Cart, CartLine, CartStorage, CartStore, QuantityDirection},
    checkout::{CheckoutOutcome, CheckoutState, Quote},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub direction: QuantityDirection,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub key: String,
    pub lines: Vec<CartLine>,
    pub cart_total: i64,
    pub cart_count: i64,
    pub checkout_state: CheckoutState,
}

impl CartView {
    pub fn new(key: &str, cart: &Cart, checkout_state: CheckoutState) -> Self {
        Self {
            key: key.to_string(),
            lines: cart.lines().to_vec(),
            cart_total: cart.total(),
            cart_count: cart.count(),
            checkout_state,
        }
    }

    pub fn from_store<S: CartStorage>(store: &CartStore<S>, checkout_state: CheckoutState) -> Self {
        Self::new(store.key(), store.cart(), checkout_state)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub placed: bool,
    pub order_id: Option<Uuid>,
    pub quote: Option<Quote>,
    pub message: String,
    pub checkout_state: CheckoutState,
}

impl CheckoutResult {
    pub fn new(outcome: &CheckoutOutcome, checkout_state: CheckoutState) -> Self {
        match outcome {
            CheckoutOutcome::Placed {
                order_id,
                quote,
                message,
            } => Self {
                placed: true,
                order_id: *order_id,
                quote: Some(*quote),
                message: message.clone(),
                checkout_state,
            },
            CheckoutOutcome::Failed { message } => Self {
                placed: false,
                order_id: None,
                quote: None,
                message: message.clone(),
                checkout_state,
            },
        }
    }
}
