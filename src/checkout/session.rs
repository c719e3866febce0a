use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cart::{Cart, CartSession, CartStorage, Notice},
    error::{AppError, AppResult},
};

use super::{DeliveryPolicy, OrderGateway, OrderLineRequest, OrderRequest, Quote, ShippingDetails};

pub const SUBMISSION_FALLBACK_MESSAGE: &str = "Failed to place order";

/// `Idle -> Submitting -> Completed`, or back to `Idle` when the submission
/// fails. `Submitting` is the busy flag that blocks a second submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Completed,
}

#[derive(Debug, Default)]
pub struct CheckoutSession {
    state: CheckoutState,
}

impl CheckoutSession {
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == CheckoutState::Submitting
    }

    /// Validate the form, price the cart and enter `Submitting`.
    ///
    /// On error the state is left untouched.
    pub fn begin(
        &mut self,
        cart: &Cart,
        details: &ShippingDetails,
        policy: &DeliveryPolicy,
    ) -> AppResult<(OrderRequest, Quote)> {
        if self.is_busy() {
            return Err(AppError::Conflict(
                "checkout already in progress".to_string(),
            ));
        }
        details.validate()?;
        if cart.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        let quote = policy.quote(cart.total(), &details.city);
        let request = OrderRequest {
            items: cart
                .lines()
                .iter()
                .map(|line| OrderLineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            shipping_address: details.shipping_address(),
            payment_method: details.payment_method,
            total_amount: quote.grand_total,
            name: details.name.trim().to_string(),
            phone: details.phone.trim().to_string(),
        };

        self.state = CheckoutState::Submitting;
        Ok((request, quote))
    }

    pub fn complete(&mut self) {
        self.state = CheckoutState::Completed;
    }

    pub fn fail(&mut self) {
        self.state = CheckoutState::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Placed {
        order_id: Option<Uuid>,
        quote: Quote,
        message: String,
    },
    Failed {
        message: String,
    },
}

impl CheckoutOutcome {
    pub fn notice(&self) -> Notice {
        match self {
            CheckoutOutcome::Placed { message, .. } => Notice::success(message.clone()),
            CheckoutOutcome::Failed { message } => Notice::error(message.clone()),
        }
    }
}

/// Run one checkout attempt for the cart in `session`.
///
/// The session lock is released while the gateway call is in flight; the
/// `Submitting` state rejects concurrent submissions meanwhile. On success the
/// cart is emptied; a storage failure at that point is logged and never turns
/// the placed order into an error. On failure the cart is untouched and the form returns to
/// `Idle`.
pub async fn submit_checkout<S, G>(
    session: &Mutex<CartSession<S>>,
    gateway: &G,
    details: &ShippingDetails,
    policy: &DeliveryPolicy,
) -> AppResult<CheckoutOutcome>
where
    S: CartStorage,
    G: OrderGateway,
{
    let (key, request, quote) = {
        let mut guard = session.lock().await;
        let session = &mut *guard;
        if session.is_ended() {
            return Err(AppError::Conflict("cart session has ended".to_string()));
        }
        let (request, quote) = session.checkout.begin(session.store.cart(), details, policy)?;
        (session.store.key().to_string(), request, quote)
    };
    tracing::info!(cart_key = %key, total = quote.grand_total, lines = request.items.len(), "submitting order");

    let result = gateway.create_order(&request).await;

    let mut guard = session.lock().await;
    let session = &mut *guard;
    match result {
        Ok(response) if response.success => {
            session.checkout.complete();
            session.store.reset_after_order().await;
            tracing::info!(cart_key = %key, order_id = ?response.order_id, "order placed");
            Ok(CheckoutOutcome::Placed {
                order_id: response.order_id,
                quote,
                message: response
                    .message
                    .unwrap_or_else(|| "Order placed successfully".to_string()),
            })
        }
        Ok(response) => {
            session.checkout.fail();
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| SUBMISSION_FALLBACK_MESSAGE.to_string());
            tracing::warn!(cart_key = %key, %message, "order rejected");
            Ok(CheckoutOutcome::Failed { message })
        }
        Err(err) => {
            session.checkout.fail();
            tracing::warn!(cart_key = %key, error = %err, "order submission failed");
            Ok(CheckoutOutcome::Failed {
                message: SUBMISSION_FALLBACK_MESSAGE.to_string(),
            })
        }
    }
}
