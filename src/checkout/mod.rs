//! Delivery pricing, order request shaping and the checkout state machine.

mod delivery;
mod gateway;
mod request;
mod session;

pub use delivery::{DeliveryPolicy, Quote};
pub use gateway::OrderGateway;
pub use request::{OrderLineRequest, OrderRequest, OrderResponse, PaymentMethod, ShippingDetails};
pub use session::{
    CheckoutOutcome, CheckoutSession, CheckoutState, SUBMISSION_FALLBACK_MESSAGE, submit_checkout,
};
