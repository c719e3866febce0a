use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog view of a product, as consumed by the cart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub image: Option<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Unit price a new cart line is billed at.
    ///
    /// The discount applies only when it is positive and not above the list price.
    pub fn effective_price(&self) -> i64 {
        match self.discount_price {
            Some(discount) if discount > 0 && discount <= self.price => discount,
            _ => self.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub total_amount: i64,
    pub status: String,
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub created_at: DateTime<Utc>,
}
