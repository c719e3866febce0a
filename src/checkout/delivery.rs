use serde::Serialize;
use utoipa::ToSchema;

/// Flat delivery fee chosen by whether the city names the metro area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub metro: String,
    pub inside_fee: i64,
    pub outside_fee: i64,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::new("dhaka", 60, 120)
    }
}

impl DeliveryPolicy {
    pub fn new(metro: impl Into<String>, inside_fee: i64, outside_fee: i64) -> Self {
        Self {
            metro: metro.into().trim().to_lowercase(),
            inside_fee,
            outside_fee,
        }
    }

    pub fn fee_for(&self, city: &str) -> i64 {
        let city = city.trim().to_lowercase();
        if !self.metro.is_empty() && city.contains(&self.metro) {
            self.inside_fee
        } else {
            self.outside_fee
        }
    }

    pub fn quote(&self, cart_total: i64, city: &str) -> Quote {
        let delivery_fee = self.fee_for(city);
        Quote {
            cart_total,
            delivery_fee,
            grand_total: cart_total + delivery_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Quote {
    pub cart_total: i64,
    pub delivery_fee: i64,
    pub grand_total: i64,
}
