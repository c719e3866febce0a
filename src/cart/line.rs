use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

/// One product in the cart. Name, price and image are captured when the line
/// is created and are not refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: i64,
    pub image: Option<String>,
    pub quantity: i32,
    pub stock_ceiling: i32,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.effective_price(),
            image: product.image.clone(),
            quantity,
            stock_ceiling: product.stock,
        }
    }

    pub fn subtotal(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Lines in insertion order, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Cart {
    #[schema(value_type = Vec<CartLine>)]
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub(crate) fn line_mut(&mut self, product_id: Uuid) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of `unit_price * quantity` over all lines.
    pub fn total(&self) -> i64 {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Sum of quantities over all lines.
    pub fn count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub(crate) fn push(&mut self, line: CartLine) {
        debug_assert!(self.line(line.product_id).is_none());
        self.lines.push(line);
    }

    pub(crate) fn remove(&mut self, product_id: Uuid) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }
}
