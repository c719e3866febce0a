use serde::Deserialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Product,
};

use super::{
    Cart, CartEvent, CartLine, CartStorage, CartUpdate, Notice, decode_snapshot, encode_snapshot,
};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuantityDirection {
    Increment,
    Decrement,
}

/// Authoritative state of one visitor's cart.
///
/// Loaded once by [`CartStore::open`]; afterwards every mutation is written
/// through to `storage` before it becomes visible in memory.
pub struct CartStore<S> {
    key: String,
    cart: Cart,
    storage: S,
    events: broadcast::Sender<CartEvent>,
}

impl<S: CartStorage> CartStore<S> {
    pub async fn open(key: impl Into<String>, storage: S) -> AppResult<Self> {
        let key = key.into();
        let cart = load_cart(&storage, &key).await?;
        tracing::debug!(cart_key = %key, lines = cart.len(), "cart opened");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            key,
            cart,
            storage,
            events,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_total(&self) -> i64 {
        self.cart.total()
    }

    pub fn cart_count(&self) -> i64 {
        self.cart.count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    ///
    /// Rejected with a warning when the resulting quantity would exceed the
    /// line's stock ceiling; the cart is left as it was.
    pub async fn add_to_cart(&mut self, product: &Product, quantity: i32) -> AppResult<CartUpdate> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }

        let mut next = self.cart.clone();
        let rejection = if let Some(line) = next.line_mut(product.id) {
            match line.quantity.checked_add(quantity) {
                Some(wanted) if wanted <= line.stock_ceiling => {
                    line.quantity = wanted;
                    None
                }
                _ => Some(stock_exceeded(&line.name, line.stock_ceiling)),
            }
        } else if quantity > product.stock {
            Some(stock_exceeded(&product.name, product.stock))
        } else {
            next.push(CartLine::from_product(product, quantity));
            None
        };

        let update = match rejection {
            Some(rejection) => {
                tracing::debug!(cart_key = %self.key, product_id = %product.id, quantity, "add rejected");
                CartUpdate::rejected(rejection)
            }
            None => {
                self.commit(next).await?;
                CartUpdate::applied(Some(Notice::success(format!(
                    "{} added to cart",
                    product.name
                ))))
            }
        };
        self.publish(&update);
        Ok(update)
    }

    /// Drop the line for `product_id`. Absent products are a silent no-op.
    pub async fn remove_from_cart(&mut self, product_id: Uuid) -> AppResult<CartUpdate> {
        let mut next = self.cart.clone();
        let Some(removed) = next.remove(product_id) else {
            return Ok(CartUpdate::unchanged());
        };

        self.commit(next).await?;
        let update = CartUpdate::applied(Some(Notice::success(format!(
            "{} removed from cart",
            removed.name
        ))));
        self.publish(&update);
        Ok(update)
    }

    /// Step a line's quantity by one. Decrement stops at 1 without removing
    /// the line; increment stops at the stock ceiling with a warning.
    pub async fn update_quantity(
        &mut self,
        product_id: Uuid,
        direction: QuantityDirection,
    ) -> AppResult<CartUpdate> {
        let mut next = self.cart.clone();
        let Some(line) = next.line_mut(product_id) else {
            return Ok(CartUpdate::unchanged());
        };

        let update = match direction {
            QuantityDirection::Increment if line.quantity >= line.stock_ceiling => {
                CartUpdate::rejected(stock_exceeded(&line.name, line.stock_ceiling))
            }
            QuantityDirection::Decrement if line.quantity <= 1 => CartUpdate::unchanged(),
            QuantityDirection::Increment => {
                line.quantity += 1;
                self.commit(next).await?;
                CartUpdate::applied(None)
            }
            QuantityDirection::Decrement => {
                line.quantity -= 1;
                self.commit(next).await?;
                CartUpdate::applied(None)
            }
        };
        self.publish(&update);
        Ok(update)
    }

    /// Empty the cart and delete its durable snapshot.
    pub async fn clear_cart(&mut self) -> AppResult<CartUpdate> {
        self.storage.remove(&self.key).await?;
        self.cart = Cart::default();
        tracing::debug!(cart_key = %self.key, "cart cleared");

        let update = CartUpdate::applied(Some(Notice::success("Cart cleared")));
        self.publish(&update);
        Ok(update)
    }

    /// Empty the cart once its order has been placed.
    ///
    /// The in-memory cart is reset even when the snapshot cannot be deleted.
    /// In that case an empty snapshot is written over it instead, and a
    /// failure of that write is only logged.
    pub async fn reset_after_order(&mut self) {
        self.cart = Cart::default();
        if let Err(err) = self.storage.remove(&self.key).await {
            tracing::warn!(cart_key = %self.key, error = %err, "could not delete snapshot of ordered cart");
            let overwritten = match encode_snapshot(&self.cart) {
                Ok(empty) => self.storage.save(&self.key, &empty).await,
                Err(err) => Err(err),
            };
            if let Err(err) = overwritten {
                tracing::error!(cart_key = %self.key, error = %err, "ordered cart snapshot left in storage");
            }
        }
        self.publish(&CartUpdate::applied(None));
    }

    async fn commit(&mut self, next: Cart) -> AppResult<()> {
        let snapshot = encode_snapshot(&next)?;
        self.storage.save(&self.key, &snapshot).await?;
        self.cart = next;
        Ok(())
    }

    fn publish(&self, update: &CartUpdate) {
        if !update.changed && update.notice.is_none() {
            return;
        }
        // no subscribers is fine
        let _ = self.events.send(CartEvent {
            key: self.key.clone(),
            notice: update.notice.clone(),
            cart_total: self.cart_total(),
            cart_count: self.cart_count(),
        });
    }
}

/// Load and decode the snapshot for `key`. An unreadable snapshot yields an
/// empty cart.
pub(crate) async fn load_cart<S: CartStorage>(storage: &S, key: &str) -> AppResult<Cart> {
    Ok(match storage.load(key).await? {
        Some(raw) => decode_snapshot(&raw).unwrap_or_else(|err| {
            tracing::warn!(cart_key = %key, error = %err, "unreadable cart snapshot, starting empty");
            Cart::default()
        }),
        None => Cart::default(),
    })
}

fn stock_exceeded(name: &str, available: i32) -> Notice {
    if available <= 0 {
        Notice::warning(format!("{name} is out of stock"))
    } else {
        Notice::warning(format!("Only {available} of {name} available in stock"))
    }
}
