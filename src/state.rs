use std::{sync::Arc, time::Duration};

use crate::{
    cart::{CartBackend, CartRegistry},
    checkout::DeliveryPolicy,
    db::{DbPool, OrmConn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub carts: Arc<CartRegistry<CartBackend>>,
    pub delivery: DeliveryPolicy,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        orm: OrmConn,
        carts: CartBackend,
        session_idle_timeout: Duration,
        delivery: DeliveryPolicy,
    ) -> Self {
        Self {
            pool,
            orm,
            carts: Arc::new(CartRegistry::with_idle_timeout(carts, session_idle_timeout)),
            delivery,
        }
    }
}
