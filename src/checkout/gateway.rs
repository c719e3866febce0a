use std::future::Future;

use crate::error::AppResult;

use super::{OrderRequest, OrderResponse};

/// Order creation endpoint as seen from checkout.
///
/// `Ok` with `success: false` is a business rejection carrying a
/// user-facing message; `Err` means the request itself failed.
pub trait OrderGateway: Send + Sync {
    fn create_order(
        &self,
        request: &OrderRequest,
    ) -> impl Future<Output = AppResult<OrderResponse>> + Send;
}
