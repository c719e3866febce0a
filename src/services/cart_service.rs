use uuid::Uuid;

use crate::{
    cart::CartUpdate,
    checkout::{Quote, ShippingDetails, submit_checkout},
    dto::cart::{AddToCartRequest, CartView, CheckoutResult, UpdateQuantityRequest},
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    services::{order_service::OrmOrderGateway, product_service},
    state::AppState,
};

pub async fn view_cart(state: &AppState, key: &str) -> AppResult<ApiResponse<CartView>> {
    let (cart, checkout_state) = state.carts.peek(key).await?;
    let view = CartView::new(key, &cart, checkout_state);
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// The quantity is checked here as well as in the store so that a bad request
/// is refused before the catalog lookup.
pub async fn add_to_cart(
    state: &AppState,
    key: &str,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    let product = product_service::find_product(state, payload.product_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;

    let mut session = state.carts.lock(key).await?;
    let update = session.store.add_to_cart(&product, payload.quantity).await?;
    let view = CartView::from_store(&session.store, session.checkout.state());
    Ok(respond(view, update))
}

pub async fn update_quantity(
    state: &AppState,
    key: &str,
    product_id: Uuid,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CartView>> {
    let mut session = state.carts.lock(key).await?;
    let update = session
        .store
        .update_quantity(product_id, payload.direction)
        .await?;
    let view = CartView::from_store(&session.store, session.checkout.state());
    Ok(respond(view, update))
}

pub async fn remove_from_cart(
    state: &AppState,
    key: &str,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let mut session = state.carts.lock(key).await?;
    let update = session.store.remove_from_cart(product_id).await?;
    let view = CartView::from_store(&session.store, session.checkout.state());
    Ok(respond(view, update))
}

pub async fn clear_cart(state: &AppState, key: &str) -> AppResult<ApiResponse<CartView>> {
    let mut session = state.carts.lock(key).await?;
    let update = session.store.clear_cart().await?;
    let view = CartView::from_store(&session.store, session.checkout.state());
    Ok(respond(view, update))
}

pub async fn quote(state: &AppState, key: &str, city: &str) -> AppResult<ApiResponse<Quote>> {
    let (cart, _) = state.carts.peek(key).await?;
    let quote = state.delivery.quote(cart.total(), city);
    Ok(ApiResponse::success("OK", quote, Some(Meta::empty())))
}

pub async fn checkout(
    state: &AppState,
    key: &str,
    details: ShippingDetails,
) -> AppResult<ApiResponse<CheckoutResult>> {
    let session = state.carts.session(key).await?;
    let gateway = OrmOrderGateway::from_state(state);
    let outcome = submit_checkout(&*session, &gateway, &details, &state.delivery).await?;

    let checkout_state = session.lock().await.checkout.state();
    let result = CheckoutResult::new(&outcome, checkout_state);
    Ok(ApiResponse::success("OK", result, Some(Meta::empty())).with_notice(Some(outcome.notice())))
}

pub async fn end_session(state: &AppState, key: &str) -> AppResult<ApiResponse<serde_json::Value>> {
    let ended = state.carts.end_session(key).await?;
    Ok(ApiResponse::success(
        if ended { "Session ended" } else { "No active session" },
        serde_json::json!({ "ended": ended }),
        Some(Meta::empty()),
    ))
}

fn respond(view: CartView, update: CartUpdate) -> ApiResponse<CartView> {
    ApiResponse::success("OK", view, Some(Meta::empty())).with_notice(update.notice)
}
