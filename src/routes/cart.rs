use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    checkout::{Quote, ShippingDetails},
    dto::cart::{AddToCartRequest, CartView, CheckoutResult, UpdateQuantityRequest},
    error::AppResult,
    response::ApiResponse,
    routes::params::QuoteQuery,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{key}", get(get_cart).delete(clear_cart))
        .route("/{key}/items", post(add_to_cart))
        .route(
            "/{key}/items/{product_id}",
            patch(update_quantity).delete(remove_from_cart),
        )
        .route("/{key}/quote", get(quote))
        .route("/{key}/checkout", post(checkout))
        .route("/{key}/session", delete(end_session))
}

#[utoipa::path(
    get,
    path = "/api/cart/{key}",
    params(("key" = String, Path, description = "Cart key")),
    responses(
        (status = 200, description = "Cart lines and totals", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid cart key"),
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::view_cart(&state, &key).await?))
}

#[utoipa::path(
    post,
    path = "/api/cart/{key}/items",
    params(("key" = String, Path, description = "Cart key")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line added, or a stock warning in `notice`", body = ApiResponse<CartView>),
        (status = 400, description = "Bad request"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::add_to_cart(&state, &key, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{key}/items/{product_id}",
    params(
        ("key" = String, Path, description = "Cart key"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity stepped, or a stock warning in `notice`", body = ApiResponse<CartView>),
    ),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    Path((key, product_id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        cart_service::update_quantity(&state, &key, product_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{key}/items/{product_id}",
    params(
        ("key" = String, Path, description = "Cart key"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Line removed (no-op when absent)", body = ApiResponse<CartView>),
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path((key, product_id)): Path<(String, Uuid)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        cart_service::remove_from_cart(&state, &key, product_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{key}",
    params(("key" = String, Path, description = "Cart key")),
    responses(
        (status = 200, description = "Cart emptied and snapshot deleted", body = ApiResponse<CartView>),
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::clear_cart(&state, &key).await?))
}

#[utoipa::path(
    get,
    path = "/api/cart/{key}/quote",
    params(
        ("key" = String, Path, description = "Cart key"),
        QuoteQuery
    ),
    responses(
        (status = 200, description = "Delivery fee and grand total", body = ApiResponse<Quote>),
    ),
    tag = "Checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> AppResult<Json<ApiResponse<Quote>>> {
    Ok(Json(cart_service::quote(&state, &key, &query.city).await?))
}

#[utoipa::path(
    post,
    path = "/api/cart/{key}/checkout",
    params(("key" = String, Path, description = "Cart key")),
    request_body = ShippingDetails,
    responses(
        (status = 200, description = "Order placed, or the rejection message", body = ApiResponse<CheckoutResult>),
        (status = 400, description = "Invalid form or empty cart"),
        (status = 409, description = "Checkout already in progress"),
    ),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(details): Json<ShippingDetails>,
) -> AppResult<Json<ApiResponse<CheckoutResult>>> {
    Ok(Json(cart_service::checkout(&state, &key, details).await?))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{key}/session",
    params(("key" = String, Path, description = "Cart key")),
    responses(
        (status = 200, description = "In-memory session dropped", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Checkout in progress"),
    ),
    tag = "Cart"
)]
pub async fn end_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(cart_service::end_session(&state, &key).await?))
}
