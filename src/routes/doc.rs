use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    cart::{CartLine, Notice, NoticeLevel, QuantityDirection},
    checkout::{
        CheckoutState, OrderLineRequest, OrderRequest, OrderResponse, PaymentMethod, Quote,
        ShippingDetails,
    },
    dto::{
        cart::{AddToCartRequest, CartView, CheckoutResult, UpdateQuantityRequest},
        orders::OrderWithItems,
        products::ProductList,
    },
    models::{Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params, products},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::quote,
        cart::checkout,
        cart::end_session,
        orders::create_order,
        orders::get_order
    ),
    components(
        schemas(
            Product,
            Order,
            OrderItem,
            CartLine,
            Notice,
            NoticeLevel,
            QuantityDirection,
            CheckoutState,
            PaymentMethod,
            Quote,
            ShippingDetails,
            OrderLineRequest,
            OrderRequest,
            OrderResponse,
            AddToCartRequest,
            UpdateQuantityRequest,
            CartView,
            CheckoutResult,
            OrderWithItems,
            ProductList,
            params::Pagination,
            params::ProductQuery,
            params::QuoteQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<Quote>,
            ApiResponse<CheckoutResult>,
            ApiResponse<OrderWithItems>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Visitor cart endpoints"),
        (name = "Checkout", description = "Delivery quote and order submission"),
        (name = "Orders", description = "Order creation endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
