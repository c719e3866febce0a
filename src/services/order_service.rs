use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    checkout::{OrderGateway, OrderRequest, OrderResponse},
    db::{DbPool, OrmConn},
    dto::orders::OrderWithItems,
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

/// Order creation backed by this service's own database.
#[derive(Clone)]
pub struct OrmOrderGateway {
    orm: OrmConn,
    pool: DbPool,
}

impl OrmOrderGateway {
    pub fn new(orm: OrmConn, pool: DbPool) -> Self {
        Self { orm, pool }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.orm.clone(), state.pool.clone())
    }
}

impl OrderGateway for OrmOrderGateway {
    async fn create_order(&self, request: &OrderRequest) -> AppResult<OrderResponse> {
        create_order(&self.orm, &self.pool, request).await
    }
}

/// Place an order: check stock, write the order and its items, and take the
/// quantities out of stock, all in one transaction.
///
/// Insufficient stock is a rejection (`success: false`), not an error.
pub async fn create_order(
    orm: &OrmConn,
    pool: &DbPool,
    request: &OrderRequest,
) -> AppResult<OrderResponse> {
    validate_request(request)?;

    let mut wanted: HashMap<Uuid, i32> = HashMap::new();
    let mut order_of_lines: Vec<Uuid> = Vec::new();
    for item in &request.items {
        let entry = wanted.entry(item.product_id).or_insert_with(|| {
            order_of_lines.push(item.product_id);
            0
        });
        *entry = entry
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
    }

    let txn = orm.begin().await?;

    let products: HashMap<Uuid, Product> = Products::find()
        .filter(ProdCol::Id.is_in(order_of_lines.clone()))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(product_from_entity)
        .map(|p| (p.id, p))
        .collect();

    for product_id in &order_of_lines {
        let quantity = wanted[product_id];
        let Some(product) = products.get(product_id) else {
            txn.rollback().await?;
            return Ok(OrderResponse::rejected(format!(
                "Product {product_id} is no longer available"
            )));
        };
        if product.stock < quantity {
            txn.rollback().await?;
            tracing::info!(product_id = %product_id, stock = product.stock, quantity, "order rejected for stock");
            return Ok(OrderResponse::rejected(format!(
                "Out of stock: {}",
                product.name
            )));
        }
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        customer_name: Set(request.name.trim().to_string()),
        phone: Set(request.phone.trim().to_string()),
        shipping_address: Set(request.shipping_address.trim().to_string()),
        payment_method: Set(request.payment_method.to_string()),
        total_amount: Set(request.total_amount),
        status: Set("pending".into()),
        invoice_number: Set(build_invoice_number(order_id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for product_id in &order_of_lines {
        let quantity = wanted[product_id];
        let unit_price = products
            .get(product_id)
            .map(Product::effective_price)
            .unwrap_or_default();

        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(*product_id),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(*product_id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    tracing::info!(order_id = %order.id, invoice = %order.invoice_number, "order created");

    if let Err(err) = log_audit(
        pool,
        "order_create",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "total_amount": order.total_amount,
            "lines": order_of_lines.len(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(OrderResponse::placed(order.id))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

fn validate_request(request: &OrderRequest) -> AppResult<()> {
    if request.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".into()));
    }
    if request.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    if request.total_amount < 0 {
        return Err(AppError::BadRequest("totalAmount must not be negative".into()));
    }
    for (field, value) in [
        ("name", &request.name),
        ("phone", &request.phone),
        ("shippingAddress", &request.shipping_address),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }
    Ok(())
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_name: model.customer_name,
        phone: model.phone,
        shipping_address: model.shipping_address,
        payment_method: model.payment_method,
        total_amount: model.total_amount,
        status: model.status,
        invoice_number: model.invoice_number,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("INV-{}-{}", date, &suffix[..8])
}
