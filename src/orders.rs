//! Order lifecycle
//!
//! An order is written as `pending` / `pending_delivery` before the payment
//! provider is contacted. Its payment is then confirmed by whichever comes
//! first of a customer-initiated verification or a signed provider webhook;
//! delivery is confirmed by an administrator. Both statuses only move forward.
//!
//! If opening the checkout fails, the order stays stored as pending and the
//! caller gets the provider error. Nothing reconciles such orders later.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::ReadableTable;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{
    get_json, index_key, index_values, put_json, Store, TABLE_ORDERS, TABLE_ORDER_REFS,
    TABLE_USERS, TABLE_USER_ORDERS,
};
use crate::error::{AppError, AppResult};
use crate::model::{
    CreateOrderRequest, CustomerSummary, Order, OrderItem, OrderStatus, OrderWithCustomer,
    PaymentStatus, UserRecord,
};
use crate::payment::{
    is_successful, split_name, CheckoutRequest, Customization, PaymentGateway,
};

/// Event name the provider sends for a completed payment
const PAYMENT_SUCCESS_EVENT: &str = "payment.success";

pub fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".into())
}

/// A stored order together with the URL of its hosted checkout
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment_url: String,
}

/// Outcome of a signed webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order moved from pending to paid
    Paid(String),
    /// The order was already paid
    AlreadyPaid(String),
    /// Success event for a reference no order carries
    UnknownReference,
    /// Not a payment success event
    Ignored,
}

/// Transaction reference: `TX-{unix millis}-{8 alphanumerics}`
pub fn generate_tx_ref() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("TX-{}-{}", Utc::now().timestamp_millis(), suffix.to_uppercase())
}

fn validate(request: &CreateOrderRequest) -> AppResult<Vec<OrderItem>> {
    if request.order_items.is_empty() {
        return Err(AppError::Validation("No order items".into()));
    }
    if !request.total_amount.is_finite() || request.total_amount < 0.0 {
        return Err(AppError::Validation("Total amount must be a non-negative number".into()));
    }

    request
        .order_items
        .iter()
        .map(|item| {
            if item.product.trim().is_empty() {
                return Err(AppError::Validation("Every order item needs a product".into()));
            }
            if item.qty < 1 {
                return Err(AppError::Validation("Quantity must be at least 1".into()));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(AppError::Validation("Price must be a non-negative number".into()));
            }
            Ok(OrderItem {
                product: item.product.trim().to_string(),
                quantity: item.qty,
                price: item.price,
            })
        })
        .collect()
}

/// Stores a new pending order and its indexes in one transaction
fn insert_order(store: &Store, user_id: &str, request: &CreateOrderRequest) -> AppResult<Order> {
    let items = validate(request)?;
    let now = Utc::now();

    let write_txn = store.write()?;
    let order = {
        let mut refs = write_txn.open_table(TABLE_ORDER_REFS)?;
        let mut tx_ref = generate_tx_ref();
        while refs.get(tx_ref.as_str())?.is_some() {
            tx_ref = generate_tx_ref();
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            items,
            total_amount: request.total_amount,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::PendingDelivery,
            transaction_ref: tx_ref,
            delivery_notes: request
                .delivery_notes
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        refs.insert(order.transaction_ref.as_str(), order.id.as_str())?;

        let mut user_orders = write_txn.open_table(TABLE_USER_ORDERS)?;
        let key = index_key(user_id, now.timestamp_micros(), &order.id);
        user_orders.insert(key.as_str(), order.id.as_str())?;

        let mut orders = write_txn.open_table(TABLE_ORDERS)?;
        put_json(&mut orders, &order.id, &order)?;
        order
    };
    write_txn.commit()?;

    Ok(order)
}

fn checkout_request(order: &Order, user: &UserRecord, config: &Config) -> CheckoutRequest {
    let (first_name, last_name) = split_name(&user.name);
    let landing = format!("{}/order-success/{}", config.frontend_url, order.id);

    CheckoutRequest {
        amount: order.total_amount,
        currency: config.currency.clone(),
        email: user.email.clone(),
        first_name,
        last_name,
        tx_ref: order.transaction_ref.clone(),
        callback_url: landing.clone(),
        return_url: landing,
        customization: Customization {
            title: config.shop_name.clone(),
            description: format!("Payment for Order #{}", order.id),
        },
    }
}

/// Places an order for `user` and opens its hosted checkout
///
/// The total is taken from the client as submitted. A mismatch with the line
/// items is logged, not rejected.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_order(
    store: &Store,
    payments: &dyn PaymentGateway,
    config: &Config,
    user: &UserRecord,
    request: CreateOrderRequest,
) -> AppResult<PlacedOrder> {
    let order = insert_order(store, &user.id, &request)?;

    let items_total = order.items_total();
    if (items_total - order.total_amount).abs() > 0.005 {
        warn!(
            order_id = %order.id,
            total_amount = order.total_amount,
            items_total,
            "order total differs from its line items"
        );
    }
    info!(order_id = %order.id, tx_ref = %order.transaction_ref, "order created");

    let payment_url = payments
        .initialize_payment(&checkout_request(&order, user, config))
        .await
        .inspect_err(|e| {
            warn!(order_id = %order.id, error = %e, "checkout initialization failed, order left pending");
        })?;

    Ok(PlacedOrder { order, payment_url })
}

pub fn get(store: &Store, order_id: &str) -> AppResult<Order> {
    store.fetch(TABLE_ORDERS, order_id)?.ok_or_else(order_not_found)
}

/// Marks the order paid if it is not already. Returns the stored order and
/// whether this call changed it.
fn settle(store: &Store, order_id: &str) -> AppResult<(Order, bool)> {
    let write_txn = store.write()?;
    let result = {
        let mut orders = write_txn.open_table(TABLE_ORDERS)?;
        let mut order: Order = get_json(&orders, order_id)?.ok_or_else(order_not_found)?;
        let changed = order.mark_paid();
        if changed {
            put_json(&mut orders, &order.id, &order)?;
        }
        (order, changed)
    };
    if result.1 {
        write_txn.commit()?;
    } else {
        write_txn.abort()?;
    }
    Ok(result)
}

/// Asks the provider about the order's transaction and records a successful
/// payment
///
/// Only the owner or an administrator may verify. A provider answer other than
/// success leaves the order untouched and yields a validation error.
#[instrument(skip(store, payments, requester), fields(requester = %requester.id))]
pub async fn verify_order(
    store: &Store,
    payments: &dyn PaymentGateway,
    requester: &UserRecord,
    order_id: &str,
) -> AppResult<Order> {
    let order = get(store, order_id)?;
    if order.user != requester.id && !requester.is_admin() {
        return Err(AppError::Forbidden("Not authorized to verify this order".into()));
    }

    let verification = payments.verify_transaction(&order.transaction_ref).await?;
    if !is_successful(&verification) {
        info!(order_id, "payment not confirmed by provider");
        return Err(AppError::Validation("Payment verification failed or pending".into()));
    }

    let (order, changed) = settle(store, order_id)?;
    if changed {
        info!(order_id, "payment verified, order marked paid");
    }
    Ok(order)
}

/// Applies an already signature-checked webhook payload
///
/// A success event is recognised by `event == "payment.success"` or
/// `status == "success"`, at the top level or under `data`.
pub fn apply_webhook(store: &Store, payload: &Value) -> AppResult<WebhookOutcome> {
    let field = |name: &str| {
        payload
            .get(name)
            .or_else(|| payload.get("data").and_then(|data| data.get(name)))
            .and_then(Value::as_str)
    };

    let succeeded =
        field("event") == Some(PAYMENT_SUCCESS_EVENT) || field("status") == Some("success");
    if !succeeded {
        return Ok(WebhookOutcome::Ignored);
    }

    let Some(tx_ref) = field("tx_ref") else {
        warn!("payment webhook without tx_ref");
        return Ok(WebhookOutcome::UnknownReference);
    };

    let order_id = {
        let read_txn = store.read()?;
        let refs = read_txn.open_table(TABLE_ORDER_REFS)?;
        let order_id = refs.get(tx_ref)?.map(|guard| guard.value().to_string());
        order_id
    };
    let Some(order_id) = order_id else {
        warn!(tx_ref, "payment webhook for unknown transaction");
        return Ok(WebhookOutcome::UnknownReference);
    };

    let (_, changed) = settle(store, &order_id)?;
    if changed {
        info!(%order_id, tx_ref, "order marked paid via webhook");
        Ok(WebhookOutcome::Paid(order_id))
    } else {
        Ok(WebhookOutcome::AlreadyPaid(order_id))
    }
}

/// Sets the order delivered. There is no payment precondition.
pub fn mark_delivered(store: &Store, order_id: &str) -> AppResult<Order> {
    let write_txn = store.write()?;
    let order = {
        let mut orders = write_txn.open_table(TABLE_ORDERS)?;
        let mut order: Order = get_json(&orders, order_id)?.ok_or_else(order_not_found)?;
        if order.mark_delivered() {
            put_json(&mut orders, &order.id, &order)?;
        }
        order
    };
    write_txn.commit()?;

    info!(order_id, "order marked delivered");
    Ok(order)
}

/// A user's orders, newest first
pub fn list_for_user(store: &Store, user_id: &str) -> AppResult<Vec<Order>> {
    let read_txn = store.read()?;
    let index = read_txn.open_table(TABLE_USER_ORDERS)?;
    let orders = read_txn.open_table(TABLE_ORDERS)?;

    let mut result = Vec::new();
    for order_id in index_values(&index, user_id)?.iter().rev() {
        if let Some(order) = get_json(&orders, order_id)? {
            result.push(order);
        }
    }
    Ok(result)
}

/// Whether the user has a delivered order containing the product
pub fn has_delivered(store: &Store, user_id: &str, product_id: &str) -> AppResult<bool> {
    Ok(list_for_user(store, user_id)?
        .iter()
        .any(|order| order.order_status == OrderStatus::Delivered && order.contains_product(product_id)))
}

/// Every order with its customer, newest first
pub fn list_all(store: &Store) -> AppResult<Vec<OrderWithCustomer>> {
    let mut orders: Vec<Order> = store.fetch_all(TABLE_ORDERS)?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let read_txn = store.read()?;
    let users = read_txn.open_table(TABLE_USERS)?;
    orders
        .into_iter()
        .map(|order| {
            let customer = get_json::<UserRecord, _>(&users, &order.user)?.map(|user| CustomerSummary {
                id: user.id,
                name: user.name,
                email: user.email,
            });
            Ok(OrderWithCustomer { order, customer })
        })
        .collect()
}
