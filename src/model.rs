//! Data models for the storefront
//!
//! Records are stored as JSON documents in redb and returned to clients in the
//! same shape: camelCase fields, ids under `_id`. Request payloads are
//! separate types validated at the handler boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// A user account as stored. Holds the password hash, so it is never
/// serialized into a response; use [`UserProfile`] for that.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    /// Lower-cased and trimmed; unique across users
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Reference to an image held by the image store
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProductImage {
    /// Identifier understood by the image store, used for deletion
    #[serde(default, alias = "publicId")]
    pub public_id: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Mean review rating rounded to one decimal, 0 without reviews
    #[serde(default)]
    pub rating_average: f64,
    #[serde(default)]
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// Partial update; absent fields keep their current value
#[derive(Deserialize, Debug, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub images: Option<Vec<ProductImage>>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingDelivery,
    Delivered,
}

/// A line item with the unit price captured when the order was placed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user: String,
    #[serde(rename = "products", alias = "items")]
    pub items: Vec<OrderItem>,
    /// Total as submitted by the client at checkout
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// Join key with the payment provider
    pub transaction_ref: String,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Moves the payment to `paid`. Returns false when it already was.
    pub fn mark_paid(&mut self) -> bool {
        if self.payment_status == PaymentStatus::Paid {
            return false;
        }
        self.payment_status = PaymentStatus::Paid;
        self.updated_at = Utc::now();
        true
    }

    /// Moves the order to `delivered`. Returns false when it already was.
    pub fn mark_delivered(&mut self) -> bool {
        if self.order_status == OrderStatus::Delivered {
            return false;
        }
        self.order_status = OrderStatus::Delivered;
        self.updated_at = Utc::now();
        true
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product == product_id)
    }

    /// Sum of quantity times unit price over the line items
    pub fn items_total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.quantity) * item.price)
            .sum()
    }
}

/// One cart line as sent by the client
#[derive(Deserialize, Debug, Clone)]
pub struct CartItem {
    #[serde(alias = "_id", alias = "productId")]
    pub product: String,
    #[serde(alias = "quantity")]
    pub qty: u32,
    pub price: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<CartItem>,
    pub total_amount: f64,
    pub delivery_notes: Option<String>,
}

/// Customer fields embedded in the admin order listing
#[derive(Serialize, Debug, Clone)]
pub struct CustomerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithCustomer {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<CustomerSummary>,
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user: String,
    pub product: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: String,
    pub rating: u8,
    pub comment: String,
}

/// Review joined with the names of its author and product
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}
