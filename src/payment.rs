//! Payment provider integration
//!
//! The order lifecycle talks to the provider through [`PaymentGateway`] so the
//! HTTP client can be swapped out in tests. [`PayChangu`] is the production
//! implementation. Webhook signature checking lives here as well since it is
//! part of the provider contract.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw webhook body
pub const SIGNATURE_HEADER: &str = "x-paychangu-signature";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered but refused the request; holds its message
    #[error("{0}")]
    Rejected(String),
}

/// Payer and order details sent when opening a hosted checkout
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub amount: f64,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub customization: Customization,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Customization {
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout and returns the URL the customer is sent to
    async fn initialize_payment(&self, request: &CheckoutRequest) -> Result<String, PaymentError>;

    /// Fetches the provider's record of a transaction
    async fn verify_transaction(&self, tx_ref: &str) -> Result<Value, PaymentError>;
}

/// HTTP client for the PayChangu API
pub struct PayChangu {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PayChangu {
    pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read_body(response: reqwest::Response, fallback: &str) -> Result<Value, PaymentError> {
        let status = response.status();
        // Error bodies are not always JSON
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = provider_message(&body).unwrap_or(fallback).to_string();
            error!(%status, body = %body, "{}", fallback);
            return Err(PaymentError::Rejected(message));
        }
        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for PayChangu {
    #[instrument(skip(self, request), fields(tx_ref = %request.tx_ref))]
    async fn initialize_payment(&self, request: &CheckoutRequest) -> Result<String, PaymentError> {
        let response = self
            .client
            .post(format!("{}/payment", self.base_url))
            .bearer_auth(&self.secret_key)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let body = Self::read_body(response, "Payment initialization failed").await?;
        checkout_url(&body)
            .map(str::to_string)
            .ok_or_else(|| PaymentError::Rejected("Payment provider returned no checkout URL".into()))
    }

    #[instrument(skip(self))]
    async fn verify_transaction(&self, tx_ref: &str) -> Result<Value, PaymentError> {
        let response = self
            .client
            .get(format!("{}/verify-payment/{}", self.base_url, tx_ref))
            .bearer_auth(&self.secret_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::read_body(response, "Payment verification failed").await
    }
}

/// The checkout URL is either nested under `data` or at the top level
pub fn checkout_url(body: &Value) -> Option<&str> {
    body.pointer("/data/checkout_url")
        .or_else(|| body.get("checkout_url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
}

/// A verification response reports success either as `status` or `data.status`
pub fn is_successful(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("success")
        || body.pointer("/data/status").and_then(Value::as_str) == Some("success")
}

fn provider_message(body: &Value) -> Option<&str> {
    body.get("message").and_then(Value::as_str)
}

/// Hex HMAC-SHA256 of `payload` keyed by `secret`
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a webhook signature against the raw body
///
/// The comparison is constant-time over the decoded MAC bytes. A header that
/// is not valid hex never matches.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = mac_for(secret);
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Payer first and last name: the first two single-space separated segments
/// of the display name. A missing or empty second segment becomes "Customer".
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.trim().split(' ');
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts
        .next()
        .filter(|part| !part.is_empty())
        .unwrap_or("Customer")
        .to_string();
    (first, last)
}
