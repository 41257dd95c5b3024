//! Shared test harness: a router over a temporary database, a scripted
//! payment gateway and a temporary upload directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

use storefront::accounts;
use storefront::auth::issue_token;
use storefront::config::Config;
use storefront::database::Store;
use storefront::model::{RegisterRequest, Role, UserRecord};
use storefront::payment::{CheckoutRequest, PaymentError, PaymentGateway};
use storefront::route::create_app;
use storefront::state::AppState;
use storefront::upload::LocalImageStore;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const CHECKOUT_URL: &str = "https://checkout.paychangu.test/session/abc";

/// Payment gateway whose answers are set by the test
pub struct MockGateway {
    pub fail_initialize: AtomicBool,
    pub verify_response: Mutex<Value>,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
    pub verify_calls: AtomicUsize,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            fail_initialize: AtomicBool::new(false),
            verify_response: Mutex::new(json!({ "status": "pending" })),
            checkouts: Mutex::new(Vec::new()),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn respond_to_verify(&self, response: Value) {
        *self.verify_response.lock().unwrap() = response;
    }

    pub fn last_checkout(&self) -> Option<CheckoutRequest> {
        self.checkouts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize_payment(&self, request: &CheckoutRequest) -> Result<String, PaymentError> {
        self.checkouts.lock().unwrap().push(request.clone());
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected("Invalid API key".into()));
        }
        Ok(CHECKOUT_URL.to_string())
    }

    async fn verify_transaction(&self, _tx_ref: &str) -> Result<Value, PaymentError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verify_response.lock().unwrap().clone())
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Store,
    pub gateway: Arc<MockGateway>,
    pub upload_dir: PathBuf,
    _temp_db: NamedTempFile,
    _temp_uploads: TempDir,
}

pub fn test_config(upload_dir: PathBuf) -> Config {
    Config {
        port: 8080,
        database_path: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_days: 1,
        frontend_url: "http://shop.test".to_string(),
        public_url: "http://api.test".to_string(),
        paychangu_base_url: "http://paychangu.invalid".to_string(),
        paychangu_secret_key: "sk-test".to_string(),
        paychangu_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        paychangu_timeout_secs: 5,
        currency: "MWK".to_string(),
        shop_name: "Test Shop".to_string(),
        upload_dir,
        max_upload_bytes: 1024 * 1024,
        admin_seed: None,
    }
}

/// Builds an app; `adjust` may change the configuration first
pub fn setup_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    build_test_app(adjust, None)
}

/// Builds an app that talks to `payments` instead of the scripted gateway
pub fn setup_test_app_with_payments(payments: Arc<dyn PaymentGateway>) -> TestApp {
    build_test_app(|_| {}, Some(payments))
}

fn build_test_app(
    adjust: impl FnOnce(&mut Config),
    payments: Option<Arc<dyn PaymentGateway>>,
) -> TestApp {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let temp_uploads = TempDir::new().expect("Failed to create upload dir");
    let store = Store::open(temp_db.path().to_str().unwrap())
        .expect("Failed to initialize test database");

    let mut config = test_config(temp_uploads.path().to_path_buf());
    adjust(&mut config);

    let gateway = Arc::new(MockGateway::new());
    let images = LocalImageStore::new(temp_uploads.path(), &config.public_url).unwrap();
    let state = AppState {
        store: store.clone(),
        config: Arc::new(config),
        payments: payments.unwrap_or_else(|| gateway.clone() as Arc<dyn PaymentGateway>),
        images: Arc::new(images),
    };

    TestApp {
        app: create_app(state),
        store,
        gateway,
        upload_dir: temp_uploads.path().to_path_buf(),
        _temp_db: temp_db,
        _temp_uploads: temp_uploads,
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {})
}

/// Helper function to parse response body as JSON
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

impl TestApp {
    /// Sends a request with an optional bearer token and JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, response_json(response.into_body()).await)
    }

    /// Creates a user directly in the store and returns it with a token
    pub fn create_user(&self, name: &str, email: &str, role: Role) -> (UserRecord, String) {
        let user = accounts::register(
            &self.store,
            RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: "password123".to_string(),
                phone: None,
            },
            role,
        )
        .unwrap();
        let token = issue_token(&user, JWT_SECRET, 1).unwrap();
        (user, token)
    }

    pub fn customer(&self) -> (UserRecord, String) {
        self.create_user("Chikondi Phiri", "chikondi@example.com", Role::Customer)
    }

    pub fn admin(&self) -> (UserRecord, String) {
        self.create_user("Shop Admin", "admin@example.com", Role::Admin)
    }

    /// Creates a product through the API and returns its id
    pub async fn create_product(&self, admin_token: &str, name: &str, price: f64) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/products",
                Some(admin_token),
                Some(json!({
                    "name": name,
                    "description": format!("{} description", name),
                    "price": price,
                    "category": "Fragrance",
                    "stock": 10
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["product"]["_id"].as_str().unwrap().to_string()
    }

    /// Places an order for one product and returns the order JSON
    pub async fn place_order(&self, token: &str, product_id: &str, qty: u32, price: f64) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/orders",
                Some(token),
                Some(json!({
                    "orderItems": [{ "product": product_id, "qty": qty, "price": price }],
                    "totalAmount": f64::from(qty) * price,
                    "deliveryNotes": "Call on arrival"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["order"].clone()
    }
}
