//! Route definitions for the storefront API
//!
//! Authorization is declared per handler through the `AuthUser` / `AdminUser`
//! extractors rather than per router, so public and protected methods can
//! share a path.

use std::any::Any;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};
use tracing::error;

use crate::handler::{self, auth, orders, payments, products, reviews, upload};
use crate::state::AppState;
use crate::upload::UPLOADS_ROUTE;

/// Creates the application router with every route and the shared layers
///
/// # Route Definitions
///
/// - `/api/auth/*` - registration, login, profile, user listing (admin)
/// - `/api/products/*` - catalog; writes are admin only
/// - `/api/orders/*` - checkout, payment verification, delivery (admin)
/// - `/api/reviews/*` - reviews; listing all and deleting are admin only
/// - `/api/payments/webhook` - provider callback, signature checked
/// - `/api/upload` - product image upload (admin)
/// - `/uploads/*` - uploaded images
pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/profile", get(auth::profile))
        .route("/users", get(auth::list_users));

    let product_routes = Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        );

    let order_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/my-orders", get(orders::my_orders))
        .route("/{id}/verify", get(orders::verify_order))
        .route("/{id}/deliver", put(orders::mark_delivered));

    let review_routes = Router::new()
        .route("/", post(reviews::create_review))
        .route("/all", get(reviews::all_reviews))
        .route(
            "/{id}",
            get(reviews::product_reviews).delete(reviews::delete_review),
        );

    let api_routes = Router::new()
        .route("/health", get(handler::health))
        .nest("/auth", auth_routes)
        .nest("/products", product_routes)
        .nest("/orders", order_routes)
        .nest("/reviews", review_routes)
        .route("/payments/webhook", post(payments::payment_webhook))
        .route(
            "/upload",
            post(upload::upload_image)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        );

    let app = Router::new()
        .route("/", get(handler::root))
        .nest("/api", api_routes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&state.config.upload_dir))
        .fallback(handler::not_found)
        .layer(cors_layer(&state));

    catch_panics(app).with_state(state)
}

tokio::task_local! {
    static REQUEST_PATH: String;
}

/// Turns a panicking handler into a 500 envelope naming the request path
pub fn catch_panics<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(record_path))
}

/// Keeps the path in scope for [`panic_response`], which only sees the payload
async fn record_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    REQUEST_PATH.scope(path, next.run(request)).await
}

/// Allows the configured frontend plus local development servers
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = [
        state.config.frontend_url.as_str(),
        "http://localhost:5173",
        "http://localhost:5174",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    let path = REQUEST_PATH.try_with(String::clone).ok();
    error!(panic = detail, path = path.as_deref().unwrap_or("unknown"), "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Internal Server Error",
            "path": path,
            "errorType": "panic",
        })),
    )
        .into_response()
}
