use std::sync::Arc;

use crate::config::Config;
use crate::database::Store;
use crate::payment::PaymentGateway;
use crate::upload::ImageStore;

/// Application state shared across all request handlers
///
/// Built once in `main` (or by a test) and cloned into every handler. All
/// collaborators are injected here; nothing is reached through globals.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentGateway>,
    pub images: Arc<dyn ImageStore>,
}
