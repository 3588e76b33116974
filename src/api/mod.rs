// HTTP API server module
pub mod error;
pub mod handlers;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::account::AccountStore;
use crate::attachment::AttachmentStore;
use crate::auth::{require_bearer, TokenService};
use crate::config::AppConfig;
use crate::events::{EventPublisher, LifecycleNotifier};
use crate::service::{AccountService, AttachmentService, Deadline};

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub files: Arc<AttachmentService>,
    pub tokens: Arc<TokenService>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the services over the given stores and publisher
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        files: Arc<dyn AttachmentStore>,
        publisher: Arc<dyn EventPublisher>,
        config: &AppConfig,
    ) -> Self {
        let request_timeout = config.request_timeout();
        let tokens = Arc::new(TokenService::new(config.auth.clone()));
        let notifier = LifecycleNotifier::new(publisher, config.publish_timeout());

        Self {
            accounts: Arc::new(AccountService::new(
                accounts.clone(),
                tokens.clone(),
                notifier,
                request_timeout,
            )),
            files: Arc::new(AttachmentService::new(accounts, files, request_timeout)),
            tokens,
            request_timeout,
        }
    }

    /// Deadline for the request being handled
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}

/// Public routes under `/public/api`, bearer-gated ones under `/private/api`
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let public = Router::new()
        .route("/users", post(handlers::register).get(handlers::list_users))
        .route("/users/login", post(handlers::login))
        .route(
            "/files/:id",
            post(handlers::upload_file)
                .get(handlers::download_file)
                .delete(handlers::delete_file),
        )
        .route(
            "/files/user/:id",
            get(handlers::list_files).delete(handlers::delete_files),
        );

    let private = Router::new()
        .route("/users", put(handlers::update_user))
        .route("/users/:id", delete(handlers::delete_user))
        .route_layer(middleware::from_fn_with_state(state.tokens.clone(), require_bearer));

    Router::new()
        .nest("/public/api", public)
        .nest("/private/api", private)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct ApiServer {
    state: AppState,
    bind_addr: String,
    max_upload_bytes: usize,
}

impl ApiServer {
    pub fn new(state: AppState, config: &AppConfig) -> Self {
        Self {
            state,
            bind_addr: config.server.bind_address.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state, self.max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;

        info!("🌐 API server listening on {}", self.bind_addr);
        axum::serve(listener, app).await
    }
}
