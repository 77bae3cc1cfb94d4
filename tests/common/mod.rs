use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use stockledger_api::{
    auth::{AuthConfig, AuthService, Claims},
    config::AppConfig,
    db,
    entities::{category, product, vendor},
    events::{self, EventSender},
    handlers::AppServices,
    services::products::CreateProduct,
    services::vendors::CreateVendor,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_definitely_long_enough_0123456789abcdef";

/// Helper harness for spinning up an application state backed by a
/// tempfile SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _db_file: tempfile::NamedTempFile,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("failed to create temp db file");
        let db_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

        let mut cfg = AppConfig::new(
            db_url,
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 5;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            cfg.dashboard_cache_ttl_secs,
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
        )));

        let token = Self::make_token(
            &cfg,
            vec!["admin".to_string()],
            vec![
                "products:read".to_string(),
                "stock:read".to_string(),
                "stock:adjust".to_string(),
                "purchase-orders:read".to_string(),
                "purchase-orders:manage".to_string(),
                "invoices:read".to_string(),
                "invoices:manage".to_string(),
                "dashboard:read".to_string(),
            ],
        );

        let router = Router::new()
            .nest("/api/v1", stockledger_api::api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(axum::middleware::from_fn(
                stockledger_api::tracing::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            token,
            _db_file: db_file,
            _event_task: event_task,
        }
    }

    /// Encodes a token the way the external auth issuer would.
    pub fn make_token(cfg: &AppConfig, roles: Vec<String>, permissions: Vec<String>) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
            roles,
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            nbf: now.timestamp(),
            iss: cfg.auth_issuer.clone(),
            aud: cfg.auth_audience.clone(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .expect("encode access token")
    }

    /// Access the bearer token for the default admin user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// A token without the admin role, carrying only the given permissions.
    #[allow(dead_code)]
    pub fn staff_token(&self, permissions: &[&str]) -> String {
        Self::make_token(
            &self.state.config,
            vec!["clerk".to_string()],
            permissions.iter().map(|p| p.to_string()).collect(),
        )
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Seed a product directly through the registry service.
    pub async fn seed_product(
        &self,
        sku: &str,
        purchase_price: Decimal,
        selling_price: Decimal,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> product::Model {
        self.state
            .services
            .products
            .create(CreateProduct {
                sku: sku.to_string(),
                name: format!("Test Product {}", sku),
                category_id: None,
                purchase_price,
                selling_price,
                quantity,
                unit: "pcs".to_string(),
                low_stock_threshold,
            })
            .await
            .expect("seed product for tests")
    }

    /// Seed a vendor directly through the vendor service.
    #[allow(dead_code)]
    pub async fn seed_vendor(&self, name: &str) -> vendor::Model {
        self.state
            .services
            .vendors
            .create(CreateVendor {
                name: name.to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .expect("seed vendor for tests")
    }

    /// Seed a category directly through the category service.
    #[allow(dead_code)]
    pub async fn seed_category(&self, name: &str) -> category::Model {
        self.state
            .services
            .categories
            .create(stockledger_api::services::categories::CreateCategory {
                name: name.to_string(),
                description: None,
            })
            .await
            .expect("seed category for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a JSON body from a response.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid JSON")
}
