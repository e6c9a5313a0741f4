//! Academic Incentive API Gateway
//!
//! The entry point for faculty submissions and admin exports.
//! Handles:
//! - Registration, login and bearer-token authentication
//! - Book, project and journal submissions with PDF uploads
//! - Export downloads for admins
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod upload;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use incentive_common::{
    auth::JwtManager,
    config::AppConfig,
    metrics::{self, EXPORT_BUCKETS, LATENCY_BUCKETS, METRICS_PREFIX},
    records::{BookFields, JournalFields, ProjectFields},
    ExportManager, RecordStore, UserStore,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handlers::records;
use upload::{UploadSettings, PUBLIC_PREFIX};

/// Multipart framing and text fields on top of the file parts
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<RecordStore>,
    pub users: Arc<UserStore>,
    pub exports: Arc<ExportManager>,
    pub jwt: Arc<JwtManager>,
    pub uploads: Arc<UploadSettings>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
            warn!("No JWT secret configured; tokens will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        });
        let jwt = JwtManager::new(&secret, config.auth.jwt_expiration_secs);

        let exports = ExportManager::new(config.storage.export_dir.clone(), &config.export);
        let uploads = UploadSettings {
            root: config.storage.uploads_dir.clone(),
            max_bytes: config.storage.max_upload_bytes,
        };

        Self {
            config: Arc::new(config),
            store: Arc::new(RecordStore::new()),
            users: Arc::new(UserStore::new()),
            exports: Arc::new(exports),
            jwt: Arc::new(jwt),
            uploads: Arc::new(uploads),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        service = %config.observability.service_name,
        "Starting Academic Incentive API Gateway v{}",
        incentive_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Full(format!("{METRICS_PREFIX}_request_duration_seconds")),
                LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(format!("{METRICS_PREFIX}_export_duration_seconds")),
                EXPORT_BUCKETS,
            )?
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let state = AppState::new(config);

    if let Err(e) = state.exports.initialize().await {
        tracing::error!(error = %e, "Failed to initialize export files");
    }
    for kind in incentive_common::RecordKind::ALL {
        let dir = state.uploads.root.join(kind.slug());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
    }

    let addr = state.config.bind_addr();
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = &state.config;

    // CORS configuration
    let allow_origin = match config
        .server
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            warn!("Ignoring invalid CORS origin; allowing any");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = config.storage.max_upload_bytes * 2 + FORM_OVERHEAD_BYTES;
    let request_timeout = config.request_timeout();
    let uploads = ServeDir::new(&state.uploads.root);

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/books", records::routes::<BookFields>())
        .nest("/projects", records::routes::<ProjectFields>())
        .nest("/journals", records::routes::<JournalFields>())
        .route("/excel/{kind}", get(handlers::excel::download))
        .route("/excel/{kind}/current", get(handlers::excel::current));

    Router::new()
        .route("/", get(handlers::health::banner))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "incentive-test-boundary";

    struct TestApp {
        router: Router,
        state: AppState,
        dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = AppConfig::default();
            config.storage.export_dir = dir.path().join("excel_data");
            config.storage.uploads_dir = dir.path().join("uploads");
            config.auth.jwt_secret = Some("test-secret".to_string());

            let state = AppState::new(config);
            Self {
                router: create_router(state.clone()),
                state,
                dir,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn register(&self, email: &str, role: &str) -> String {
            let response = self
                .send(json_request(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    json!({
                        "name": "Dr. Test",
                        "email": email,
                        "password": "secret123",
                        "employeeId": "EMP001",
                        "department": "CSE",
                        "role": role,
                    }),
                ))
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            body_json(response).await["token"]
                .as_str()
                .unwrap()
                .to_string()
        }

        async fn create_book(&self, token: &str, title: &str) -> Response {
            let body = multipart_body(
                &[
                    ("title", title),
                    ("publisher", "Springer"),
                    ("type", "Book"),
                    ("publicationDate", "2024-01-15"),
                    ("totalAuthors", "2"),
                    ("srmistAuthors", "1"),
                    ("isbn", "978-3-16-148410-0"),
                ],
                &[("proofFile", "application/pdf")],
            );
            self.send(multipart_request(Method::POST, "/api/books", token, body))
                .await
        }
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(method: Method, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, content_type) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"proof.pdf\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"%PDF-1.4 test document");
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_banner() {
        let app = TestApp::new();
        let response = app
            .send(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Academic Incentive System API is running");
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let app = TestApp::new();
        app.register("faculty@example.edu", "faculty").await;

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "faculty@example.edu", "password": "secret123" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user"]["employeeId"], "EMP001");
        assert!(body["user"].get("passwordHash").is_none());

        let token = body["token"].as_str().unwrap();
        let response = app.send(get_request("/api/auth/me", token)).await;
        assert_eq!(body_json(response).await["data"]["email"], "faculty@example.edu");

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "faculty@example.edu", "password": "wrong-pass" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = TestApp::new();
        app.register("dup@example.edu", "faculty").await;

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "name": "Other",
                    "email": "dup@example.edu",
                    "password": "secret123",
                    "employeeId": "EMP002",
                    "department": "ECE",
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_requests_without_token_are_rejected() {
        let app = TestApp::new();
        let response = app
            .send(Request::builder().uri("/api/books").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_book_stores_upload_and_exports() {
        let app = TestApp::new();
        let token = app.register("author@example.edu", "faculty").await;

        let response = app.create_book(&token, "Rust in Practice").await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["type"], "Book");

        let proof = body["data"]["proofFilePath"].as_str().unwrap();
        assert!(proof.starts_with("/uploads/books/"));
        assert!(app.state.uploads.disk_path(proof).unwrap().exists());

        let csv = std::fs::read_to_string(app.state.exports.csv_path(incentive_common::RecordKind::Book))
            .unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Rust in Practice"));

        let response = app.send(get_request("/api/books", &token)).await;
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_create_without_proof_is_rejected() {
        let app = TestApp::new();
        let token = app.register("noproof@example.edu", "faculty").await;

        let body = multipart_body(&[("title", "No Proof"), ("publisher", "ACM")], &[]);
        let response = app
            .send(multipart_request(Method::POST, "/api/books", &token, body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected_and_cleaned_up() {
        let app = TestApp::new();
        let token = app.register("png@example.edu", "faculty").await;

        let body = multipart_body(&[("title", "Wrong File")], &[("proofFile", "image/png")]);
        let response = app
            .send(multipart_request(Method::POST, "/api/books", &token, body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let books_dir = app.dir.path().join("uploads").join("books");
        let stored = std::fs::read_dir(&books_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn test_file_in_undeclared_field_is_rejected() {
        let app = TestApp::new();
        let token = app.register("extra@example.edu", "faculty").await;

        let body = multipart_body(
            &[
                ("title", "Extra File"),
                ("publisher", "Springer"),
                ("type", "Book"),
                ("publicationDate", "2024-01-15"),
                ("totalAuthors", "1"),
                ("isbn", "978-0-00-000000-0"),
            ],
            &[
                ("proofFile", "application/pdf"),
                ("sanctionOrder", "application/pdf"),
            ],
        );
        let response = app
            .send(multipart_request(Method::POST, "/api/books", &token, body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Unexpected file field: sanctionOrder");
        assert_eq!(body["error"]["field"], "sanctionOrder");

        let books_dir = app.dir.path().join("uploads").join("books");
        let stored = std::fs::read_dir(&books_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(stored, 0);
        assert_eq!(app.state.store.books.len().await, 0);
    }

    #[tokio::test]
    async fn test_other_faculty_cannot_touch_record() {
        let app = TestApp::new();
        let owner = app.register("owner@example.edu", "faculty").await;
        let other = app.register("other@example.edu", "faculty").await;
        let admin = app.register("admin@example.edu", "admin").await;

        assert_eq!(app.create_book(&owner, "Mine").await.status(), StatusCode::CREATED);

        let response = app.send(get_request("/api/books/1", &other)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Not authorized to access this book"
        );

        let response = app.send(get_request("/api/books", &other)).await;
        assert_eq!(body_json(response).await["count"], 0);

        let response = app.send(get_request("/api/books/1", &admin)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(get_request("/api/books/99", &owner)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_delete_removes_files() {
        let app = TestApp::new();
        let token = app.register("editor@example.edu", "faculty").await;

        let body = body_json(app.create_book(&token, "First Title").await).await;
        let proof = body["data"]["proofFilePath"].as_str().unwrap().to_string();

        let update = multipart_body(&[("title", "Second Title")], &[]);
        let response = app
            .send(multipart_request(Method::PUT, "/api/books/1", &token, update))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["title"], "Second Title");
        assert_eq!(body["data"]["proofFilePath"], proof.as_str());

        let rows = app
            .state
            .exports
            .current_rows(incentive_common::RecordKind::Book)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Title"], "Second Title");

        let response = app
            .send(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/books/1")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], json!({}));
        assert!(!app.state.uploads.disk_path(&proof).unwrap().exists());
    }

    #[tokio::test]
    async fn test_excel_download_is_admin_only() {
        let app = TestApp::new();
        let faculty = app.register("f@example.edu", "faculty").await;
        let admin = app.register("a@example.edu", "admin").await;

        let response = app.send(get_request("/api/excel/books", &faculty)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.send(get_request("/api/excel/books", &admin)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.send(get_request("/api/excel/theses", &admin)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Invalid Excel file type"
        );

        assert_eq!(app.create_book(&faculty, "Exported").await.status(), StatusCode::CREATED);

        let response = app.send(get_request("/api/excel/books", &admin)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            handlers::excel::XLSX_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=books.xlsx"
        );

        let response = app.send(get_request("/api/excel/books/current", &admin)).await;
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["Title"], "Exported");
    }

    #[tokio::test]
    async fn test_ready_reports_directories() {
        let app = TestApp::new();
        let response = app
            .send(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await;
        assert_eq!(body_json(response).await["status"], "not_ready");

        tokio_test::assert_ok!(app.state.exports.initialize().await);
        std::fs::create_dir_all(&app.state.uploads.root).unwrap();

        let response = app
            .send(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await;
        assert_eq!(body_json(response).await["status"], "ready");
    }
}
