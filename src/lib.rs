//! Civic issue-reporting backend.
//!
//! Citizens register and file issues (photo, location, jurisdiction);
//! admins triage them through `pending → working → solved`; a 4-digit
//! emailed code proves control of an address for either role. Every
//! persistent operation is a key-addressed read or write against the
//! record store; email delivery and image hosting are opaque HTTP
//! collaborators behind the `Mailer` and `BinaryStore` seams.
//!
//! # Layout
//!
//! - [`auth`] — verification-code issuance and single-use validation
//! - [`issues`] — issue lifecycle and per-admin report counters
//! - [`citizens`] / [`admins`] — provisioning and lookup
//! - [`database`] — the `RecordStore` trait, Redis and in-memory backends
//! - [`routes`] — HTTP surface and the response envelope

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post, put},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod admins;
pub mod auth;
pub mod citizens;
pub mod config;
pub mod database;
pub mod error;
pub mod images;
pub mod issues;
pub mod mailer;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use routes::{
    create_admin_handler, create_citizen_handler, get_admin_handler, get_citizen_handler,
    get_issue_handler, health_handler, issues_by_citizen_handler, list_issues_handler,
    report_issue_handler, send_code_handler, send_issue_details_handler, update_status_handler,
    upload_image_handler, verify_code_handler,
};
use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/{role}/send-otp", post(send_code_handler))
        .route("/auth/{role}/verify-otp", post(verify_code_handler))
        .route("/auth/send-issue-details", post(send_issue_details_handler))
        .route("/issue/report", post(report_issue_handler))
        .route("/issue", get(list_issues_handler))
        .route("/issue/{id}", get(get_issue_handler))
        .route("/issue/citizen/{email}", get(issues_by_citizen_handler))
        .route("/admin/issue/{id}/status", put(update_status_handler))
        .route("/admin/new", post(create_admin_handler))
        .route("/admin/{email}", get(get_admin_handler))
        .route("/user/new", post(create_citizen_handler))
        .route("/user/{email}", get(get_citizen_handler))
        .route("/image/upload", post(upload_image_handler))
        // The 5 MB image cap is enforced in the handler; the body limit
        // just needs headroom for the multipart framing around it.
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
