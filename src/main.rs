//! Application entry point and server initialization
//!
//! This binary:
//! - Loads environment configuration
//! - Initializes the database and the managed attachment directory policy
//! - Starts the HTTP server with graceful shutdown support

use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use tidy_feedback::database::{init_db, AppState};
use tidy_feedback::middleware::CsrfToken;
use tidy_feedback::route::create_app;
use tidy_feedback::storage::{AttachmentStore, DEFAULT_MAX_ATTACHMENT_BYTES};

/// Application entry point
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "feedback.db")
/// - `UPLOAD_DIR` - Managed attachment directory
///   (default: "public/tidy_feedback/attachments")
/// - `MAX_ATTACHMENT_SIZE` - Upload size limit in bytes (default: 2 MiB)
/// - `AUTHORIZATION` - Admin bearer secret; admin routes are open when unset
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("tidy_feedback=debug,tower_http=debug")
        .init();

    let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let port: u16 = port_str.parse().unwrap_or(8080);

    let db_name = env::var("DATABASE_URL").unwrap_or_else(|_| "feedback.db".to_string());
    let upload_dir = env::var("UPLOAD_DIR")
        .unwrap_or_else(|_| "public/tidy_feedback/attachments".to_string());
    let max_attachment = env::var("MAX_ATTACHMENT_SIZE")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_MAX_ATTACHMENT_BYTES);

    let db = init_db(&db_name).expect("Failed to initialize database");

    let state = AppState {
        db: Arc::new(db),
        attachments: Arc::new(AttachmentStore::new(&upload_dir, max_attachment)),
        csrf: Arc::new(CsrfToken::generate()),
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.unwrap();

    println!("🚀 Feedback service running at http://localhost:{}", port);
    println!("📂 Using database: {}", db_name);
    println!("📎 Storing attachments under: {}", upload_dir);

    // The server runs until it receives SIGTERM or SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

/// Handles graceful shutdown signals
///
/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received. Letting
/// the server drain instead of killing the process keeps in-flight
/// submissions and their database writes intact.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    // On non-Unix systems (Windows), only handle Ctrl+C
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("\n🛑 Shutdown signal received, stopping server.");
}
