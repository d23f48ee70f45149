use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use scheduling_cell::external::{HttpAppointmentLedger, HttpAuditLog, HttpDoctorDirectory};
use scheduling_cell::{AvailabilityStore, SchedulingState};
use shared_config::AppConfig;
use shared_database::HospitalApiClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hospital Ops API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Wire the scheduling engine to the hospital platform collaborators
    let api = Arc::new(HospitalApiClient::new(&config));
    let state = Arc::new(SchedulingState::new(
        Arc::new(AvailabilityStore::new()),
        Arc::new(HttpDoctorDirectory::new(Arc::clone(&api))),
        Arc::new(HttpAppointmentLedger::new(Arc::clone(&api))),
        Arc::new(HttpAuditLog::new(api)),
    ));

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    info!("Listening on {}", config.bind_address);

    let listener = TcpListener::bind(&config.bind_address).await.unwrap();
    axum::serve(listener, app)
        .await
        .unwrap();
}
