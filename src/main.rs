use lead_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    enquiry::EnquirySubmitter,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, wires the enquiry sinks and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production settings)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lead_portal=debug,tower_http=info".into());

    // 3. Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Enquiry sinks: first-party API and third-party relay over one HTTP client.
    let submitter =
        EnquirySubmitter::from_config(&config).expect("FATAL: failed to build the HTTP client");

    tracing::info!(
        api = %config.api_base_url,
        relay = %config.relay_url,
        mode = ?submitter.dispatch_mode(),
        policy = ?submitter.policy(),
        "enquiry sinks configured"
    );

    // 5. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { submitter, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated");
}
