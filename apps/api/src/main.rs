use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{
    AppointmentLifecycleService, AppointmentStore, MemoryAppointmentStore, StoreFailureSink,
};
use inquiry_cell::InquiryService;
use notification_cell::{
    HttpSendChannel, LogSendChannel, NotificationDispatcher, RetryPolicy, SendChannel,
};
use patient_cell::PatientRegistry;
use payment_cell::PaymentLedgerService;
use realtime_cell::RealtimeBroadcaster;
use scheduling_cell::{CalendarPolicy, Clock, SystemClock};
use shared_config::AppConfig;

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

    info!("Starting clinic API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Wire the cells together
    let broadcaster = Arc::new(RealtimeBroadcaster::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.clinic_utc_offset_minutes));
    let registry = Arc::new(PatientRegistry::new(broadcaster.clone()));
    let ledger = Arc::new(PaymentLedgerService::new(broadcaster.clone(), clock.clone()));
    let inquiries = Arc::new(InquiryService::new(broadcaster.clone()));
    let store: Arc<dyn AppointmentStore> = Arc::new(MemoryAppointmentStore::new());

    let channel: Arc<dyn SendChannel> = if config.is_messaging_configured() {
        Arc::new(HttpSendChannel::new(
            config.message_gateway_url.clone(),
            config.message_gateway_token.clone(),
        ))
    } else {
        Arc::new(LogSendChannel)
    };
    let dispatcher = NotificationDispatcher::start(
        channel,
        Arc::new(StoreFailureSink::new(store.clone(), broadcaster.clone())),
        RetryPolicy {
            max_attempts: config.notify_max_attempts,
            base_delay: Duration::from_millis(config.notify_base_delay_ms),
        },
        config.clinic_name.clone(),
        config.clinic_phone.clone(),
    );

    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        store,
        registry.clone(),
        ledger.clone(),
        dispatcher,
        broadcaster.clone(),
        clock,
        CalendarPolicy::default(),
    ));

    let listen_port = config.listen_port;

    // Build the application router
    let app = router::create_router(router::AppState {
        lifecycle,
        registry,
        ledger,
        inquiries,
        broadcaster,
    })
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], listen_port));
    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
