use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unionhall_backend::handlers::{arrears, attendance, forecast, stipends};
use unionhall_backend::jobs;
use unionhall_backend::services::notifications::NotificationQueueService;
use unionhall_backend::services::payments::PaymentProcessorService;
use unionhall_backend::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,unionhall_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    let db = std::sync::Arc::new(db);

    let notification_queue_url =
        env::var("NOTIFICATION_QUEUE_URL").unwrap_or_else(|_| "http://localhost:4100".to_string());
    let payment_processor_url =
        env::var("PAYMENT_PROCESSOR_URL").unwrap_or_else(|_| "http://localhost:4200".to_string());

    let notifications = NotificationQueueService::new(notification_queue_url);
    let payments = PaymentProcessorService::new(payment_processor_url);

    // Start scheduled jobs
    jobs::arrears_detection_sync::start_arrears_detection_job(db.clone()).await;
    jobs::forecast_alerts_sync::start_forecast_alerts_job(db.clone(), notifications.clone()).await;
    jobs::weekly_report_sync::start_weekly_report_job(db.clone(), notifications.clone()).await;

    let state = AppState {
        db,
        notifications,
        payments,
    };

    // Build router
    let app = Router::new()
        .route("/", get(health))
        // Attendance
        .route(
            "/api/orgs/{org_id}/attendance/check-in",
            post(attendance::check_in),
        )
        .route(
            "/api/orgs/{org_id}/attendance/check-out/{attendance_id}",
            post(attendance::check_out),
        )
        .route(
            "/api/orgs/{org_id}/attendance/override",
            post(attendance::coordinator_override),
        )
        .route(
            "/api/orgs/{org_id}/attendance/token",
            post(attendance::generate_token),
        )
        .route(
            "/api/orgs/{org_id}/attendance/token/validate",
            post(attendance::validate_token),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/attendance/active",
            get(attendance::get_active),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/attendance/history",
            get(attendance::get_history),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/attendance/summary",
            get(attendance::get_summary),
        )
        .route("/api/geo/distance", post(attendance::calculate_distance))
        // Stipends
        .route("/api/orgs/{org_id}/stipends", post(stipends::create_disbursement))
        .route(
            "/api/orgs/{org_id}/stipends/{disbursement_id}/approve",
            post(stipends::approve),
        )
        .route(
            "/api/orgs/{org_id}/stipends/{disbursement_id}/pay",
            post(stipends::mark_paid),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/stipends/eligibility",
            get(stipends::calculate_eligibility),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/stipends/batch",
            post(stipends::batch_create),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/stipends/pending",
            get(stipends::get_pending),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/stipends/summary",
            get(stipends::get_fund_summary),
        )
        .route(
            "/api/orgs/{org_id}/members/{member_id}/stipends",
            get(stipends::get_member_history),
        )
        // Arrears
        .route("/api/orgs/{org_id}/arrears/detect", post(arrears::detect))
        .route("/api/orgs/{org_id}/arrears/run", post(arrears::run_detection))
        .route(
            "/api/orgs/{org_id}/arrears/cases",
            get(arrears::list_cases).post(arrears::create_case),
        )
        .route(
            "/api/orgs/{org_id}/arrears/cases/{case_id}",
            get(arrears::get_case),
        )
        .route(
            "/api/orgs/{org_id}/arrears/cases/{case_id}/status",
            put(arrears::update_status),
        )
        .route(
            "/api/orgs/{org_id}/arrears/cases/{case_id}/payment-plan",
            post(arrears::create_payment_plan),
        )
        .route(
            "/api/orgs/{org_id}/arrears/cases/{case_id}/contacts",
            post(arrears::log_contact),
        )
        .route(
            "/api/orgs/{org_id}/arrears/cases/{case_id}/payments",
            post(arrears::record_payment),
        )
        // Forecasting
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/forecast",
            get(forecast::get_forecast),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/forecast/history",
            get(forecast::get_history),
        )
        .route(
            "/api/orgs/{org_id}/funds/{fund_id}/forecast/seasonal",
            get(forecast::get_seasonal),
        )
        .route(
            "/api/orgs/{org_id}/forecast/alerts/run",
            post(forecast::run_alerts),
        )
        .route(
            "/api/orgs/{org_id}/forecast/weekly-report/run",
            post(forecast::run_weekly_report),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.expect("Server error");
}

async fn health() -> &'static str {
    "UnionHall strike fund engine is up"
}
