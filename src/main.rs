//! MedBook Backend Server
//!
//! Appointment-booking backend: actix-web routes over a PostgreSQL record
//! store and a Redis state store that carries the booking locks, rate-limit
//! windows, and response cache.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use medbook_api::{configure_appointments, configure_doctors, Booking, Limiter};
use medbook_cache::RedisCache;
use medbook_core::AppConfig;
use medbook_db::{create_pool, PgAppointmentRepository, PgDoctorRepository, PgUserRepository};
use medbook_mailer::HttpMailer;
use medbook_services::{run_worker, NotificationDispatcher};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "medbook-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Health check
            .route("/health", web::get().to(health_check))
            // Appointment endpoints
            .configure(configure_appointments)
            // Doctor endpoints
            .configure(configure_doctors),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "medbook={},medbook_api={},medbook_services={},medbook_db={},actix_web=info,sqlx=warn",
            log_level, log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    init_tracing();

    info!("Starting MedBook Backend v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    info!("Connecting to Redis at {}...", config.redis.url);
    let store = Arc::new(
        RedisCache::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // Repositories
    let appointments = Arc::new(PgAppointmentRepository::new(pool.clone()));
    let doctors = Arc::new(PgDoctorRepository::new(pool.clone()));
    let users = web::Data::new(PgUserRepository::new(pool.clone()));

    // Notification queue and its worker
    let mailer = Arc::new(HttpMailer::new(config.mailer.clone()));
    let (dispatcher, rx) = NotificationDispatcher::new();
    tokio::spawn(run_worker(mailer, rx));

    // Booking core
    let booking = web::Data::new(Booking::new(
        appointments.clone(),
        doctors.clone(),
        store.clone(),
        dispatcher,
        config.booking.clone(),
    ));
    let limiter = web::Data::new(Limiter::new(store.clone()));

    let appointments_data = web::Data::from(appointments);
    let doctors_data = web::Data::from(doctors);
    let store_data = web::Data::new(store.as_ref().clone());
    let config_data = web::Data::new(config.clone());

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_origins.clone();

    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        // Configure CORS - clone cors_origins for each worker
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(booking.clone())
            .app_data(limiter.clone())
            .app_data(appointments_data.clone())
            .app_data(doctors_data.clone())
            .app_data(users.clone())
            .app_data(store_data.clone())
            .app_data(config_data.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message
                    })),
                )
                .into()
            }))
            // Middleware
            .wrap(cors)
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %Dms"))
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            // Configure routes
            .configure(configure_routes)
            // Root redirect to health
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
