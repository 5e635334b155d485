//! Appointment handlers
//!
//! HTTP handlers for booking, listing, cancelling, and updating
//! appointments. Mutating routes go through the booking service so the
//! lock/validate/invalidate discipline holds on every path; the list route
//! is a read-through cache over the record store.

use crate::dto::{
    AppointmentResponse, CreateAppointmentRequest, MessageResponse, PaginationParams,
    StatsResponse, StatusResponse, UpdateStatusRequest,
};
use crate::handlers::{apply_quota_headers, Booking, Limiter};
use crate::identity::CallerIdentity;
use actix_web::{web, HttpRequest, HttpResponse};
use medbook_cache::{keys, read_through, RedisCache};
use medbook_core::{
    config::AppConfig,
    traits::{AppointmentRepository, PaginatedResponse, PaginationMeta},
    AppError,
};
use medbook_db::PgAppointmentRepository;
use medbook_services::booking::BookingRequest;
use medbook_services::{client_key, LENIENT, MODERATE};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Book a new appointment
///
/// POST /api/v1/appointments
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn create_appointment(
    req: HttpRequest,
    identity: CallerIdentity,
    body: web::Json<CreateAppointmentRequest>,
    booking: web::Data<Booking>,
    limiter: web::Data<Limiter>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let client = client_key(
        Some(&identity.client_id()),
        identity.origin.as_deref(),
        &MODERATE,
    );
    let decision = limiter.admit(req.path(), &client, &MODERATE).await;
    if !decision.allowed {
        return Err(decision.into_error(&MODERATE));
    }

    let request = BookingRequest {
        user: identity.user,
        doctor_id: body.doctor_id,
        date: body.parse_date()?,
        time: body.time.clone(),
        reason: body.reason.clone(),
        duration_minutes: body.duration,
    };

    let detail = booking.attempt_booking(request).await?;

    let mut builder = HttpResponse::Created();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(AppointmentResponse::from(detail)))
}

/// List the caller's appointments
///
/// GET /api/v1/appointments
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn list_appointments(
    req: HttpRequest,
    identity: CallerIdentity,
    store: web::Data<RedisCache>,
    appointments: web::Data<PgAppointmentRepository>,
    limiter: web::Data<Limiter>,
) -> Result<HttpResponse, AppError> {
    let client = client_key(
        Some(&identity.client_id()),
        identity.origin.as_deref(),
        &LENIENT,
    );
    let decision = limiter.admit(req.path(), &client, &LENIENT).await;
    if !decision.allowed {
        return Err(decision.into_error(&LENIENT));
    }

    let user_id = identity.user.id;
    let cache_key = keys::user_appointments_key(user_id);

    let items: Vec<AppointmentResponse> = read_through(
        store.get_ref(),
        &cache_key,
        keys::USER_APPOINTMENTS_TTL_SECS,
        || async {
            debug!("Fetching appointments for user {}", user_id);
            let details = appointments.list_by_user(user_id).await?;
            Ok(details
                .into_iter()
                .map(AppointmentResponse::from)
                .collect())
        },
    )
    .await?;

    let mut builder = HttpResponse::Ok();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(items))
}

/// Cancel an appointment (hard delete)
///
/// DELETE /api/v1/appointments/{id}
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn cancel_appointment(
    identity: CallerIdentity,
    path: web::Path<Uuid>,
    booking: web::Data<Booking>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let appointment_id = path.into_inner();
    let is_admin = identity.is_admin(&config);

    booking
        .cancel_appointment(&identity.user, appointment_id, is_admin)
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::success(
        "Appointment cancelled successfully",
    )))
}

/// Update an appointment's status
///
/// PATCH /api/v1/appointments/{id}/status
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn update_appointment_status(
    identity: CallerIdentity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
    booking: web::Data<Booking>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let appointment_id = path.into_inner();
    let is_admin = identity.is_admin(&config);

    let updated = booking
        .update_status(&identity.user, appointment_id, body.status, is_admin)
        .await?;

    info!("Appointment {} updated to {}", updated.id, updated.status);

    Ok(HttpResponse::Ok().json(StatusResponse {
        id: updated.id,
        status: updated.status,
        updated_at: updated.updated_at,
    }))
}

/// Aggregate appointment counts (admin only)
///
/// GET /api/v1/appointments/stats
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn appointment_stats(
    identity: CallerIdentity,
    appointments: web::Data<PgAppointmentRepository>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if !identity.is_admin(&config) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let confirmed = appointments
        .count_by_status(medbook_core::models::AppointmentStatus::Confirmed)
        .await?;
    let completed = appointments
        .count_by_status(medbook_core::models::AppointmentStatus::Completed)
        .await?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        total: confirmed + completed,
        confirmed,
        completed,
    }))
}

/// List all appointments with pagination (admin only)
///
/// GET /api/v1/appointments/all
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn list_all_appointments(
    identity: CallerIdentity,
    query: web::Query<PaginationParams>,
    appointments: web::Data<PgAppointmentRepository>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if !identity.is_admin(&config) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    query.validate()?;

    let (details, total) = appointments
        .list_all(query.limit(), query.offset())
        .await?;

    let data: Vec<AppointmentResponse> =
        details.into_iter().map(AppointmentResponse::from).collect();

    Ok(HttpResponse::Ok().json(PaginatedResponse {
        data,
        pagination: PaginationMeta::new(total, query.page, query.per_page),
    }))
}

/// Configure appointment routes
pub fn configure_appointments(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/appointments")
            .route("", web::post().to(create_appointment))
            .route("", web::get().to(list_appointments))
            .route("/all", web::get().to(list_all_appointments))
            .route("/stats", web::get().to(appointment_stats))
            .route("/{id}", web::delete().to(cancel_appointment))
            .route("/{id}/status", web::patch().to(update_appointment_status)),
    );
}
