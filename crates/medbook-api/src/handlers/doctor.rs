//! Doctor handlers
//!
//! The doctor directory is public and read-through cached; create and
//! update are admin-only, strictly rate limited, and invalidate the
//! directory cache before responding.

use crate::dto::{AvailabilityResponse, CreateDoctorRequest, DoctorResponse, UpdateDoctorRequest};
use crate::handlers::{apply_quota_headers, Limiter};
use crate::identity::{CallerIdentity, RequestOrigin};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use medbook_cache::{invalidate, keys, read_through, RedisCache};
use medbook_core::{
    config::AppConfig,
    models::Doctor,
    traits::{AppointmentRepository, DoctorRepository},
    AppError,
};
use medbook_db::{PgAppointmentRepository, PgDoctorRepository};
use medbook_services::{client_key, PER_ORIGIN, STRICT};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// List all doctors with appointment counts
///
/// GET /api/v1/doctors
#[instrument(skip_all)]
pub async fn list_doctors(
    req: HttpRequest,
    origin: RequestOrigin,
    store: web::Data<RedisCache>,
    doctors: web::Data<PgDoctorRepository>,
    limiter: web::Data<Limiter>,
) -> Result<HttpResponse, AppError> {
    // Pre-authentication route: keyed by network origin, not identity
    let client = client_key(None, origin.0.as_deref(), &PER_ORIGIN);
    let decision = limiter.admit(req.path(), &client, &PER_ORIGIN).await;
    if !decision.allowed {
        return Err(decision.into_error(&PER_ORIGIN));
    }

    let items: Vec<DoctorResponse> = read_through(
        store.get_ref(),
        keys::DOCTORS_LIST_KEY,
        keys::DOCTORS_LIST_TTL_SECS,
        || async {
            let listed = doctors.list_with_counts().await?;
            Ok(listed.into_iter().map(DoctorResponse::from).collect())
        },
    )
    .await?;

    let mut builder = HttpResponse::Ok();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(items))
}

/// Create a doctor (admin only)
///
/// POST /api/v1/doctors
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn create_doctor(
    req: HttpRequest,
    identity: CallerIdentity,
    body: web::Json<CreateDoctorRequest>,
    store: web::Data<RedisCache>,
    doctors: web::Data<PgDoctorRepository>,
    limiter: web::Data<Limiter>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if !identity.is_admin(&config) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    body.validate()?;

    let client = client_key(
        Some(&identity.client_id()),
        identity.origin.as_deref(),
        &STRICT,
    );
    let decision = limiter.admit(req.path(), &client, &STRICT).await;
    if !decision.allowed {
        return Err(decision.into_error(&STRICT));
    }

    let body = body.into_inner();
    let doctor = Doctor::new(
        body.name,
        body.email,
        body.phone,
        body.speciality,
        body.bio,
        body.gender,
        body.is_active.unwrap_or(true),
    );

    let created = doctors.create(&doctor).await?;

    // The directory cache is stale the instant the row lands
    invalidate(store.get_ref(), keys::DOCTORS_LIST_KEY).await;

    info!("Doctor {} created", created.id);

    let mut builder = HttpResponse::Created();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(DoctorResponse::from((created, 0))))
}

/// Update a doctor (admin only)
///
/// PUT /api/v1/doctors/{id}
#[instrument(skip_all, fields(user_id = %identity.user.id))]
pub async fn update_doctor(
    req: HttpRequest,
    identity: CallerIdentity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateDoctorRequest>,
    store: web::Data<RedisCache>,
    doctors: web::Data<PgDoctorRepository>,
    limiter: web::Data<Limiter>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if !identity.is_admin(&config) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    body.validate()?;

    let client = client_key(
        Some(&identity.client_id()),
        identity.origin.as_deref(),
        &STRICT,
    );
    let decision = limiter.admit(req.path(), &client, &STRICT).await;
    if !decision.allowed {
        return Err(decision.into_error(&STRICT));
    }

    let doctor_id = path.into_inner();
    let mut doctor = doctors
        .find_by_id(doctor_id)
        .await?
        .ok_or_else(|| AppError::DoctorNotFound(doctor_id.to_string()))?;

    let body = body.into_inner();
    let appearance_changed = body.name.is_some() || body.gender.is_some();

    if let Some(name) = body.name {
        doctor.name = name;
    }
    if let Some(email) = body.email {
        doctor.email = email;
    }
    if let Some(phone) = body.phone {
        doctor.phone = phone;
    }
    if let Some(speciality) = body.speciality {
        doctor.speciality = speciality;
    }
    if let Some(bio) = body.bio {
        doctor.bio = Some(bio);
    }
    if let Some(gender) = body.gender {
        doctor.gender = gender;
    }
    if let Some(is_active) = body.is_active {
        doctor.is_active = is_active;
    }
    if appearance_changed {
        doctor.image_url = Doctor::generate_image_url(&doctor.name, doctor.gender);
    }

    let updated = doctors.update(&doctor).await?;

    invalidate(store.get_ref(), keys::DOCTORS_LIST_KEY).await;

    info!("Doctor {} updated", updated.id);

    let mut builder = HttpResponse::Ok();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(DoctorResponse::from((updated, 0))))
}

/// Query parameters for the availability route
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Date in YYYY-MM-DD format
    pub date: String,
}

/// Booked slots for a doctor on one date
///
/// GET /api/v1/doctors/{id}/availability?date=YYYY-MM-DD
#[instrument(skip_all)]
pub async fn doctor_availability(
    req: HttpRequest,
    origin: RequestOrigin,
    path: web::Path<Uuid>,
    query: web::Query<AvailabilityQuery>,
    doctors: web::Data<PgDoctorRepository>,
    appointments: web::Data<PgAppointmentRepository>,
    limiter: web::Data<Limiter>,
) -> Result<HttpResponse, AppError> {
    let client = client_key(None, origin.0.as_deref(), &PER_ORIGIN);
    let decision = limiter.admit(req.path(), &client, &PER_ORIGIN).await;
    if !decision.allowed {
        return Err(decision.into_error(&PER_ORIGIN));
    }

    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput("Date must be in YYYY-MM-DD format".to_string()))?;

    let doctor_id = path.into_inner();
    doctors
        .find_by_id(doctor_id)
        .await?
        .ok_or_else(|| AppError::DoctorNotFound(doctor_id.to_string()))?;

    let booked_slots = appointments.booked_slots(doctor_id, date).await?;

    let mut builder = HttpResponse::Ok();
    apply_quota_headers(&mut builder, &decision);
    Ok(builder.json(AvailabilityResponse {
        doctor_id,
        date: query.date.clone(),
        booked_slots,
    }))
}

/// Configure doctor routes
pub fn configure_doctors(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/doctors")
            .route("", web::get().to(list_doctors))
            .route("", web::post().to(create_doctor))
            .route("/{id}", web::put().to(update_doctor))
            .route("/{id}/availability", web::get().to(doctor_availability)),
    );
}
