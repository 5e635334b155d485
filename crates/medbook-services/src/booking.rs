//! Booking orchestration
//!
//! Drives one booking attempt through its strictly sequenced phases:
//! lock acquisition, doctor validation, the parallel conflict checks, the
//! create call, cache invalidation, notification dispatch, and lock release.
//! Each record-store phase carries its own deadline, so worst-case latency
//! is the sum of three bounded phases.
//!
//! The lock is released on every exit path, success or failure; its TTL is
//! the backstop if the release itself fails.

use crate::booking_lock::BookingLock;
use crate::conflicts::ConflictDetector;
use crate::notify::{AppointmentNotice, BookingEvent, NotificationDispatcher};
use crate::DEFAULT_REASON;
use chrono::NaiveDate;
use medbook_cache::{invalidate, keys};
use medbook_core::{
    config::BookingConfig,
    models::{Appointment, AppointmentDetail, AppointmentStatus, User},
    traits::{AppointmentRepository, DoctorRepository, StateStore},
    AppError, AppResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// A validated booking candidate
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// The authenticated caller
    pub user: User,

    /// Requested doctor
    pub doctor_id: Uuid,

    /// Requested date
    pub date: NaiveDate,

    /// Requested time in HH:MM format
    pub time: String,

    /// Reason for the visit
    pub reason: Option<String>,

    /// Duration in minutes
    pub duration_minutes: Option<i32>,
}

/// Booking service over the record store and the shared state store
pub struct BookingService<A, D, S> {
    appointments: Arc<A>,
    doctors: Arc<D>,
    store: Arc<S>,
    lock: BookingLock<S>,
    conflicts: ConflictDetector<A>,
    notifications: NotificationDispatcher,
    config: BookingConfig,
}

impl<A, D, S> BookingService<A, D, S>
where
    A: AppointmentRepository,
    D: DoctorRepository,
    S: StateStore,
{
    /// Create a new booking service
    pub fn new(
        appointments: Arc<A>,
        doctors: Arc<D>,
        store: Arc<S>,
        notifications: NotificationDispatcher,
        config: BookingConfig,
    ) -> Self {
        let lock = BookingLock::with_ttl(store.clone(), config.lock_ttl_secs);
        let conflicts = ConflictDetector::with_deadline(
            appointments.clone(),
            Duration::from_secs(config.conflict_timeout_secs),
        );

        Self {
            appointments,
            doctors,
            store,
            lock,
            conflicts,
            notifications,
            config,
        }
    }

    /// Attempt to book an appointment
    ///
    /// # Errors
    ///
    /// - `AppError::BookingInProgress` — another request from this caller for
    ///   the same slot is in flight
    /// - `AppError::DoctorNotFound` / `AppError::DoctorInactive`
    /// - `AppError::SlotTaken` / `AppError::DuplicateBooking` /
    ///   `AppError::ScheduleConflict` — durable-state validation failed
    /// - `AppError::Timeout` — a bounded phase exceeded its deadline
    /// - `AppError::StoreUnavailable` — state store unreachable during lock
    ///   acquisition
    #[instrument(skip(self, request), fields(user_id = %request.user.id, doctor_id = %request.doctor_id))]
    pub async fn attempt_booking(&self, request: BookingRequest) -> AppResult<AppointmentDetail> {
        info!(
            "Creating appointment for user {} with doctor {} at {} {}",
            request.user.id, request.doctor_id, request.date, request.time
        );

        let lock_key = self
            .lock
            .acquire(request.user.id, request.date, &request.time)
            .await?;

        let result = self.validate_and_create(&request).await;

        // Unconditional cleanup on success and failure alike
        self.lock.release(&lock_key).await;

        result
    }

    async fn validate_and_create(&self, request: &BookingRequest) -> AppResult<AppointmentDetail> {
        let doctor = tokio::time::timeout(
            Duration::from_secs(self.config.lookup_timeout_secs),
            self.doctors.find_by_id(request.doctor_id),
        )
        .await
        .map_err(|_| AppError::Timeout {
            phase: "doctor lookup",
        })??
        .ok_or_else(|| AppError::DoctorNotFound(request.doctor_id.to_string()))?;

        if !doctor.is_active {
            return Err(AppError::DoctorInactive(doctor.id.to_string()));
        }

        self.conflicts
            .check(request.user.id, request.doctor_id, request.date, &request.time)
            .await?;

        let reason = request
            .reason
            .clone()
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        let appointment = Appointment::new(
            request.user.id,
            request.doctor_id,
            request.date,
            request.time.clone(),
            request
                .duration_minutes
                .unwrap_or(self.config.default_duration_minutes),
            Some(reason.clone()),
        );

        let created = tokio::time::timeout(
            Duration::from_secs(self.config.create_timeout_secs),
            self.appointments.create(&appointment),
        )
        .await
        .map_err(|_| AppError::Timeout {
            phase: "appointment create",
        })??;

        // A reader immediately after this response must not see the stale
        // cached list.
        invalidate(
            self.store.as_ref(),
            &keys::user_appointments_key(request.user.id),
        )
        .await;

        self.notifications
            .dispatch(BookingEvent::Created(AppointmentNotice {
                appointment_id: created.id,
                patient_email: request.user.email.clone(),
                patient_name: request.user.display_name(),
                doctor_name: doctor.name.clone(),
                date: created.date_string(),
                time: created.time.clone(),
                reason,
            }));

        info!(
            "Appointment {} created for user {}",
            created.id, request.user.id
        );

        Ok(AppointmentDetail {
            appointment: created,
            patient_name: request.user.display_name(),
            patient_email: request.user.email.clone(),
            doctor_name: doctor.name,
            doctor_email: doctor.email,
            doctor_image_url: doctor.image_url,
        })
    }

    /// Cancel an appointment (hard delete)
    ///
    /// Only the owner, or an admin, may cancel.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
        is_admin: bool,
    ) -> AppResult<()> {
        info!("Cancelling appointment {}", appointment_id);

        let detail = self
            .appointments
            .find_detail(appointment_id)
            .await?
            .ok_or_else(|| AppError::AppointmentNotFound(appointment_id.to_string()))?;

        if detail.appointment.user_id != user.id && !is_admin {
            return Err(AppError::Forbidden(
                "You do not have permission to cancel this appointment".to_string(),
            ));
        }

        self.appointments.delete(appointment_id).await?;

        invalidate(
            self.store.as_ref(),
            &keys::user_appointments_key(detail.appointment.user_id),
        )
        .await;

        self.notifications
            .dispatch(BookingEvent::Cancelled(AppointmentNotice {
                appointment_id,
                patient_email: detail.patient_email,
                patient_name: detail.patient_name,
                doctor_name: detail.doctor_name,
                date: detail.appointment.date_string(),
                time: detail.appointment.time.clone(),
                reason: detail
                    .appointment
                    .reason
                    .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            }));

        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    /// Update an appointment's status
    ///
    /// Only the owner, or an admin, may update.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_status(
        &self,
        user: &User,
        appointment_id: Uuid,
        status: AppointmentStatus,
        is_admin: bool,
    ) -> AppResult<Appointment> {
        info!("Updating appointment {} status to {}", appointment_id, status);

        let detail = self
            .appointments
            .find_detail(appointment_id)
            .await?
            .ok_or_else(|| AppError::AppointmentNotFound(appointment_id.to_string()))?;

        if detail.appointment.user_id != user.id && !is_admin {
            return Err(AppError::Forbidden(
                "You do not have permission to update this appointment".to_string(),
            ));
        }

        let updated = self.appointments.update_status(appointment_id, status).await?;

        invalidate(
            self.store.as_ref(),
            &keys::user_appointments_key(detail.appointment.user_id),
        )
        .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medbook_cache::MemoryStore;
    use medbook_core::models::{Doctor, Gender};
    use medbook_core::traits::ScheduleClash;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Vec-backed appointment store with the conflict queries implemented
    /// over the live rows
    #[derive(Default)]
    struct InMemoryAppointments {
        rows: Mutex<Vec<Appointment>>,
        doctor_names: Mutex<HashMap<Uuid, String>>,
    }

    impl InMemoryAppointments {
        fn register_doctor(&self, id: Uuid, name: &str) {
            self.doctor_names.lock().unwrap().insert(id, name.to_string());
        }

        fn detail_for(&self, appointment: Appointment) -> AppointmentDetail {
            let doctor_name = self
                .doctor_names
                .lock()
                .unwrap()
                .get(&appointment.doctor_id)
                .cloned()
                .unwrap_or_default();
            AppointmentDetail {
                appointment,
                patient_name: "Test Patient".to_string(),
                patient_email: "patient@example.com".to_string(),
                doctor_name,
                doctor_email: "doctor@example.com".to_string(),
                doctor_image_url: "https://example.com/avatar.svg".to_string(),
            }
        }
    }

    #[async_trait]
    impl AppointmentRepository for InMemoryAppointments {
        async fn create(&self, entity: &Appointment) -> AppResult<Appointment> {
            self.rows.lock().unwrap().push(entity.clone());
            Ok(entity.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Appointment>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned())
        }

        async fn find_detail(&self, id: Uuid) -> AppResult<Option<AppointmentDetail>> {
            let found = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned();
            Ok(found.map(|a| self.detail_for(a)))
        }

        async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<AppointmentDetail>> {
            let rows: Vec<Appointment> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect();
            Ok(rows.into_iter().map(|a| self.detail_for(a)).collect())
        }

        async fn list_all(
            &self,
            _limit: i64,
            _offset: i64,
        ) -> AppResult<(Vec<AppointmentDetail>, i64)> {
            let rows: Vec<Appointment> = self.rows.lock().unwrap().clone();
            let total = rows.len() as i64;
            Ok((rows.into_iter().map(|a| self.detail_for(a)).collect(), total))
        }

        async fn delete(&self, id: Uuid) -> AppResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|a| a.id != id);
            Ok(rows.len() < before)
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: AppointmentStatus,
        ) -> AppResult<Appointment> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AppError::AppointmentNotFound(id.to_string()))?;
            row.status = status;
            Ok(row.clone())
        }

        async fn booked_slots(
            &self,
            doctor_id: Uuid,
            date: NaiveDate,
        ) -> AppResult<Vec<String>> {
            let mut slots: Vec<String> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.doctor_id == doctor_id && a.date == date)
                .map(|a| a.time.clone())
                .collect();
            slots.sort();
            Ok(slots)
        }

        async fn slot_taken(
            &self,
            doctor_id: Uuid,
            date: NaiveDate,
            time: &str,
        ) -> AppResult<bool> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .any(|a| a.doctor_id == doctor_id && a.date == date && a.time == time))
        }

        async fn duplicate_booking(
            &self,
            user_id: Uuid,
            doctor_id: Uuid,
            date: NaiveDate,
            time: &str,
        ) -> AppResult<bool> {
            Ok(self.rows.lock().unwrap().iter().any(|a| {
                a.user_id == user_id
                    && a.doctor_id == doctor_id
                    && a.date == date
                    && a.time == time
            }))
        }

        async fn user_conflict(
            &self,
            user_id: Uuid,
            date: NaiveDate,
            time: &str,
        ) -> AppResult<Option<ScheduleClash>> {
            let rows = self.rows.lock().unwrap();
            let hit = rows
                .iter()
                .find(|a| a.user_id == user_id && a.date == date && a.time == time);
            Ok(hit.map(|a| ScheduleClash {
                doctor_id: a.doctor_id,
                doctor_name: self
                    .doctor_names
                    .lock()
                    .unwrap()
                    .get(&a.doctor_id)
                    .cloned()
                    .unwrap_or_default(),
            }))
        }

        async fn count_by_status(&self, status: AppointmentStatus) -> AppResult<i64> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.status == status)
                .count() as i64)
        }
    }

    #[derive(Default)]
    struct InMemoryDoctors {
        rows: Mutex<HashMap<Uuid, Doctor>>,
    }

    #[async_trait]
    impl DoctorRepository for InMemoryDoctors {
        async fn create(&self, entity: &Doctor) -> AppResult<Doctor> {
            self.rows.lock().unwrap().insert(entity.id, entity.clone());
            Ok(entity.clone())
        }

        async fn update(&self, entity: &Doctor) -> AppResult<Doctor> {
            self.rows.lock().unwrap().insert(entity.id, entity.clone());
            Ok(entity.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Doctor>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn list_with_counts(&self) -> AppResult<Vec<(Doctor, i64)>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .cloned()
                .map(|d| (d, 0))
                .collect())
        }
    }

    struct Fixture {
        service: BookingService<InMemoryAppointments, InMemoryDoctors, MemoryStore>,
        store: Arc<MemoryStore>,
        _rx: UnboundedReceiver<BookingEvent>,
    }

    fn doctor(name: &str, active: bool) -> Doctor {
        Doctor::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "555-0100".to_string(),
            "General Dentistry".to_string(),
            None,
            Gender::Female,
            active,
        )
    }

    fn user(n: u128, email: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: Uuid::from_u128(n),
            external_id: format!("idp_{}", n),
            email: email.to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some("Patient".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    async fn fixture(doctors: &[&Doctor]) -> Fixture {
        let appointments = Arc::new(InMemoryAppointments::default());
        let doctor_repo = Arc::new(InMemoryDoctors::default());
        for d in doctors {
            doctor_repo.create(d).await.unwrap();
            appointments.register_doctor(d.id, &d.name);
        }

        let store = Arc::new(MemoryStore::new());
        let (dispatcher, rx) = NotificationDispatcher::new();
        let service = BookingService::new(
            appointments,
            doctor_repo,
            store.clone(),
            dispatcher,
            BookingConfig::default(),
        );

        Fixture {
            service,
            store,
            _rx: rx,
        }
    }

    fn request(user: User, doctor_id: Uuid) -> BookingRequest {
        BookingRequest {
            user,
            doctor_id,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "09:00".to_string(),
            reason: None,
            duration_minutes: None,
        }
    }

    #[tokio::test]
    async fn test_booking_scenario_all_three_conflicts() {
        let doc_d = doctor("Delgado", true);
        let doc_e = doctor("Estrada", true);
        let fx = fixture(&[&doc_d, &doc_e]).await;

        let alice = user(1, "alice@example.com");
        let bob = user(2, "bob@example.com");

        // Alice books doctor D: succeeds with defaults applied
        let created = fx
            .service
            .attempt_booking(request(alice.clone(), doc_d.id))
            .await
            .unwrap();
        assert_eq!(created.appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(created.appointment.duration_minutes, 30);
        assert_eq!(
            created.appointment.reason.as_deref(),
            Some("General consultation")
        );

        // Bob wants the same doctor and slot: doctor-slot-taken
        let err = fx
            .service
            .attempt_booking(request(bob, doc_d.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotTaken));

        // Alice retries the same doctor and slot: exact duplicate
        let err = fx
            .service
            .attempt_booking(request(alice.clone(), doc_d.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateBooking));

        // Alice tries doctor E at the same time: clash naming doctor D
        let err = fx
            .service
            .attempt_booking(request(alice, doc_e.id))
            .await
            .unwrap_err();
        match err {
            AppError::ScheduleConflict { doctor_name } => assert_eq!(doctor_name, "Delgado"),
            other => panic!("expected ScheduleConflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_attempts_yield_one_appointment() {
        let doc = doctor("Delgado", true);
        let fx = fixture(&[&doc]).await;

        let alice = user(1, "alice@example.com");
        let bob = user(2, "bob@example.com");

        let (a, b) = tokio::join!(
            fx.service.attempt_booking(request(alice, doc.id)),
            fx.service.attempt_booking(request(bob, doc.id)),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1, "exactly one concurrent attempt may win");
    }

    #[tokio::test]
    async fn test_lock_is_released_after_success_and_failure() {
        let doc = doctor("Delgado", true);
        let fx = fixture(&[&doc]).await;
        let alice = user(1, "alice@example.com");

        let lock_key = keys::booking_lock_key(
            alice.id,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "09:00",
        );

        fx.service
            .attempt_booking(request(alice.clone(), doc.id))
            .await
            .unwrap();
        assert!(!fx.store.exists(&lock_key).await.unwrap());

        // Duplicate attempt fails, but must still release the lock
        fx.service
            .attempt_booking(request(alice.clone(), doc.id))
            .await
            .unwrap_err();
        assert!(!fx.store.exists(&lock_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_doctor_rejected() {
        let fx = fixture(&[]).await;
        let err = fx
            .service
            .attempt_booking(request(user(1, "a@example.com"), Uuid::from_u128(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DoctorNotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_doctor_rejected() {
        let doc = doctor("Delgado", false);
        let fx = fixture(&[&doc]).await;
        let err = fx
            .service
            .attempt_booking(request(user(1, "a@example.com"), doc.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DoctorInactive(_)));
    }

    #[tokio::test]
    async fn test_booking_invalidates_cached_appointment_list() {
        let doc = doctor("Delgado", true);
        let fx = fixture(&[&doc]).await;
        let alice = user(1, "alice@example.com");

        // Simulate a previously populated list cache
        let cache_key = keys::user_appointments_key(alice.id);
        fx.store
            .set(&cache_key, &vec!["stale entry"], 30)
            .await
            .unwrap();

        fx.service
            .attempt_booking(request(alice, doc.id))
            .await
            .unwrap();

        assert!(!fx.store.exists(&cache_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership() {
        let doc = doctor("Delgado", true);
        let fx = fixture(&[&doc]).await;
        let alice = user(1, "alice@example.com");
        let mallory = user(3, "mallory@example.com");

        let created = fx
            .service
            .attempt_booking(request(alice.clone(), doc.id))
            .await
            .unwrap();
        let id = created.appointment.id;

        let err = fx
            .service
            .cancel_appointment(&mallory, id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Admins may cancel on behalf of others; owners may cancel themselves
        fx.service.cancel_appointment(&alice, id, false).await.unwrap();

        let err = fx
            .service
            .cancel_appointment(&alice, id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AppointmentNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status_invalidates_owner_cache() {
        let doc = doctor("Delgado", true);
        let fx = fixture(&[&doc]).await;
        let alice = user(1, "alice@example.com");

        let created = fx
            .service
            .attempt_booking(request(alice.clone(), doc.id))
            .await
            .unwrap();

        let cache_key = keys::user_appointments_key(alice.id);
        fx.store.set(&cache_key, &vec!["stale"], 30).await.unwrap();

        let updated = fx
            .service
            .update_status(
                &alice,
                created.appointment.id,
                AppointmentStatus::Completed,
                false,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Completed);
        assert!(!fx.store.exists(&cache_key).await.unwrap());
    }
}
