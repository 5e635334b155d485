//! Booking conflict detection
//!
//! Three independent existence checks against the record store, executed
//! concurrently under one shared deadline. These checks are the final
//! authority on the slot invariant: for a given (doctor, date, time) at most
//! one active appointment, and for a given (user, date, time) at most one
//! active appointment regardless of doctor.
//!
//! Evaluation order of the resolved results is fixed: doctor-slot-taken
//! first, then the exact duplicate with the same doctor, then the
//! cross-doctor clash. The first hit aborts the attempt with its own
//! user-facing message.

use chrono::NaiveDate;
use medbook_core::{traits::AppointmentRepository, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Default shared deadline for the three parallel checks
const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Conflict detector over the appointment record store
pub struct ConflictDetector<A> {
    appointments: Arc<A>,
    deadline: Duration,
}

impl<A: AppointmentRepository> ConflictDetector<A> {
    /// Create a detector with the default 10-second deadline
    pub fn new(appointments: Arc<A>) -> Self {
        Self::with_deadline(appointments, DEFAULT_DEADLINE)
    }

    /// Create a detector with a custom deadline
    pub fn with_deadline(appointments: Arc<A>, deadline: Duration) -> Self {
        Self {
            appointments,
            deadline,
        }
    }

    /// Validate a candidate booking against durable state
    ///
    /// All three queries run concurrently; if the shared deadline elapses
    /// before all of them resolve, the attempt fails with a timeout rather
    /// than partially validating.
    ///
    /// # Errors
    ///
    /// - `AppError::SlotTaken` — the doctor's slot is held by any patient
    /// - `AppError::DuplicateBooking` — the user already holds this exact slot
    /// - `AppError::ScheduleConflict` — the user holds this slot with another
    ///   doctor; the message names that doctor
    /// - `AppError::Timeout` — the shared deadline elapsed
    #[instrument(skip(self))]
    pub async fn check(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> AppResult<()> {
        let checks = async {
            tokio::try_join!(
                self.appointments.slot_taken(doctor_id, date, time),
                self.appointments
                    .duplicate_booking(user_id, doctor_id, date, time),
                self.appointments.user_conflict(user_id, date, time),
            )
        };

        let (slot_taken, duplicate, clash) = tokio::time::timeout(self.deadline, checks)
            .await
            .map_err(|_| AppError::Timeout {
                phase: "conflict checks",
            })??;

        if slot_taken {
            warn!(
                "Doctor {} slot {} {} already booked",
                doctor_id, date, time
            );
            return Err(AppError::SlotTaken);
        }

        if duplicate {
            warn!(
                "User {} already has this slot with doctor {}",
                user_id, doctor_id
            );
            return Err(AppError::DuplicateBooking);
        }

        if let Some(clash) = clash {
            warn!(
                "User {} already booked at {} {} with doctor {}",
                user_id, date, time, clash.doctor_id
            );
            return Err(AppError::ScheduleConflict {
                doctor_name: clash.doctor_name,
            });
        }

        debug!("No conflicts for doctor {} at {} {}", doctor_id, date, time);
        Ok(())
    }
}
