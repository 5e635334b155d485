//! Booking notification dispatch
//!
//! Side effects of a successful mutation (confirmation and cancellation
//! emails) run off the request path. Events go through an explicit queue
//! consumed by a worker task, so a dispatch is never an unawaited call that
//! process shutdown could silently drop mid-flight. Delivery failures are
//! caught and logged; they never propagate to the caller.

use medbook_core::traits::{MailMessage, Mailer};
use medbook_core::AppResult;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Fields shared by every appointment notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentNotice {
    pub appointment_id: Uuid,
    pub patient_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub reason: String,
}

/// Booking lifecycle events that produce outbound mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Created(AppointmentNotice),
    Cancelled(AppointmentNotice),
}

/// Handle used by services to enqueue events
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<BookingEvent>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiving end for its worker
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BookingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event; failure is logged, never surfaced
    pub fn dispatch(&self, event: BookingEvent) {
        debug!("Dispatching booking event: {:?}", event);
        if self.tx.send(event).is_err() {
            error!("Notification queue closed, dropping booking event");
        }
    }
}

/// Consume the event queue, delivering each event through the mailer
///
/// Runs until the last dispatcher handle is dropped. Spawn with
/// `tokio::spawn` at startup.
pub async fn run_worker<M: Mailer>(mailer: Arc<M>, mut rx: mpsc::UnboundedReceiver<BookingEvent>) {
    info!("Notification worker started");

    while let Some(event) = rx.recv().await {
        if let Err(e) = deliver(mailer.as_ref(), &event).await {
            error!("Failed to deliver booking notification: {}", e);
        }
    }

    info!("Notification worker stopped");
}

/// Render and send the email for one event
async fn deliver<M: Mailer + ?Sized>(mailer: &M, event: &BookingEvent) -> AppResult<()> {
    let message = match event {
        BookingEvent::Created(notice) => MailMessage {
            to: notice.patient_email.clone(),
            subject: format!("Appointment Confirmed with Dr. {}", notice.doctor_name),
            html: render_notice(
                notice,
                "Appointment Confirmed!",
                "Your appointment has been successfully booked:",
            ),
        },
        BookingEvent::Cancelled(notice) => MailMessage {
            to: notice.patient_email.clone(),
            subject: format!("Appointment Cancelled with Dr. {}", notice.doctor_name),
            html: render_notice(
                notice,
                "Appointment Cancelled",
                "Your appointment has been cancelled:",
            ),
        },
    };

    mailer.send(&message).await?;

    debug!(
        "Delivered notification for appointment {}",
        match event {
            BookingEvent::Created(n) | BookingEvent::Cancelled(n) => n.appointment_id,
        }
    );

    Ok(())
}

/// Shared HTML body for appointment notices
fn render_notice(notice: &AppointmentNotice, heading: &str, lede: &str) -> String {
    format!(
        r#"<html>
  <body>
    <h1>{heading}</h1>
    <p>Hi {patient},</p>
    <p>{lede}</p>
    <ul>
      <li><strong>Doctor:</strong> {doctor}</li>
      <li><strong>Reason:</strong> {reason}</li>
      <li><strong>Date:</strong> {date}</li>
      <li><strong>Time:</strong> {time}</li>
    </ul>
    <p>Best regards,<br/>The MedBook Team</p>
  </body>
</html>"#,
        heading = heading,
        patient = notice.patient_name,
        lede = lede,
        doctor = notice.doctor_name,
        reason = notice.reason,
        date = notice.date,
        time = notice.time,
    )
}
