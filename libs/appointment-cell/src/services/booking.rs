// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use session_cell::Session;
use shared_api::{ApiClient, ApiError};
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, BookingOutcome,
    Slot, DATE_FORMAT, TIME_FORMAT,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Submits book, reschedule and cancel requests. Every call resolves to a
/// `BookingOutcome`; nothing here returns an error to the caller.
pub struct AppointmentBookingService {
    api: Arc<ApiClient>,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    #[instrument(skip(self, session, request), fields(doctor_id = %request.doctor_id))]
    pub async fn book_appointment(
        &self,
        session: &Session,
        request: &BookAppointmentRequest,
    ) -> BookingOutcome {
        let hospital_id = match session.hospital_id() {
            Some(id) => id.to_string(),
            None => {
                return BookingOutcome::Failed(AppError::ValidationError(
                    "Please select a hospital first".to_string(),
                ))
            }
        };
        if request.doctor_id.trim().is_empty() {
            return BookingOutcome::Failed(AppError::ValidationError(
                "Please select a doctor".to_string(),
            ));
        }

        let date = request.date.format(DATE_FORMAT).to_string();
        let payload = json!({
            "hospitalId": hospital_id,
            "doctorId": request.doctor_id,
            "patientId": session.patient_id(),
            "patientName": session.patient.display_name(),
            "date": date,
            "slotStart": request.slot.start().format(TIME_FORMAT).to_string(),
            "slotEnd": request.slot.end().format(TIME_FORMAT).to_string(),
            "sessionType": request.session_type.as_wire(),
            "appointmentType": request.appointment_type.as_wire(),
            "reason": request.reason.trim(),
        });

        debug!("Booking {} on {} with {}", request.slot, date, request.doctor_id);
        let result = self
            .api
            .post::<Value>("/api/patient-appointments/book", Some(session.bearer_token()), payload)
            .await;

        self.resolve(result, "book", |response| {
            let appointment_id = response
                .and_then(|r| r.get("appointmentId").or_else(|| r.get("_id")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("local-{}", Uuid::new_v4()));

            Appointment {
                appointment_id,
                doctor_id: Some(request.doctor_id.clone()),
                doctor_name: request.doctor_name.clone(),
                date: date.clone(),
                time: request.slot.label(),
                session_type: request.session_type.to_string(),
                appointment_type: request.appointment_type.to_string(),
                status: AppointmentStatus::Scheduled,
                reason: Some(request.reason.trim().to_string()),
                hospital_id_camel: Some(Value::String(hospital_id.clone())),
                hospital_id_snake: None,
                hospital: None,
            }
        })
    }

    /// Moves an appointment to `new_slot` on the same day.
    #[instrument(skip(self, session, appointment), fields(appointment_id = %appointment.appointment_id))]
    pub async fn reschedule_appointment(
        &self,
        session: &Session,
        appointment: &Appointment,
        new_slot: Slot,
    ) -> BookingOutcome {
        if let Err(e) = self.lifecycle_service.validate_reschedule(&appointment.status) {
            return BookingOutcome::Failed(e.into());
        }

        let path = format!(
            "/api/patient-appointments/{}/reschedule",
            urlencoding::encode(&appointment.appointment_id)
        );
        let payload = json!({
            "newSlotStart": new_slot.start().format(TIME_FORMAT).to_string(),
            "newSlotDuration": new_slot.duration_minutes(),
        });

        let result = self.api.put::<Value>(&path, session.bearer_token(), payload).await;

        self.resolve(result, "reschedule", |_| {
            let mut patched = appointment.clone();
            patched.time = new_slot.label();
            patched
        })
    }

    #[instrument(skip(self, session, appointment), fields(appointment_id = %appointment.appointment_id))]
    pub async fn cancel_appointment(&self, session: &Session, appointment: &Appointment) -> BookingOutcome {
        if let Err(e) = self.lifecycle_service.validate_cancel(&appointment.status) {
            return BookingOutcome::Failed(e.into());
        }

        let path = format!(
            "/api/patient-appointments/{}/cancel",
            urlencoding::encode(&appointment.appointment_id)
        );
        let result = self.api.put::<Value>(&path, session.bearer_token(), json!({})).await;

        self.resolve(result, "cancel", |_| {
            let mut patched = appointment.clone();
            patched.status = AppointmentStatus::Cancelled;
            patched
        })
    }

    /// Turns a submission result into an outcome. A successful response that
    /// carries an appointment record wins; otherwise `local` builds the
    /// optimistic copy.
    fn resolve<F>(&self, result: Result<Value, ApiError>, action: &str, local: F) -> BookingOutcome
    where
        F: FnOnce(Option<&Value>) -> Appointment,
    {
        match result {
            Ok(response) => {
                let appointment = appointment_from_response(&response)
                    .unwrap_or_else(|| local(Some(&response).filter(|r| !r.is_null())));
                info!("{} confirmed for appointment {}", action, appointment.appointment_id);
                BookingOutcome::Confirmed(appointment)
            }
            Err(ApiError::Conflict(message)) => {
                warn!("{} rejected, slot already taken: {}", action, message);
                BookingOutcome::Conflict { message }
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                BookingOutcome::Failed(AppointmentError::from(e).into())
            }
        }
    }
}

/// The backend answers with either `{ appointment: {...} }` or the record
/// itself.
fn appointment_from_response(response: &Value) -> Option<Appointment> {
    let record = response.get("appointment").unwrap_or(response);
    if !record.is_object() {
        return None;
    }
    match serde_json::from_value::<Appointment>(record.clone()) {
        Ok(appointment) => Some(appointment),
        Err(e) => {
            debug!("Response did not carry a full appointment: {}", e);
            None
        }
    }
}
