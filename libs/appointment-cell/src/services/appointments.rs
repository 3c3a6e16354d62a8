// libs/appointment-cell/src/services/appointments.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use session_cell::Session;
use shared_api::ApiClient;

use crate::models::{Appointment, AppointmentClassification, AppointmentError};
use crate::services::classifier::classify_appointments;

#[derive(Debug, Deserialize)]
struct AppointmentsResponse {
    #[serde(default)]
    appointments: Vec<Value>,
}

pub struct AppointmentQueryService {
    api: Arc<ApiClient>,
}

impl AppointmentQueryService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Every appointment the backend holds for the signed-in patient.
    #[instrument(skip(self, session))]
    pub async fn fetch_appointments(&self, session: &Session) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/api/patient-appointments/patient/{}",
            urlencoding::encode(session.patient_id())
        );
        self.fetch(session, &path).await
    }

    /// Appointments the backend itself considers past.
    #[instrument(skip(self, session))]
    pub async fn fetch_past_appointments(&self, session: &Session) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/api/patient-appointments/patient/{}/past",
            urlencoding::encode(session.patient_id())
        );
        self.fetch(session, &path).await
    }

    /// Fetches and classifies, scoped to the session's selected hospital
    /// when there is one.
    pub async fn load_classified(
        &self,
        session: &Session,
        now: NaiveDateTime,
    ) -> Result<AppointmentClassification, AppointmentError> {
        let appointments = self.fetch_appointments(session).await?;
        let classification = classify_appointments(&appointments, session.hospital_id(), now);
        info!(
            "Patient {} has {} upcoming appointments",
            session.patient_id(),
            classification.upcoming_count()
        );
        Ok(classification)
    }

    async fn fetch(&self, session: &Session, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let response: AppointmentsResponse = self.api.get(path, session.bearer_token(), &[]).await?;
        let appointments = decode_appointments(response.appointments);
        debug!("Loaded {} appointments from {}", appointments.len(), path);
        Ok(appointments)
    }
}

/// Decodes records individually so one bad record does not cost the list.
pub fn decode_appointments(records: Vec<Value>) -> Vec<Appointment> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Appointment>(record) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!("Skipping unreadable appointment record: {}", e);
                None
            }
        })
        .collect()
}
