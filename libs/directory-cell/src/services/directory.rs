use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use session_cell::Session;
use shared_api::{ApiClient, ApiError};

use crate::models::{decode_records, DepartmentsResponse, DirectoryError, Doctor, DoctorsResponse, Hospital};

/// Read-only lookups that feed the booking flow: hospital, then department,
/// then doctor.
pub struct DirectoryService {
    api: Arc<ApiClient>,
}

impl DirectoryService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    #[instrument(skip(self, session))]
    pub async fn list_hospitals(&self, session: &Session) -> Result<Vec<Hospital>, DirectoryError> {
        let records: Vec<Value> = self.api.get("/hospital", session.bearer_token(), &[]).await?;
        let hospitals: Vec<Hospital> = decode_records(records, "hospital");
        debug!("Loaded {} hospitals", hospitals.len());
        Ok(hospitals)
    }

    #[instrument(skip(self, session))]
    pub async fn get_hospital(&self, session: &Session, hospital_id: &str) -> Result<Hospital, DirectoryError> {
        let path = format!("/hospital/{}", urlencoding::encode(hospital_id));

        match self.api.get(&path, session.bearer_token(), &[]).await {
            Ok(hospital) => Ok(hospital),
            Err(ApiError::NotFound(_)) => Err(DirectoryError::HospitalNotFound(hospital_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Departments of the hospital selected in the session.
    #[instrument(skip(self, session))]
    pub async fn list_departments(&self, session: &Session) -> Result<Vec<String>, DirectoryError> {
        let hospital_id = session.hospital_id().ok_or(DirectoryError::NoHospitalSelected)?;
        let path = format!(
            "/api/patient-appointments/departments/{}",
            urlencoding::encode(hospital_id)
        );

        let response: DepartmentsResponse = self.api.get(&path, session.bearer_token(), &[]).await?;
        Ok(response.departments)
    }

    #[instrument(skip(self, session))]
    pub async fn list_doctors(&self, session: &Session, department: &str) -> Result<Vec<Doctor>, DirectoryError> {
        if department.trim().is_empty() {
            return Ok(Vec::new());
        }
        let hospital_id = session.hospital_id().ok_or(DirectoryError::NoHospitalSelected)?;

        let response: DoctorsResponse = self
            .api
            .get(
                "/api/patient-appointments/doctors",
                session.bearer_token(),
                &[("hospitalId", hospital_id), ("department", department)],
            )
            .await?;

        let doctors: Vec<Doctor> = decode_records(response.doctors, "doctor");
        debug!("Loaded {} doctors for {}", doctors.len(), department);
        Ok(doctors)
    }

    /// Every doctor attached to a hospital, regardless of department.
    #[instrument(skip(self, session))]
    pub async fn list_hospital_doctors(
        &self,
        session: &Session,
        hospital_id: &str,
    ) -> Result<Vec<Doctor>, DirectoryError> {
        let path = format!("/doctors/hospital/{}", urlencoding::encode(hospital_id));
        let records: Vec<Value> = self.api.get(&path, session.bearer_token(), &[]).await?;
        Ok(decode_records(records, "doctor"))
    }
}

/// Case-insensitive match on the hospital name or its specialties.
pub fn search_hospitals<'a>(hospitals: &'a [Hospital], query: &str) -> Vec<&'a Hospital> {
    let needle = query.trim().to_lowercase();
    hospitals
        .iter()
        .filter(|h| {
            h.name.to_lowercase().contains(&needle)
                || h.specialties
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
        })
        .collect()
}

pub fn search_doctors<'a>(doctors: &'a [Doctor], query: &str) -> Vec<&'a Doctor> {
    let needle = query.trim().to_lowercase();
    doctors
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn find_doctor<'a>(doctors: &'a [Doctor], id_or_name: &str) -> Option<&'a Doctor> {
    doctors
        .iter()
        .find(|d| d.id == id_or_name)
        .or_else(|| doctors.iter().find(|d| d.name == id_or_name))
}
