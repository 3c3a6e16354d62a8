use serde::{Deserialize, Serialize};

use shared_models::auth::PatientProfile;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const PATIENT_ID_KEY: &str = "patientId";
pub const SELECTED_HOSPITAL_ID_KEY: &str = "selectedHospitalId";
pub const HOSPITAL_NAME_KEY: &str = "hospital";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalSelection {
    pub id: String,
    pub name: String,
}

/// Everything an operation needs to act on behalf of the logged-in patient.
/// Created by login or restore, torn down by logout.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub patient: PatientProfile,
    pub selected_hospital: Option<HospitalSelection>,
}

impl Session {
    pub fn new(token: impl Into<String>, patient: PatientProfile) -> Self {
        Self {
            token: token.into(),
            patient,
            selected_hospital: None,
        }
    }

    pub fn with_hospital(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.selected_hospital = Some(HospitalSelection {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn bearer_token(&self) -> &str {
        &self.token
    }

    pub fn patient_id(&self) -> &str {
        &self.patient.id
    }

    pub fn hospital_id(&self) -> Option<&str> {
        self.selected_hospital.as_ref().map(|h| h.id.as_str())
    }
}
