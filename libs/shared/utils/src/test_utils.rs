use std::path::PathBuf;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::PatientProfile;

pub struct TestConfig {
    pub api_base_url: String,
    pub clinic_utc_offset_minutes: i32,
    pub default_slot_duration_minutes: u32,
    pub session_store_path: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            clinic_utc_offset_minutes: 0,
            default_slot_duration_minutes: 30,
            session_store_path: PathBuf::from("test-session.json"),
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            clinic_utc_offset_minutes: self.clinic_utc_offset_minutes,
            default_slot_duration_minutes: self.default_slot_duration_minutes,
            request_timeout_seconds: 5,
            session_store_path: self.session_store_path.clone(),
        }
    }
}

pub struct TestPatient {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Default for TestPatient {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Test Patient".to_string(),
            email: "patient@example.com".to_string(),
        }
    }
}

impl TestPatient {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    pub fn to_profile(&self) -> PatientProfile {
        PatientProfile {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            mobile: None,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email
        })
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(patient: &TestPatient, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": patient.id,
            "email": patient.email,
            "role": "patient",
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(patient: &TestPatient, secret: &str) -> String {
        Self::create_test_token(patient, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn login_response(token: &str, patient: &TestPatient) -> Value {
        json!({
            "message": "Login successful",
            "token": token,
            "user": patient.to_json()
        })
    }

    /// Login whose `user` carries both `id` and `_id`.
    pub fn stored_login_response(token: &str, patient: &TestPatient, object_id: &str) -> Value {
        let mut response = Self::login_response(token, patient);
        response["user"]["_id"] = json!(object_id);
        response
    }

    pub fn slots_response(slots: &[(&str, &str)]) -> Value {
        let slots: Vec<Value> = slots
            .iter()
            .map(|(start, end)| json!({ "start": start, "end": end }))
            .collect();
        json!({ "slots": slots })
    }

    pub fn appointment_response(
        appointment_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "appointmentId": appointment_id,
            "doctorId": doctor_id,
            "doctorName": "Dr. Test",
            "date": date,
            "time": time,
            "sessionType": "consultation",
            "appointmentType": "manual",
            "status": status
        })
    }

    /// Appointment as the backend stores it: `_id` next to `appointmentId`.
    pub fn stored_appointment_response(
        appointment_id: &str,
        object_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        let mut record = Self::appointment_response(appointment_id, "doc-1", date, time, status);
        record["_id"] = json!(object_id);
        record
    }

    pub fn appointments_response(appointments: Vec<Value>) -> Value {
        json!({ "appointments": appointments })
    }

    pub fn hospital_response(hospital_id: &str, name: &str) -> Value {
        json!({
            "hospital_id": hospital_id,
            "name": name,
            "address": "1 Clinic Road"
        })
    }

    /// Hospital as the backend stores it: `_id` next to `hospital_id`.
    pub fn stored_hospital_response(hospital_id: &str, object_id: &str, name: &str) -> Value {
        let mut record = Self::hospital_response(hospital_id, name);
        record["_id"] = json!(object_id);
        record
    }

    pub fn doctor_response(doctor_id: &str, name: &str, department: &str) -> Value {
        json!({
            "_id": doctor_id,
            "name": name,
            "department": department,
            "specialization": "General Practice"
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "message": message })
    }
}
