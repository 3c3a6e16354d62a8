use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use shared_api::ApiError;
use shared_models::error::AppError;

/// Hospital records carry both the backend's `hospital_id` and the storage
/// `_id`; `hospital_id` wins when both are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HospitalRecord")]
pub struct Hospital {
    pub hospital_id: String,
    pub name: String,
    pub address: Option<String>,
    pub specialties: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HospitalRecord {
    #[serde(default)]
    hospital_id: Option<Value>,
    #[serde(rename = "_id", default)]
    object_id: Option<Value>,
    name: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    specialties: Option<String>,
}

impl TryFrom<HospitalRecord> for Hospital {
    type Error = String;

    fn try_from(record: HospitalRecord) -> Result<Self, Self::Error> {
        let hospital_id = first_id(&[&record.hospital_id, &record.object_id])
            .ok_or_else(|| format!("hospital {:?} has no id", record.name))?;
        Ok(Hospital {
            hospital_id,
            name: record.name,
            address: record.address,
            specialties: record.specialties,
        })
    }
}

/// Resolution order: `_id`, then `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DoctorRecord")]
pub struct Doctor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub department: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoctorRecord {
    #[serde(rename = "_id", default)]
    object_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    specialization: Option<String>,
}

impl TryFrom<DoctorRecord> for Doctor {
    type Error = String;

    fn try_from(record: DoctorRecord) -> Result<Self, Self::Error> {
        let id = first_id(&[&record.object_id, &record.id])
            .ok_or_else(|| format!("doctor {:?} has no id", record.name))?;
        Ok(Doctor {
            id,
            name: record.name,
            department: record.department,
            specialization: record.specialization,
        })
    }
}

/// First candidate holding a non-empty string or a number.
fn first_id(candidates: &[&Option<Value>]) -> Option<String> {
    candidates.iter().find_map(|candidate| match candidate {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decodes directory records one by one. A malformed record is logged and
/// skipped instead of failing the list.
pub(crate) fn decode_records<T>(records: Vec<Value>, kind: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping unreadable {} record: {}", kind, e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DepartmentsResponse {
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoctorsResponse {
    #[serde(default)]
    pub doctors: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("No hospital selected")]
    NoHospitalSelected,

    #[error("Hospital not found: {0}")]
    HospitalNotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NoHospitalSelected => {
                AppError::ValidationError("No hospital selected".to_string())
            }
            DirectoryError::HospitalNotFound(id) => {
                AppError::NotFound(format!("Hospital {} not found", id))
            }
            DirectoryError::Api(e) => e.into(),
        }
    }
}
