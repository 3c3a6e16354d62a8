use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claims read from the backend's bearer token. The client never holds the
/// signing secret, so these are only used to detect an expired session.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Patient as the backend returns it. User records may carry `id` and `_id`
/// together; `id` wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatientRecord")]
pub struct PatientProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatientRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "_id", default)]
    object_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    mobile: Option<String>,
}

impl TryFrom<PatientRecord> for PatientProfile {
    type Error = String;

    fn try_from(record: PatientRecord) -> Result<Self, Self::Error> {
        let id = [&record.id, &record.object_id]
            .into_iter()
            .find_map(|candidate| candidate.as_ref().and_then(non_empty_id))
            .ok_or_else(|| "expected a non-empty id in `id` or `_id`".to_string())?;

        Ok(PatientProfile {
            id,
            name: record.name,
            email: record.email,
            mobile: record.mobile,
        })
    }
}

impl PatientProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Patient")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_mobile: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<Value>,
    pub message: Option<String>,
}

fn non_empty_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patient_profile_accepts_object_id_alias() {
        let profile: PatientProfile =
            serde_json::from_value(json!({ "_id": "p-1", "name": "Ada" })).unwrap();
        assert_eq!(profile.id, "p-1");
        assert_eq!(profile.display_name(), "Ada");
    }

    #[test]
    fn test_patient_profile_stringifies_numeric_id() {
        let profile: PatientProfile = serde_json::from_value(json!({ "id": 42 })).unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.display_name(), "Unknown Patient");
    }

    #[test]
    fn test_patient_profile_with_both_id_fields_prefers_id() {
        let profile: PatientProfile =
            serde_json::from_value(json!({ "id": "p-1", "_id": "665f1e", "name": "Ada" })).unwrap();
        assert_eq!(profile.id, "p-1");

        let profile: PatientProfile =
            serde_json::from_value(json!({ "id": "", "_id": "665f1e" })).unwrap();
        assert_eq!(profile.id, "665f1e");
    }

    #[test]
    fn test_patient_profile_rejects_empty_id() {
        let result = serde_json::from_value::<PatientProfile>(json!({ "id": "" }));
        assert!(result.is_err());
    }
}
