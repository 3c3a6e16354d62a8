use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use shared_api::{ApiClient, ApiError};
use shared_models::auth::{LoginRequest, LoginResponse, PatientProfile};
use shared_utils::jwt::is_token_expired;

use crate::error::SessionError;
use crate::models::{
    HospitalSelection, Session, HOSPITAL_NAME_KEY, PATIENT_ID_KEY, SELECTED_HOSPITAL_ID_KEY,
    TOKEN_KEY, USER_KEY,
};
use crate::store::KeyValueStore;

pub struct SessionService {
    api: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
}

impl SessionService {
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { api, store }
    }

    /// Authenticates against the backend and persists the credential.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email_or_mobile: &str, password: &str) -> Result<Session, SessionError> {
        if email_or_mobile.trim().is_empty() || password.trim().is_empty() {
            return Err(SessionError::ValidationError(
                "Please enter email/mobile and password".to_string(),
            ));
        }

        let request = LoginRequest {
            email_or_mobile: email_or_mobile.trim().to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = match self
            .api
            .post("/patients/login", None, json!(request))
            .await
        {
            Ok(response) => response,
            Err(ApiError::Unauthorized(msg)) | Err(ApiError::NotFound(msg)) => {
                return Err(SessionError::LoginRejected(msg));
            }
            Err(ApiError::Status { status, message }) if status.is_client_error() => {
                return Err(SessionError::LoginRejected(message));
            }
            Err(e) => return Err(e.into()),
        };

        let token = match response.token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                let message = response.message.unwrap_or_else(|| "Login failed".to_string());
                warn!("Login response carried no token: {}", message);
                return Err(SessionError::LoginRejected(message));
            }
        };

        let user = response.user.ok_or_else(|| {
            SessionError::LoginRejected("Login response did not include a patient".to_string())
        })?;
        let patient: PatientProfile = serde_json::from_value(user.clone()).map_err(|e| {
            warn!("Login response patient could not be read: {}", e);
            SessionError::LoginRejected("Login response did not include a patient id".to_string())
        })?;

        self.store.set(TOKEN_KEY, &token).await?;
        self.store.set(USER_KEY, &user.to_string()).await?;
        self.store.set(PATIENT_ID_KEY, &patient.id).await?;

        let session = Session {
            token,
            selected_hospital: self.load_hospital_selection().await?,
            patient,
        };

        info!("Patient {} logged in", session.patient_id());
        Ok(session)
    }

    /// Rebuilds the session from device storage. A missing or expired
    /// credential means the screen must send the patient to login.
    pub async fn restore(&self, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let token = match self.store.get(TOKEN_KEY).await? {
            Some(token) if !token.is_empty() => token,
            _ => {
                debug!("No stored token");
                return Err(SessionError::MissingSession);
            }
        };

        if is_token_expired(&token, now) {
            info!("Stored token has expired");
            return Err(SessionError::MissingSession);
        }

        let patient = match self.store.get(USER_KEY).await? {
            Some(raw) => match serde_json::from_str::<PatientProfile>(&raw) {
                Ok(patient) => patient,
                Err(e) => {
                    warn!("Stored patient record is unreadable: {}", e);
                    return Err(SessionError::MissingSession);
                }
            },
            None => {
                debug!("No stored patient record");
                return Err(SessionError::MissingSession);
            }
        };

        Ok(Session {
            token,
            patient,
            selected_hospital: self.load_hospital_selection().await?,
        })
    }

    pub async fn require_session(&self) -> Result<Session, SessionError> {
        self.restore(Utc::now()).await
    }

    async fn load_hospital_selection(&self) -> Result<Option<HospitalSelection>, SessionError> {
        let id = match self.store.get(SELECTED_HOSPITAL_ID_KEY).await? {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(None),
        };
        let name = self.store.get(HOSPITAL_NAME_KEY).await?.unwrap_or_default();
        Ok(Some(HospitalSelection { id, name }))
    }

    pub async fn select_hospital(
        &self,
        session: &mut Session,
        hospital_id: &str,
        hospital_name: &str,
    ) -> Result<(), SessionError> {
        if hospital_id.trim().is_empty() {
            return self.clear_hospital(session).await;
        }

        self.store.set(SELECTED_HOSPITAL_ID_KEY, hospital_id).await?;
        self.store.set(HOSPITAL_NAME_KEY, hospital_name).await?;
        session.selected_hospital = Some(HospitalSelection {
            id: hospital_id.to_string(),
            name: hospital_name.to_string(),
        });

        info!("Selected hospital {}", hospital_id);
        Ok(())
    }

    pub async fn clear_hospital(&self, session: &mut Session) -> Result<(), SessionError> {
        self.store.remove(SELECTED_HOSPITAL_ID_KEY).await?;
        self.store.remove(HOSPITAL_NAME_KEY).await?;
        session.selected_hospital = None;
        Ok(())
    }

    /// Drops every stored value, including the hospital selection.
    pub async fn logout(&self, session: Session) -> Result<(), SessionError> {
        self.store.clear().await?;
        info!("Patient {} logged out", session.patient_id());
        Ok(())
    }
}
