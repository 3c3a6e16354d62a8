// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Which actions the client lets a patient start. The backend stays the
/// authority; this only keeps obviously doomed requests off the wire.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status.clone()));
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            // Rescheduling keeps the appointment scheduled.
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Other(status) => vec![
                AppointmentStatus::Other(status.clone()),
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
            ],
            // Terminal
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn can_reschedule(&self, status: &AppointmentStatus) -> bool {
        !status.is_cancelled()
    }

    pub fn can_cancel(&self, status: &AppointmentStatus) -> bool {
        self.get_valid_transitions(status)
            .contains(&AppointmentStatus::Cancelled)
    }

    pub fn validate_reschedule(&self, status: &AppointmentStatus) -> Result<(), AppointmentError> {
        if !self.can_reschedule(status) {
            warn!("Refusing to reschedule a {} appointment", status);
            return Err(AppointmentError::InvalidStatusTransition(status.clone()));
        }
        Ok(())
    }

    pub fn validate_cancel(&self, status: &AppointmentStatus) -> Result<(), AppointmentError> {
        self.validate_status_transition(status, &AppointmentStatus::Cancelled)
    }
}
