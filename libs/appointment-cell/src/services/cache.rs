// libs/appointment-cell/src/services/cache.rs
use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::{Appointment, AppointmentClassification, AppointmentStatus, BookingOutcome, Slot};
use crate::services::classifier::classify_appointments;

/// The client's view of the patient's appointments between fetches.
/// Confirmed outcomes are merged by id; conflicts and failures leave it
/// untouched.
#[derive(Debug, Default, Clone)]
pub struct AppointmentCache {
    appointments: Vec<Appointment>,
    past: Vec<Appointment>,
}

impl AppointmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, appointments: Vec<Appointment>) {
        debug!("Replacing cached appointments ({} records)", appointments.len());
        self.appointments = appointments;
    }

    /// History from the backend's past endpoint, kept apart from the main list.
    pub fn replace_past(&mut self, past: Vec<Appointment>) {
        self.past = past;
    }

    /// Replaces the entry with the same id, or appends.
    pub fn merge_confirmed(&mut self, appointment: Appointment) {
        match self.find_mut(&appointment.appointment_id) {
            Some(existing) => *existing = appointment,
            None => self.appointments.push(appointment),
        }
    }

    pub fn mark_cancelled(&mut self, appointment_id: &str) -> bool {
        match self.find_mut(appointment_id) {
            Some(existing) => {
                existing.status = AppointmentStatus::Cancelled;
                true
            }
            None => false,
        }
    }

    pub fn apply_reschedule(&mut self, appointment_id: &str, slot: Slot) -> bool {
        match self.find_mut(appointment_id) {
            Some(existing) => {
                existing.time = slot.label();
                true
            }
            None => false,
        }
    }

    /// Returns whether the cache changed.
    pub fn apply(&mut self, outcome: &BookingOutcome) -> bool {
        match outcome {
            BookingOutcome::Confirmed(appointment) => {
                self.merge_confirmed(appointment.clone());
                true
            }
            BookingOutcome::Conflict { .. } | BookingOutcome::Failed(_) => false,
        }
    }

    fn find_mut(&mut self, appointment_id: &str) -> Option<&mut Appointment> {
        self.appointments
            .iter_mut()
            .find(|a| a.appointment_id == appointment_id)
    }

    pub fn get(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments
            .iter()
            .find(|a| a.appointment_id == appointment_id)
    }

    pub fn all(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn past(&self) -> &[Appointment] {
        &self.past
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn classify(&self, hospital_id: Option<&str>, now: NaiveDateTime) -> AppointmentClassification {
        classify_appointments(&self.appointments, hospital_id, now)
    }

    /// Classifies the past list. Records in it that are still ahead of `now`
    /// land in `upcoming`.
    pub fn classify_past(&self, hospital_id: Option<&str>, now: NaiveDateTime) -> AppointmentClassification {
        classify_appointments(&self.past, hospital_id, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn appointment(id: &str) -> Appointment {
        serde_json::from_value(json!({
            "appointmentId": id,
            "date": "2030-01-01",
            "time": "09:00 - 09:30",
            "status": "scheduled"
        }))
        .unwrap()
    }

    #[test]
    fn test_local_patches_by_id() {
        let mut cache = AppointmentCache::new();
        cache.replace_all(vec![appointment("a1"), appointment("a2")]);

        assert!(cache.mark_cancelled("a2"));
        assert!(cache.apply_reschedule("a1", Slot::parse("10:00", "10:45").unwrap()));
        assert!(!cache.mark_cancelled("missing"));

        assert_eq!(cache.get("a1").unwrap().time, "10:00 - 10:45");
        assert!(!cache.get("a1").unwrap().is_cancelled());
        assert!(cache.get("a2").unwrap().is_cancelled());
    }

    #[test]
    fn test_merge_inserts_unknown_ids() {
        let mut cache = AppointmentCache::new();
        cache.merge_confirmed(appointment("a1"));
        cache.merge_confirmed(appointment("a1"));
        cache.merge_confirmed(appointment("a2"));
        assert_eq!(cache.len(), 2);
    }
}
