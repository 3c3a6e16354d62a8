// libs/appointment-cell/src/services/classifier.rs
use std::cmp::Reverse;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentClassification, AppointmentError};
use crate::services::slots::truncate_to_minute;

/// Upcoming means not cancelled and starting at or after `now`, compared at
/// minute precision.
pub fn is_upcoming(appointment: &Appointment, now: NaiveDateTime) -> Result<bool, AppointmentError> {
    let start = appointment.scheduled_start()?;
    Ok(!appointment.is_cancelled() && start >= minute_floor(now))
}

/// Keeps appointments whose resolved hospital equals `hospital_id`.
/// Appointments with no resolvable hospital never match.
pub fn filter_by_hospital<'a>(
    appointments: &'a [Appointment],
    hospital_id: &'a str,
) -> impl Iterator<Item = &'a Appointment> + 'a {
    appointments
        .iter()
        .filter(move |a| a.hospital_id().as_deref() == Some(hospital_id))
}

/// Splits appointments into upcoming (earliest first) and past (latest
/// first). Records whose date or time cannot be read are counted in
/// `skipped` and left out of both lists.
pub fn classify_appointments(
    appointments: &[Appointment],
    hospital_id: Option<&str>,
    now: NaiveDateTime,
) -> AppointmentClassification {
    let mut upcoming: Vec<(NaiveDateTime, Appointment)> = Vec::new();
    let mut past: Vec<(NaiveDateTime, Appointment)> = Vec::new();
    let mut skipped = 0;
    let now = minute_floor(now);

    let scoped: Vec<&Appointment> = match hospital_id {
        Some(hospital_id) => filter_by_hospital(appointments, hospital_id).collect(),
        None => appointments.iter().collect(),
    };

    for appointment in scoped {
        let start = match appointment.scheduled_start() {
            Ok(start) => start,
            Err(e) => {
                warn!("Skipping appointment {}: {}", appointment.appointment_id, e);
                skipped += 1;
                continue;
            }
        };

        if !appointment.is_cancelled() && start >= now {
            upcoming.push((start, appointment.clone()));
        } else {
            past.push((start, appointment.clone()));
        }
    }

    // Stable sorts keep backend order for identical start times.
    upcoming.sort_by_key(|(start, _)| *start);
    past.sort_by_key(|(start, _)| Reverse(*start));

    debug!(
        "Classified {} upcoming, {} past, {} skipped",
        upcoming.len(),
        past.len(),
        skipped
    );

    AppointmentClassification {
        upcoming: upcoming.into_iter().map(|(_, a)| a).collect(),
        past: past.into_iter().map(|(_, a)| a).collect(),
        skipped,
    }
}

fn minute_floor(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_time(truncate_to_minute(now.time()))
}
