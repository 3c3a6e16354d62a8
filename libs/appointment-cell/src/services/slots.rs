// libs/appointment-cell/src/services/slots.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use session_cell::Session;
use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{RawSlot, Slot, SlotFetch, DATE_FORMAT};

#[derive(Debug, Deserialize)]
struct SlotsResponse {
    #[serde(default)]
    slots: Vec<Value>,
}

pub struct SlotService {
    api: Arc<ApiClient>,
    default_slot_length: Duration,
}

impl SlotService {
    pub fn new(api: Arc<ApiClient>, config: &AppConfig) -> Self {
        Self {
            api,
            default_slot_length: Duration::minutes(i64::from(config.default_slot_duration_minutes)),
        }
    }

    /// Slots the backend reports as open for `doctor_id` on `date`, in
    /// backend order. Never fails: errors come back as a notice alongside an
    /// empty list.
    #[instrument(skip(self, session))]
    pub async fn fetch_slots(&self, session: &Session, doctor_id: &str, date: NaiveDate) -> SlotFetch {
        if doctor_id.trim().is_empty() {
            debug!("No doctor selected, skipping slot lookup");
            return SlotFetch::default();
        }

        let date_param = date.format(DATE_FORMAT).to_string();
        let result = self
            .api
            .get::<SlotsResponse>(
                "/api/patient-appointments/available-slots",
                session.bearer_token(),
                &[("doctorId", doctor_id), ("date", &date_param)],
            )
            .await;

        match result {
            Ok(response) => {
                let slots = decode_slots(response.slots, self.default_slot_length);
                debug!("Backend offered {} slots for {} on {}", slots.len(), doctor_id, date_param);
                SlotFetch::ok(slots)
            }
            Err(e) => {
                warn!("Slot lookup for {} on {} failed: {}", doctor_id, date_param, e);
                SlotFetch::failed(AppError::from(e))
            }
        }
    }

    /// Fetch, then drop what a patient can no longer take at `now`.
    pub async fn available_slots(
        &self,
        session: &Session,
        doctor_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> SlotFetch {
        let mut fetch = self.fetch_slots(session, doctor_id, date).await;
        fetch.slots = filter_slots(&fetch.slots, date, now);
        fetch
    }
}

/// Decodes slot records one by one, skipping any that are malformed.
pub fn decode_slots(records: Vec<Value>, default_length: Duration) -> Vec<Slot> {
    records
        .into_iter()
        .filter_map(|record| {
            let raw = match serde_json::from_value::<RawSlot>(record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping unreadable slot record: {}", e);
                    return None;
                }
            };
            match Slot::from_raw(raw, default_length) {
                Ok(slot) => Some(slot),
                Err(e) => {
                    warn!("Skipping slot: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Removes duplicate `(start, end)` pairs, keeping first occurrences in
/// order, and on the current day drops slots starting before `now`.
/// Comparison is at minute precision.
pub fn filter_slots(slots: &[Slot], date: NaiveDate, now: NaiveDateTime) -> Vec<Slot> {
    let cutoff = (date == now.date()).then(|| truncate_to_minute(now.time()));
    let mut seen = HashSet::new();

    slots
        .iter()
        .copied()
        .filter(|slot| cutoff.map_or(true, |cutoff| slot.start() >= cutoff))
        .filter(|slot| seen.insert(slot.key()))
        .collect()
}

pub(crate) fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(start: &str, end: &str) -> Slot {
        Slot::parse(start, end).unwrap()
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let slots = vec![
            slot("10:00", "10:30"),
            slot("09:00", "09:30"),
            slot("10:00", "10:30"),
            slot("09:30", "10:00"),
        ];
        let filtered = filter_slots(&slots, day("2030-01-02"), at("2030-01-01", "12:00:00"));
        assert_eq!(
            filtered,
            vec![slot("10:00", "10:30"), slot("09:00", "09:30"), slot("09:30", "10:00")]
        );
    }

    #[test]
    fn test_repeated_pair_collapses_without_reordering() {
        let slots = vec![slot("09:00", "09:30"), slot("10:00", "10:30"), slot("09:00", "09:30")];
        let filtered = filter_slots(&slots, day("2030-01-02"), at("2030-01-01", "12:00:00"));
        assert_eq!(filtered, vec![slot("09:00", "09:30"), slot("10:00", "10:30")]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let slots = vec![
            slot("08:00", "08:30"),
            slot("08:00", "08:30"),
            slot("11:00", "11:30"),
            slot("09:00", "09:30"),
        ];
        let now = at("2030-01-01", "08:45:00");
        let once = filter_slots(&slots, day("2030-01-01"), now);
        let twice = filter_slots(&once, day("2030-01-01"), now);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_same_pair_different_end_is_distinct() {
        let slots = vec![slot("09:00", "09:30"), slot("09:00", "09:15")];
        let filtered = filter_slots(&slots, day("2030-01-02"), at("2030-01-01", "12:00:00"));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_today_drops_started_slots() {
        let slots = vec![
            slot("08:00", "08:30"),
            slot("09:00", "09:30"),
            slot("09:30", "10:00"),
        ];
        let now = at("2030-01-01", "09:00:00");
        let filtered = filter_slots(&slots, day("2030-01-01"), now);
        assert_eq!(filtered, vec![slot("09:00", "09:30"), slot("09:30", "10:00")]);
        assert!(filtered.iter().all(|s| s.start() >= now.time()));
    }

    #[test]
    fn test_seconds_do_not_hide_current_minute() {
        let slots = vec![slot("09:00", "09:30")];
        let filtered = filter_slots(&slots, day("2030-01-01"), at("2030-01-01", "09:00:45"));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_other_days_are_not_time_filtered() {
        let slots = vec![slot("06:00", "06:30")];
        let later = filter_slots(&slots, day("2030-01-05"), at("2030-01-01", "23:00:00"));
        assert_eq!(later.len(), 1);
    }

    #[test]
    fn test_decode_skips_malformed_and_fills_missing_end() {
        let records = vec![
            json!({ "start": "09:00", "end": "09:30" }),
            json!({ "start": "nine", "end": "09:30" }),
            json!({ "start": "10:00", "end": "09:00" }),
            json!({ "start": "11:00" }),
            json!("09:00"),
        ];
        let slots = decode_slots(records, Duration::minutes(30));
        assert_eq!(slots, vec![slot("09:00", "09:30"), slot("11:00", "11:30")]);
    }

    #[test]
    fn test_decode_rejects_slot_running_past_midnight() {
        let slots = decode_slots(vec![json!({ "start": "23:45" })], Duration::minutes(30));
        assert!(slots.is_empty());
    }
}
