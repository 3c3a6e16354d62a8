// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use shared_api::ApiError;
use shared_models::error::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const NO_SLOTS_MESSAGE: &str = "No available slots";

// ==============================================================================
// DATE / TIME PARSING
// ==============================================================================

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    let raw = raw.trim();
    // Accept full timestamps by reading only the calendar part.
    let calendar = match raw.get(..10) {
        Some(prefix) if raw.len() > 10 && raw[10..].starts_with('T') => prefix,
        _ => raw,
    };
    NaiveDate::parse_from_str(calendar, DATE_FORMAT)
        .map_err(|_| AppointmentError::InvalidDate(raw.to_string()))
}

pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, AppointmentError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppointmentError::InvalidTime(raw.to_string()))
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A bookable interval on one day. Identity is the `(start, end)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSlot", into = "RawSlot")]
pub struct Slot {
    start: NaiveTime,
    end: NaiveTime,
}

impl Slot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AppointmentError> {
        if start >= end {
            return Err(AppointmentError::InvalidSlot {
                start: start.format(TIME_FORMAT).to_string(),
                end: end.format(TIME_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, AppointmentError> {
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }

    /// Builds a slot from a backend record. Records without an `end` take the
    /// clinic's default slot length.
    pub fn from_raw(raw: RawSlot, default_length: Duration) -> Result<Self, AppointmentError> {
        let start = parse_time_of_day(&raw.start)?;
        let end = match raw.end.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(end) => parse_time_of_day(end)?,
            None => start + default_length,
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn key(&self) -> (NaiveTime, NaiveTime) {
        (self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// `HH:MM - HH:MM`, the shape appointments store in their `time` field.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSlot {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

impl TryFrom<RawSlot> for Slot {
    type Error = AppointmentError;

    fn try_from(raw: RawSlot) -> Result<Self, Self::Error> {
        let end = raw
            .end
            .ok_or_else(|| AppointmentError::InvalidTime("missing slot end".to_string()))?;
        Slot::parse(&raw.start, &end)
    }
}

impl From<Slot> for RawSlot {
    fn from(slot: Slot) -> Self {
        RawSlot {
            start: slot.start.format(TIME_FORMAT).to_string(),
            end: Some(slot.end.format(TIME_FORMAT).to_string()),
        }
    }
}

/// Result of a slot lookup. Transport or decode failures do not propagate:
/// they leave `slots` empty and set `notice`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotFetch {
    pub slots: Vec<Slot>,
    pub notice: Option<AppError>,
}

impl SlotFetch {
    pub fn ok(slots: Vec<Slot>) -> Self {
        Self { slots, notice: None }
    }

    pub fn failed(notice: AppError) -> Self {
        Self {
            slots: Vec::new(),
            notice: Some(notice),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn find(&self, start: NaiveTime, end: Option<NaiveTime>) -> Option<Slot> {
        self.slots
            .iter()
            .copied()
            .find(|s| s.start() == start && end.map_or(true, |e| s.end() == e))
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
    Other(String),
}

impl AppointmentStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }
}

impl From<Option<String>> for AppointmentStatus {
    fn from(raw: Option<String>) -> Self {
        let normalized = raw.unwrap_or_default().trim().to_lowercase();
        match normalized.as_str() {
            "" | "scheduled" => AppointmentStatus::Scheduled,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Other(normalized),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// The client's cached copy of a backend appointment. Date and time stay as
/// received so a malformed record can be skipped later instead of failing
/// the whole list at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AppointmentRecord")]
pub struct Appointment {
    pub appointment_id: String,
    pub doctor_id: Option<String>,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub session_type: String,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "hospitalId", skip_serializing_if = "Option::is_none")]
    pub hospital_id_camel: Option<Value>,
    #[serde(rename = "hospital_id", skip_serializing_if = "Option::is_none")]
    pub hospital_id_snake: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<Value>,
}

/// Wire shape of an appointment. Stored records carry `_id` next to
/// `appointmentId`, so every id field is read separately.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentRecord {
    #[serde(default)]
    appointment_id: Option<Value>,
    #[serde(rename = "_id", default)]
    object_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, deserialize_with = "optional_id")]
    doctor_id: Option<String>,
    #[serde(default)]
    doctor_name: Option<String>,
    date: String,
    time: String,
    #[serde(default)]
    session_type: Option<String>,
    #[serde(default)]
    appointment_type: Option<String>,
    #[serde(default)]
    status: AppointmentStatus,
    #[serde(default)]
    reason: Option<String>,
    #[serde(rename = "hospitalId", default)]
    hospital_id_camel: Option<Value>,
    #[serde(rename = "hospital_id", default)]
    hospital_id_snake: Option<Value>,
    #[serde(default)]
    hospital: Option<Value>,
}

impl TryFrom<AppointmentRecord> for Appointment {
    type Error = AppointmentError;

    /// Id resolution order: `appointmentId`, `_id`, `id`. Empty values fall
    /// through to the next field.
    fn try_from(record: AppointmentRecord) -> Result<Self, Self::Error> {
        let appointment_id = [&record.appointment_id, &record.object_id, &record.id]
            .into_iter()
            .find_map(|candidate| candidate.as_ref().and_then(id_from_value))
            .ok_or_else(|| AppointmentError::ValidationError("appointment record has no id".to_string()))?;

        Ok(Appointment {
            appointment_id,
            doctor_id: record.doctor_id,
            doctor_name: record.doctor_name.unwrap_or_default(),
            date: record.date,
            time: record.time,
            session_type: record.session_type.unwrap_or_default(),
            appointment_type: record.appointment_type.unwrap_or_default(),
            status: record.status,
            reason: record.reason,
            hospital_id_camel: record.hospital_id_camel,
            hospital_id_snake: record.hospital_id_snake,
            hospital: record.hospital,
        })
    }
}

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    pub fn parsed_date(&self) -> Result<NaiveDate, AppointmentError> {
        parse_date(&self.date)
    }

    /// Start of the `HH:MM - HH:MM` range. Only the start takes part in
    /// classification.
    pub fn start_time(&self) -> Result<NaiveTime, AppointmentError> {
        let start = self
            .time
            .split('-')
            .next()
            .ok_or_else(|| AppointmentError::InvalidTime(self.time.clone()))?;
        parse_time_of_day(start)
    }

    pub fn scheduled_start(&self) -> Result<NaiveDateTime, AppointmentError> {
        Ok(self.parsed_date()?.and_time(self.start_time()?))
    }

    pub fn slot(&self) -> Result<Slot, AppointmentError> {
        let mut parts = self.time.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None) => Slot::parse(start, end),
            _ => Err(AppointmentError::InvalidTime(self.time.clone())),
        }
    }

    /// The hospital this appointment belongs to. Resolution order:
    /// `hospitalId`, `hospital_id`, `hospital.hospital_id`, `hospital._id`.
    pub fn hospital_id(&self) -> Option<String> {
        let nested = |field: &str| {
            self.hospital
                .as_ref()
                .and_then(|h| h.get(field))
                .and_then(id_from_value)
        };

        self.hospital_id_camel
            .as_ref()
            .and_then(id_from_value)
            .or_else(|| self.hospital_id_snake.as_ref().and_then(id_from_value))
            .or_else(|| nested("hospital_id"))
            .or_else(|| nested("_id"))
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("_id").and_then(id_from_value),
        _ => None,
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(id_from_value))
}

/// Appointments split relative to "now".
#[derive(Debug, Clone, Default)]
pub struct AppointmentClassification {
    /// Not cancelled and at or after now, earliest first.
    pub upcoming: Vec<Appointment>,
    /// Everything else, latest first. Cancelled entries stay here.
    pub past: Vec<Appointment>,
    /// Records dropped because their date or time could not be read.
    pub skipped: usize,
}

impl AppointmentClassification {
    pub fn upcoming_count(&self) -> usize {
        self.upcoming.len()
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &Appointment> {
        self.past.iter().filter(|a| a.is_cancelled())
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Consultation,
    FollowUp,
    Therapy,
    CheckUp,
}

impl SessionType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            SessionType::Consultation => "consultation",
            SessionType::FollowUp => "follow-up",
            SessionType::Therapy => "therapy",
            SessionType::CheckUp => "check-up",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Consultation => write!(f, "Consultation"),
            SessionType::FollowUp => write!(f, "Follow-up"),
            SessionType::Therapy => write!(f, "Therapy"),
            SessionType::CheckUp => write!(f, "Check-up"),
        }
    }
}

impl FromStr for SessionType {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "consultation" => Ok(SessionType::Consultation),
            "follow-up" | "followup" => Ok(SessionType::FollowUp),
            "therapy" => Ok(SessionType::Therapy),
            "check-up" | "checkup" => Ok(SessionType::CheckUp),
            _ => Err(AppointmentError::ValidationError(format!(
                "Unknown session type: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentType {
    Manual,
    Virtual,
}

impl AppointmentType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            AppointmentType::Manual => "manual",
            AppointmentType::Virtual => "virtual",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Manual => write!(f, "Manual"),
            AppointmentType::Virtual => write!(f, "Virtual"),
        }
    }
}

impl FromStr for AppointmentType {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" | "in-person" => Ok(AppointmentType::Manual),
            "virtual" => Ok(AppointmentType::Virtual),
            _ => Err(AppointmentError::ValidationError(format!(
                "Unknown appointment type: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub slot: Slot,
    pub session_type: SessionType,
    pub appointment_type: AppointmentType,
    pub reason: String,
}

/// What a book, reschedule or cancel submission came back with.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    /// The backend accepted; merge this into the local cache by id.
    Confirmed(Appointment),
    /// The slot was taken by someone else first. Re-fetch slots and ask the
    /// patient to choose again. Nothing is merged.
    Conflict { message: String },
    Failed(AppError),
}

impl BookingOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingOutcome::Conflict { .. })
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        match self {
            BookingOutcome::Confirmed(appointment) => Some(appointment),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            BookingOutcome::Confirmed(_) => "Appointment saved".to_string(),
            BookingOutcome::Conflict { .. } => {
                AppError::Conflict(String::new()).user_message()
            }
            BookingOutcome::Failed(error) => error.user_message(),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Invalid appointment date: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Invalid slot {start} - {end}: start must be before end")]
    InvalidSlot { start: String, end: String },

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(id) => AppError::NotFound(format!("Appointment {} not found", id)),
            AppointmentError::InvalidStatusTransition(status) => AppError::ValidationError(format!(
                "A {} appointment cannot be changed",
                status
            )),
            AppointmentError::Api(e) => e.into(),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}
