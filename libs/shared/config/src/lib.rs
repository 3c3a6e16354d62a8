use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use tracing::warn;

pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_SESSION_STORE_PATH: &str = ".hospital-session.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Offset of the clinic's wall clock from UTC. All "today" and "now"
    /// comparisons happen in this zone, never in the device locale.
    pub clinic_utc_offset_minutes: i32,
    pub default_slot_duration_minutes: u32,
    pub request_timeout_seconds: u64,
    pub session_store_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("API_BASE_URL not set, using empty value");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_env("CLINIC_UTC_OFFSET_MINUTES", 0),
            default_slot_duration_minutes: parse_env(
                "DEFAULT_SLOT_DURATION_MINUTES",
                DEFAULT_SLOT_DURATION_MINUTES,
            ),
            request_timeout_seconds: parse_env(
                "REQUEST_TIMEOUT_SECONDS",
                DEFAULT_REQUEST_TIMEOUT_SECONDS,
            ),
            session_store_path: env::var("SESSION_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_STORE_PATH)),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty() && self.clinic_offset_is_valid()
    }

    fn clinic_offset_is_valid(&self) -> bool {
        self.checked_clinic_offset().is_some()
    }

    fn checked_clinic_offset(&self) -> Option<FixedOffset> {
        self.clinic_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    pub fn clinic_offset(&self) -> FixedOffset {
        self.checked_clinic_offset().unwrap_or_else(|| {
            warn!(
                "CLINIC_UTC_OFFSET_MINUTES={} is out of range, falling back to UTC",
                self.clinic_utc_offset_minutes
            );
            Utc.fix()
        })
    }

    /// Current wall-clock time at the clinic.
    pub fn clinic_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.clinic_offset()).naive_local()
    }
}

fn parse_env<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
