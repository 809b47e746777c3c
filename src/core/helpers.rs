use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::rngs::OsRng;
use serde::Serialize;
use spin_sdk::http::Response;
use uuid::Uuid;

use crate::core::errors::ApiError;

#[cfg(target_arch = "wasm32")]
pub fn store() -> anyhow::Result<spin_sdk::key_value::Store> {
    Ok(spin_sdk::key_value::Store::open_default()?)
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> Result<Response, ApiError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}

pub fn message_response(status: u16, message: &str) -> Result<Response, ApiError> {
    json_response(status, &serde_json::json!({ "message": message }))
}

/// Render a timestamp as `October 18th 2026, 3:04:05 pm`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    let (is_pm, hour) = date.hour12();
    format!(
        "{} {}{} {}, {}:{:02}:{:02} {}",
        date.format("%B"),
        day,
        suffix,
        date.year(),
        hour,
        date.minute(),
        date.second(),
        if is_pm { "pm" } else { "am" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn dates_use_ordinal_days_and_twelve_hour_clock() {
        let date = Utc.with_ymd_and_hms(2022, 11, 1, 15, 4, 5).unwrap();
        assert_eq!(format_date(&date), "November 1st 2022, 3:04:05 pm");

        let date = Utc.with_ymd_and_hms(2022, 3, 12, 0, 30, 0).unwrap();
        assert_eq!(format_date(&date), "March 12th 2022, 12:30:00 am");

        let date = Utc.with_ymd_and_hms(2022, 3, 23, 12, 0, 9).unwrap();
        assert_eq!(format_date(&date), "March 23rd 2022, 12:00:09 pm");
    }

    #[test]
    fn ids_are_uuids() {
        assert!(validate_uuid(&new_id()));
        assert!(!validate_uuid("bob"));
    }
}
