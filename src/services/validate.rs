use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use validator::ValidationError;

use crate::error::{AppError, AppResult};
use crate::services::checkin_stats::DATE_FORMAT;

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("phone pattern"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern"))
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_re().is_match(phone)
}

/// `validator` hook for mainland mobile numbers.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Invalid phone number format".into());
        Err(err)
    }
}

/// Accepts only real calendar dates written as `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if !date_re().is_match(raw) {
        return Err(AppError::Validation("Date must be in YYYY-MM-DD format".into()));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("{raw} is not a valid date")))
}

/// `13812345678` → `138****5678`, for logs.
pub fn mask_phone(phone: &str) -> String {
    if phone.len() == 11 && phone.is_ascii() {
        format!("{}****{}", &phone[..3], &phone[7..])
    } else {
        "***".to_string()
    }
}
