// src/models/certification.rs

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::CERT_VALIDITY_MONTHS;

/// Validity window applied to new certifications and guide licenses.
/// End-of-month dates clamp (Feb 29 -> Feb 28) rather than overflow.
pub fn expiry_after_one_year(issued: NaiveDate) -> NaiveDate {
    issued + Months::new(CERT_VALIDITY_MONTHS)
}

/// Represents the 'certifications' table in the database.
/// One row per (guide, module); the automated issuance path never creates
/// a second one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Certification {
    pub cert_id: i64,
    pub guide_id: i64,
    pub module_id: i64,
    pub issued_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// Certification listing entry for the holder, with validity computed
/// against today.
#[derive(Debug, Serialize, FromRow)]
pub struct CertificationEntry {
    pub cert_id: i64,
    pub module_id: i64,
    pub module_name: String,
    pub issued_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expiry_is_one_year_out() {
        assert_eq!(expiry_after_one_year(date(2025, 3, 14)), date(2026, 3, 14));
    }

    #[test]
    fn leap_day_clamps_to_end_of_february() {
        assert_eq!(expiry_after_one_year(date(2024, 2, 29)), date(2025, 2, 28));
    }
}
