//! Rental term scheduling

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Rental billing plan. Anything that is not weekly is billed daily.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "rental_plan", rename_all = "lowercase")]
pub enum RentalPlan {
    Weekly,
    #[default]
    #[serde(other)]
    Daily,
}

impl RentalPlan {
    fn days_per_unit(&self) -> u64 {
        match self {
            RentalPlan::Daily => 1,
            RentalPlan::Weekly => 7,
        }
    }
}

/// Normalize a requested rental duration: missing, NaN or anything below one unit
/// books a single unit, fractions are floored.
pub fn normalize_duration(requested: Option<f64>) -> u32 {
    match requested {
        Some(units) if units.is_finite() && units >= 1.0 => units.floor() as u32,
        Some(units) if units == f64::INFINITY => u32::MAX,
        _ => 1,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Accept a duration as a number or numeric string. Anything else reads as missing.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawDuration>::deserialize(deserializer)? {
        Some(RawDuration::Number(units)) => Some(units),
        Some(RawDuration::Text(text)) => text.trim().parse().ok(),
        Some(RawDuration::Other(_)) | None => None,
    })
}

/// Compute when a rental booked on `booking_date` expires.
pub fn rental_expiry(booking_date: NaiveDate, plan: RentalPlan, duration: Option<f64>) -> NaiveDate {
    let days = u64::from(normalize_duration(duration)) * plan.days_per_unit();
    booking_date
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_weekly_two_weeks() {
        let expiry = rental_expiry(jan_first(), RentalPlan::Weekly, Some(2.0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_daily_three_days() {
        let expiry = rental_expiry(jan_first(), RentalPlan::Daily, Some(3.0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn test_zero_duration_books_one_unit() {
        let expiry = rental_expiry(jan_first(), RentalPlan::Weekly, Some(0.0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }

    #[derive(Deserialize)]
    struct Booking {
        #[serde(default, deserialize_with = "deserialize_duration")]
        duration: Option<f64>,
    }

    fn parse_duration(json: &str) -> Option<f64> {
        serde_json::from_str::<Booking>(json).unwrap().duration
    }

    #[test]
    fn test_duration_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_duration(r#"{"duration": 3}"#), Some(3.0));
        assert_eq!(parse_duration(r#"{"duration": "3"}"#), Some(3.0));
        assert_eq!(parse_duration(r#"{"duration": " 2.5 "}"#), Some(2.5));
    }

    #[test]
    fn test_malformed_duration_reads_as_missing() {
        assert_eq!(parse_duration(r#"{"duration": "abc"}"#), None);
        assert_eq!(parse_duration(r#"{"duration": true}"#), None);
        assert_eq!(parse_duration(r#"{"duration": [1]}"#), None);
        assert_eq!(parse_duration(r#"{"duration": null}"#), None);
        assert_eq!(parse_duration("{}"), None);
        assert_eq!(normalize_duration(parse_duration(r#"{"duration": "abc"}"#)), 1);
    }

    #[test]
    fn test_duration_normalization() {
        assert_eq!(normalize_duration(None), 1);
        assert_eq!(normalize_duration(Some(f64::NAN)), 1);
        assert_eq!(normalize_duration(Some(-4.0)), 1);
        assert_eq!(normalize_duration(Some(0.7)), 1);
        assert_eq!(normalize_duration(Some(3.9)), 3);
    }

    #[test]
    fn test_expiry_crosses_month_and_leap_day() {
        let booking = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let expiry = rental_expiry(booking, RentalPlan::Daily, Some(3.0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_huge_duration_saturates() {
        let expiry = rental_expiry(jan_first(), RentalPlan::Weekly, Some(f64::INFINITY));
        assert_eq!(expiry, NaiveDate::MAX);
    }

    #[test]
    fn test_unknown_plan_is_daily() {
        let plan: RentalPlan = serde_json::from_str("\"Monthly\"").unwrap();
        assert_eq!(plan, RentalPlan::Daily);
        let plan: RentalPlan = serde_json::from_str("\"Weekly\"").unwrap();
        assert_eq!(plan, RentalPlan::Weekly);
    }
}
