//! Tenant-scoped resources and their request payloads.

pub mod attendance;
pub mod class;
pub mod document;
pub mod grade;
pub mod level;
pub mod message;
pub mod room;
pub mod student;
pub mod subject;
pub mod teacher;
pub mod timetable;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use validator::ValidationError;

pub use attendance::{Attendance, AttendanceStatus};
pub use class::Class;
pub use document::{Document, OwnerType};
pub use grade::{AssessmentType, Grade};
pub use level::Level;
pub use message::Message;
pub use room::Room;
pub use student::{Gender, Student, StudentStatus};
pub use subject::Subject;
pub use teacher::{Teacher, TeacherStatus};
pub use timetable::{DayOfWeek, ExceptionKind, Timetable, TimetableException, TimetableSlot};

/// Overwrites `target` when the partial update carries a value.
pub(crate) fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates of nullable columns.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Strips surrounding whitespace before length rules run, so a blank value
/// fails `length(min = 1)`.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

/// Fits a `numeric(6, 2)` column.
pub(crate) fn numeric_6_2(value: &Decimal) -> Result<(), ValidationError> {
    fits_numeric(value, 6, 2)
}

/// Fits a `numeric(8, 2)` column.
pub(crate) fn numeric_8_2(value: &Decimal) -> Result<(), ValidationError> {
    fits_numeric(value, 8, 2)
}

fn fits_numeric(value: &Decimal, precision: u32, scale: u32) -> Result<(), ValidationError> {
    let limit = Decimal::from(10u64.pow(precision - scale));
    if value.abs() < limit && value.normalize().scale() <= scale {
        return Ok(());
    }
    Err(ValidationError::new("numeric_range").with_message(Cow::Owned(format!(
        "Must be below {} with at most {} decimal places",
        limit, scale
    ))))
}

/// Trimmed search term, `None` when blank.
pub(crate) fn search_term(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn nullable_tells_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"note": "x"}"#).unwrap();
        assert_eq!(absent.note, None);
        assert_eq!(null.note, Some(None));
        assert_eq!(set.note, Some(Some("x".to_string())));
    }

    #[derive(Deserialize)]
    struct Named {
        #[serde(deserialize_with = "trimmed")]
        name: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        code: Option<String>,
    }

    #[test]
    fn trimmed_fields_drop_surrounding_whitespace() {
        let named: Named = serde_json::from_str(r#"{"name": "  Grade 1 ", "code": "   "}"#).unwrap();
        assert_eq!(named.name, "Grade 1");
        assert_eq!(named.code.as_deref(), Some(""));

        let absent: Named = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.code, None);
    }

    #[test]
    fn numeric_bounds_follow_column_precision() {
        let ok: Decimal = "9999.99".parse().unwrap();
        let too_big: Decimal = "10000".parse().unwrap();
        let too_fine: Decimal = "1.005".parse().unwrap();
        let padded: Decimal = "1.500".parse().unwrap();
        assert!(numeric_6_2(&ok).is_ok());
        assert!(numeric_6_2(&padded).is_ok());
        assert!(numeric_6_2(&too_big).is_err());
        assert!(numeric_6_2(&too_fine).is_err());
        assert!(numeric_8_2(&too_big).is_ok());
        assert!(numeric_8_2(&Decimal::MAX).is_err());
    }

    #[test]
    fn merge_keeps_value_when_absent() {
        let mut name = "A".to_string();
        merge(&mut name, None);
        assert_eq!(name, "A");
        merge(&mut name, Some("B".to_string()));
        assert_eq!(name, "B");
    }
}
