//! Rows travel through the store keyed by API field names (`classId`), while
//! Postgres columns are snake_case (`class_id`).

use serde_json::{Map, Value};

pub fn to_column(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_field(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for c in column.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn row_to_columns(row: &Map<String, Value>) -> Map<String, Value> {
    row.iter().map(|(k, v)| (to_column(k), v.clone())).collect()
}

pub fn columns_to_row(columns: Map<String, Value>) -> Map<String, Value> {
    columns.into_iter().map(|(k, v)| (to_field(&k), v)).collect()
}

/// Column names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_between_field_and_column_names() {
        assert_eq!(to_column("homeroomTeacherId"), "homeroom_teacher_id");
        assert_eq!(to_column("id"), "id");
        assert_eq!(to_field("homeroom_teacher_id"), "homeroomTeacherId");
        assert_eq!(to_field("created_at"), "createdAt");
    }

    #[test]
    fn converts_whole_rows() {
        let row = json!({"studentNumber": "S-1", "classId": null});
        let columns = row_to_columns(row.as_object().unwrap());
        assert!(columns.contains_key("student_number"));
        assert!(columns.contains_key("class_id"));
        let back = columns_to_row(columns);
        assert_eq!(Value::Object(back), row);
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(is_valid_identifier("timetable_slots"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("name\"; DROP TABLE x; --"));
        assert!(!is_valid_identifier(""));
    }
}
