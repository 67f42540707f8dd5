//! Tabular exports of tenant data as CSV or SpreadsheetML (Excel 2003 XML).

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{SelectQuery, Store};
use crate::models::attendance::AttendanceFilter;
use crate::models::grade::GradeFilter;
use crate::models::student::StudentFilter;
use crate::models::{Attendance, Grade, Student, Subject};
use crate::services::entity::EntityService;
use crate::services::error::ServiceResult;
use crate::tenant::TenantScope;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "CSV", alias = "csv")]
    Csv,
    #[serde(rename = "EXCEL", alias = "excel", alias = "XLS", alias = "xls")]
    Excel,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => "application/vnd.ms-excel",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xls",
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// A rendered export ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ExportFile {
    pub fn render(table: &Table, format: ExportFormat, on: NaiveDate) -> Self {
        let body = match format {
            ExportFormat::Csv => render_csv(table),
            ExportFormat::Excel => render_spreadsheet_ml(table),
        };
        Self {
            filename: format!("{}-{}.{}", table.title, on.format("%Y-%m-%d"), format.extension()),
            content_type: format.content_type(),
            body: body.into_bytes(),
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub async fn students_table(store: Arc<dyn Store>, scope: &TenantScope, filter: &StudentFilter) -> ServiceResult<Table> {
    let students = EntityService::<Student>::new(store).list_all(scope, filter).await?;
    let rows = students
        .into_iter()
        .map(|s| {
            vec![
                s.student_number,
                s.first_name,
                s.last_name,
                opt(s.date_of_birth),
                s.gender.map(|g| label(&g)).unwrap_or_default(),
                s.email.unwrap_or_default(),
                opt(s.class_id),
                s.enrollment_date.to_string(),
                label(&s.status),
            ]
        })
        .collect();

    Ok(Table {
        title: "students",
        headers: vec![
            "Student Number",
            "First Name",
            "Last Name",
            "Date of Birth",
            "Gender",
            "Email",
            "Class",
            "Enrollment Date",
            "Status",
        ],
        rows,
    })
}

pub async fn grades_table(store: Arc<dyn Store>, scope: &TenantScope, filter: &GradeFilter) -> ServiceResult<Table> {
    let grades = EntityService::<Grade>::new(store.clone()).list_all(scope, filter).await?;
    let students = student_names(store.clone(), scope).await?;
    let subjects: HashMap<Uuid, String> = EntityService::<Subject>::new(store)
        .select(scope, &SelectQuery::default())
        .await?
        .into_iter()
        .map(|s| (s.id, s.code))
        .collect();

    let rows = grades
        .into_iter()
        .map(|g| {
            vec![
                name_of(&students, g.student_id),
                subjects.get(&g.subject_id).cloned().unwrap_or_else(|| g.subject_id.to_string()),
                g.term.clone(),
                label(&g.assessment_type),
                g.score.to_string(),
                g.max_score.to_string(),
                g.percent().round_dp(2).to_string(),
                g.assessed_on.to_string(),
                g.comment.unwrap_or_default(),
            ]
        })
        .collect();

    Ok(Table {
        title: "grades",
        headers: vec!["Student", "Subject", "Term", "Assessment", "Score", "Max Score", "Percent", "Date", "Comment"],
        rows,
    })
}

pub async fn attendance_table(
    store: Arc<dyn Store>,
    scope: &TenantScope,
    filter: &AttendanceFilter,
) -> ServiceResult<Table> {
    let records = EntityService::<Attendance>::new(store.clone()).list_all(scope, filter).await?;
    let students = student_names(store, scope).await?;

    let rows = records
        .into_iter()
        .map(|a| {
            vec![
                a.date.to_string(),
                name_of(&students, a.student_id),
                a.class_id.to_string(),
                label(&a.status),
                a.note.unwrap_or_default(),
            ]
        })
        .collect();

    Ok(Table {
        title: "attendance",
        headers: vec!["Date", "Student", "Class", "Status", "Note"],
        rows,
    })
}

pub fn render_csv(table: &Table) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, table.headers.iter().copied());
    for row in &table.rows {
        push_csv_line(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = cells.map(csv_cell).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_spreadsheet_ml(table: &Table) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <?mso-application progid=\"Excel.Sheet\"?>\n\
         <Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\" \
         xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n",
    );
    out.push_str(&format!(" <Worksheet ss:Name=\"{}\">\n  <Table>\n", xml_escape(table.title)));
    push_xml_row(&mut out, table.headers.iter().copied());
    for row in &table.rows {
        push_xml_row(&mut out, row.iter().map(String::as_str));
    }
    out.push_str("  </Table>\n </Worksheet>\n</Workbook>\n");
    out
}

fn push_xml_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push_str("   <Row>");
    for cell in cells {
        out.push_str(&format!("<Cell><Data ss:Type=\"String\">{}</Data></Cell>", xml_escape(cell)));
    }
    out.push_str("</Row>\n");
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

async fn student_names(store: Arc<dyn Store>, scope: &TenantScope) -> ServiceResult<HashMap<Uuid, String>> {
    Ok(EntityService::<Student>::new(store)
        .select(scope, &SelectQuery::default())
        .await?
        .into_iter()
        .map(|s| (s.id, s.full_name()))
        .collect())
}

fn name_of(names: &HashMap<Uuid, String>, id: Uuid) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Wire name of a unit enum variant (`PRESENT`, `FEMALE`, ...).
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Today's date for export filenames.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;

    fn table() -> Table {
        Table {
            title: "students",
            headers: vec!["Name", "Note"],
            rows: vec![
                vec!["Ada".into(), "plain".into()],
                vec!["Smith, John".into(), "said \"hi\"\nthen left".into()],
            ],
        }
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let csv = render_csv(&table());
        assert_eq!(
            csv,
            "Name,Note\r\nAda,plain\r\n\"Smith, John\",\"said \"\"hi\"\"\nthen left\"\r\n"
        );
    }

    #[test]
    fn spreadsheet_ml_escapes_markup() {
        let mut t = table();
        t.rows.push(vec!["<b>".into(), "R&D".into()]);
        let xml = render_spreadsheet_ml(&t);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Worksheet ss:Name=\"students\">"));
        assert!(xml.contains("<Data ss:Type=\"String\">&lt;b&gt;</Data>"));
        assert!(xml.contains("R&amp;D"));
        assert_eq!(xml.matches("<Row>").count(), 4);
    }

    #[test]
    fn file_naming_and_headers() {
        let on = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let file = ExportFile::render(&table(), ExportFormat::Excel, on);
        assert_eq!(file.filename, "students-2024-09-02.xls");
        assert_eq!(file.content_type, "application/vnd.ms-excel");
        assert_eq!(file.content_disposition(), "attachment; filename=\"students-2024-09-02.xls\"");
    }

    #[test]
    fn format_accepts_either_case() {
        let p: ExportParams = serde_json::from_value(serde_json::json!({"format": "excel"})).unwrap();
        assert_eq!(p.format, ExportFormat::Excel);
        let p: ExportParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(p.format, ExportFormat::Csv);
        assert!(serde_json::from_value::<ExportParams>(serde_json::json!({"format": "PDF"})).is_err());
    }

    #[test]
    fn enum_labels_use_wire_names() {
        assert_eq!(label(&AttendanceStatus::Present), "PRESENT");
    }
}
