use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::ApiClient;
use crate::models::{BulkOutcome, MetricSubmission, Student};

/// Column contract shared by the parser and the downloadable template.
pub const TEMPLATE_HEADERS: [&str; 5] =
    ["Roll Number", "Attendance", "Homework", "Test Score", "Behavior Issue"];

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    #[serde(rename = "Roll Number")]
    pub roll_number: String,
    #[serde(rename = "Attendance", default)]
    pub attendance: Option<f64>,
    #[serde(rename = "Homework", default)]
    pub homework: Option<f64>,
    #[serde(rename = "Test Score", default)]
    pub test_score: Option<f64>,
    #[serde(rename = "Behavior Issue", default)]
    pub behavior: String,
}

// Only the literal "Yes" counts, plus "true" for sheets that carry a typed
// boolean cell. Lowercase "yes" and numeric 1 stay false on purpose.
fn behavior_flag(cell: &str) -> bool {
    matches!(cell.trim(), "Yes" | "true")
}

pub fn read_rows(path: &Path) -> anyhow::Result<Vec<ImportRow>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open spreadsheet {}", path.display()))?;
    parse_rows(reader, &path.display().to_string())
}

fn parse_rows<R: Read>(mut reader: csv::Reader<R>, label: &str) -> anyhow::Result<Vec<ImportRow>> {
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
        // data starts on line 2, after the header row
        let row = result.with_context(|| format!("{label}: row {} is malformed", index + 2))?;
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("{label} contains no data rows");
    }
    Ok(rows)
}

/// Resolve each row's roll number against the full student list and map the
/// matches onto one week's submissions. Unmatched rows are dropped from the
/// batch and logged; a row is never partially included.
pub fn build_batch(
    rows: &[ImportRow],
    students: &[Student],
    week_start: NaiveDate,
) -> anyhow::Result<Vec<MetricSubmission>> {
    let by_roll: HashMap<&str, i64> = students
        .iter()
        .map(|student| (student.roll_number.as_str(), student.id))
        .collect();

    let mut batch = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(&student_id) = by_roll.get(row.roll_number.as_str()) else {
            tracing::warn!(roll_number = %row.roll_number, "no matching student; row skipped");
            continue;
        };
        batch.push(MetricSubmission {
            student_id,
            week_start_date: week_start,
            attendance_score: row.attendance.unwrap_or(0.0),
            homework_submission_rate: row.homework.unwrap_or(0.0),
            test_score_average: row.test_score.unwrap_or(0.0),
            behavior_flag: behavior_flag(&row.behavior),
        });
    }

    if batch.is_empty() {
        bail!("no valid students found in the sheet");
    }
    Ok(batch)
}

/// Parse, resolve and submit a whole sheet as one bulk request. Nothing is
/// sent unless at least one row resolved.
pub async fn run_import(
    api: &ApiClient,
    path: &Path,
    week_start: NaiveDate,
) -> anyhow::Result<BulkOutcome> {
    let rows = read_rows(path)?;
    let students = api
        .list_students()
        .await
        .context("failed to load the student list")?;
    let batch = build_batch(&rows, &students, week_start)?;

    let outcome = api
        .submit_metrics_bulk(&batch)
        .await
        .context("bulk submission failed")?;
    log_row_errors(&outcome);
    Ok(outcome)
}

fn log_row_errors(outcome: &BulkOutcome) {
    for error in &outcome.errors {
        if error.contains("duplicate") || error.contains("already") {
            tracing::warn!(%error, "metric already recorded for that week");
        } else {
            tracing::warn!(%error, "row rejected by the backend");
        }
    }
}

/// Example sheet with the exact headers the parser expects.
pub fn write_template(path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(TEMPLATE_HEADERS)?;
    writer.write_record(["10-A-01", "92", "88", "81", "No"])?;
    writer.write_record(["10-A-02", "85", "100", "74", "Yes"])?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_from(data: &str) -> anyhow::Result<Vec<ImportRow>> {
        parse_rows(csv::Reader::from_reader(data.as_bytes()), "test sheet")
    }

    fn students() -> Vec<Student> {
        vec![
            Student {
                id: 1,
                name: "Avery Lee".to_string(),
                roll_number: "10-A-01".to_string(),
                teacher_id: 7,
            },
            Student {
                id: 2,
                name: "Jules Moreno".to_string(),
                roll_number: "10-A-02".to_string(),
                teacher_id: 9,
            },
        ]
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()
    }

    #[test]
    fn unmatched_rows_are_dropped_from_the_batch() {
        let rows = rows_from(
            "Roll Number,Attendance,Homework,Test Score,Behavior Issue\n\
             10-A-01,90,100,85,No\n\
             UNKNOWN,80,70,60,Yes\n",
        )
        .unwrap();

        let batch = build_batch(&rows, &students(), monday()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].student_id, 1);
        assert_eq!(batch[0].week_start_date, monday());
        assert_eq!(batch[0].attendance_score, 90.0);
        assert!(!batch[0].behavior_flag);
    }

    #[test]
    fn all_unmatched_rows_is_a_hard_failure() {
        let rows = rows_from(
            "Roll Number,Attendance,Homework,Test Score,Behavior Issue\n\
             NOBODY,80,70,60,No\n\
             ALSO-NOBODY,90,80,70,No\n",
        )
        .unwrap();

        let err = build_batch(&rows, &students(), monday()).unwrap_err();
        assert!(err.to_string().contains("no valid students found"));
    }

    #[test]
    fn resolution_is_exact_on_the_full_list() {
        // the student list is not filtered by teacher here
        let rows = rows_from(
            "Roll Number,Attendance,Homework,Test Score,Behavior Issue\n\
             10-A-02,75,50,60,Yes\n\
             10-a-02,75,50,60,Yes\n",
        )
        .unwrap();

        let batch = build_batch(&rows, &students(), monday()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].student_id, 2);
        assert!(batch[0].behavior_flag);
    }

    #[test]
    fn behavior_cell_accepts_only_yes_or_typed_true() {
        assert!(behavior_flag("Yes"));
        assert!(behavior_flag("true"));
        assert!(!behavior_flag("yes"));
        assert!(!behavior_flag("YES"));
        assert!(!behavior_flag("No"));
        assert!(!behavior_flag("1"));
        assert!(!behavior_flag(""));
    }

    #[test]
    fn blank_numeric_cells_default_to_zero() {
        let rows = rows_from(
            "Roll Number,Attendance,Homework,Test Score,Behavior Issue\n\
             10-A-01,,,,\n",
        )
        .unwrap();

        let batch = build_batch(&rows, &students(), monday()).unwrap();
        assert_eq!(batch[0].attendance_score, 0.0);
        assert_eq!(batch[0].homework_submission_rate, 0.0);
        assert_eq!(batch[0].test_score_average, 0.0);
        assert!(!batch[0].behavior_flag);
    }

    #[test]
    fn header_only_sheet_fails_fast() {
        let err = rows_from("Roll Number,Attendance,Homework,Test Score,Behavior Issue\n")
            .unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn malformed_numeric_cell_names_the_row() {
        let err = rows_from(
            "Roll Number,Attendance,Homework,Test Score,Behavior Issue\n\
             10-A-01,ninety,100,85,No\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn template_round_trips_through_the_parser() {
        let dir = std::env::temp_dir().join(format!(
            "edupredict-template-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("weekly-template.csv");

        write_template(&path).unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].roll_number, "10-A-01");
        assert!(!behavior_flag(&rows[0].behavior));
        assert!(behavior_flag(&rows[1].behavior));
    }
}
