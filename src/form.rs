use std::fmt;
use std::io::{self, Write};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::ValueEnum;

use crate::api::{ApiClient, ApiError};
use crate::models::{MetricSubmission, Student};
use crate::roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HomeworkStatus {
    #[default]
    Completed,
    Partial,
    Missing,
}

impl HomeworkStatus {
    /// Fixed three-point scale, not a raw percentage field.
    pub fn submission_rate(self) -> f64 {
        match self {
            HomeworkStatus::Completed => 100.0,
            HomeworkStatus::Partial => 50.0,
            HomeworkStatus::Missing => 0.0,
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeworkStatus::Completed => write!(f, "completed"),
            HomeworkStatus::Partial => write!(f, "partial"),
            HomeworkStatus::Missing => write!(f, "missing"),
        }
    }
}

/// One manual weekly update. Score fields are optional so a submitted form
/// can be cleared for the next entry while the student and week stick.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricForm {
    pub student_id: Option<i64>,
    pub week_start_date: NaiveDate,
    pub attendance: Option<f64>,
    pub assignment_score: Option<f64>,
    pub homework_status: HomeworkStatus,
    pub behavior_issue: bool,
}

impl MetricForm {
    pub fn new(week_start_date: NaiveDate) -> Self {
        Self {
            student_id: None,
            week_start_date,
            attendance: None,
            assignment_score: None,
            homework_status: HomeworkStatus::default(),
            behavior_issue: false,
        }
    }

    pub fn to_submission(&self) -> anyhow::Result<MetricSubmission> {
        let student_id = self.student_id.context("choose a student")?;
        let attendance = self.attendance.context("attendance is required")?;
        let assignment = self.assignment_score.context("assignment score is required")?;
        Ok(MetricSubmission {
            student_id,
            week_start_date: self.week_start_date,
            attendance_score: attendance,
            homework_submission_rate: self.homework_status.submission_rate(),
            test_score_average: assignment,
            behavior_flag: self.behavior_issue,
        })
    }

    /// After a successful submit the scores reset but the selected student
    /// and week stay put for rapid repeated entry.
    pub fn clear_scores(&mut self) {
        self.attendance = None;
        self.assignment_score = None;
        self.behavior_issue = false;
    }
}

/// Submit one form. Backend detail text is surfaced verbatim; transport
/// failures collapse to the generic retry message.
pub async fn submit(api: &ApiClient, form: &MetricForm) -> anyhow::Result<()> {
    let submission = form.to_submission()?;
    match api.submit_metric(&submission).await {
        Ok(()) => Ok(()),
        Err(ApiError::Backend { detail, .. }) => bail!("{detail}"),
        Err(err) => {
            tracing::error!(error = %err, "metric submission failed");
            bail!("Failed to submit update. Please try again.");
        }
    }
}

/// Prompt-driven entry loop over the teacher's own students.
pub async fn run_interactive(api: &ApiClient, teacher_id: i64, week: NaiveDate) -> anyhow::Result<()> {
    let students = roster::assigned_to(
        api.list_students()
            .await
            .context("failed to load the student list")?,
        teacher_id,
    );
    if students.is_empty() {
        bail!("no students are assigned to you");
    }

    println!("Students:");
    for student in &students {
        println!("  {:>4}  {} ({})", student.id, student.name, student.roll_number);
    }
    println!();

    let mut form = MetricForm::new(week);
    loop {
        form.student_id = Some(prompt_student(&students, form.student_id)?);
        form.week_start_date = prompt_date("Week start", form.week_start_date)?;
        form.attendance = Some(prompt_score("Attendance %", form.attendance)?);
        form.assignment_score = Some(prompt_score("Assignment score %", form.assignment_score)?);
        form.homework_status = prompt_status(form.homework_status)?;
        form.behavior_issue = prompt_yes_no("Behavioral issue this week?", form.behavior_issue)?;

        match submit(api, &form).await {
            Ok(()) => {
                println!("Weekly update submitted. Risk analysis refreshed.");
                form.clear_scores();
            }
            Err(err) => println!("{err}"),
        }

        if !prompt_yes_no("Add another update?", false)? {
            break;
        }
    }
    Ok(())
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    io::stdout().flush().context("failed to flush prompt")?;
    let mut input = String::new();
    let bytes = io::stdin()
        .read_line(&mut input)
        .context("failed to read input")?;
    if bytes == 0 {
        bail!("input stream closed");
    }
    Ok(input.trim().to_string())
}

fn prompt_student(students: &[Student], current: Option<i64>) -> anyhow::Result<i64> {
    loop {
        let hint = current.map(|id| format!(" [{id}]")).unwrap_or_default();
        let raw = prompt_line(&format!("Student id{hint}"))?;
        if raw.is_empty() {
            if let Some(id) = current {
                return Ok(id);
            }
            println!("Choose a student from the list above.");
            continue;
        }
        match raw.parse::<i64>() {
            Ok(id) if students.iter().any(|student| student.id == id) => return Ok(id),
            Ok(_) => println!("That id is not in your roster."),
            Err(_) => println!("Enter a numeric student id."),
        }
    }
}

fn prompt_date(label: &str, current: NaiveDate) -> anyhow::Result<NaiveDate> {
    loop {
        let raw = prompt_line(&format!("{label} [{current}]"))?;
        if raw.is_empty() {
            return Ok(current);
        }
        match raw.parse::<NaiveDate>() {
            Ok(date) => return Ok(date),
            Err(_) => println!("Enter a date as YYYY-MM-DD."),
        }
    }
}

fn prompt_score(label: &str, current: Option<f64>) -> anyhow::Result<f64> {
    loop {
        let hint = current.map(|value| format!(" [{value}]")).unwrap_or_default();
        let raw = prompt_line(&format!("{label}{hint}"))?;
        if raw.is_empty() {
            if let Some(value) = current {
                return Ok(value);
            }
            println!("A value is required.");
            continue;
        }
        match raw.parse::<f64>() {
            Ok(value) if (0.0..=100.0).contains(&value) => return Ok(value),
            Ok(_) => println!("Enter a value between 0 and 100."),
            Err(_) => println!("Enter a number."),
        }
    }
}

fn prompt_status(current: HomeworkStatus) -> anyhow::Result<HomeworkStatus> {
    loop {
        let raw = prompt_line(&format!(
            "Homework status (completed/partial/missing) [{current}]"
        ))?;
        if raw.is_empty() {
            return Ok(current);
        }
        match HomeworkStatus::from_str(&raw, true) {
            Ok(status) => return Ok(status),
            Err(_) => println!("Enter completed, partial or missing."),
        }
    }
}

fn prompt_yes_no(label: &str, default: bool) -> anyhow::Result<bool> {
    let hint = if default { "[y]" } else { "[n]" };
    loop {
        let raw = prompt_line(&format!("{label} (y/n) {hint}"))?;
        match raw.to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Enter 'y' or 'n'."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> MetricForm {
        MetricForm {
            student_id: Some(3),
            week_start_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            attendance: Some(85.0),
            assignment_score: Some(78.0),
            homework_status: HomeworkStatus::Partial,
            behavior_issue: true,
        }
    }

    #[test]
    fn partial_homework_maps_to_fifty() {
        let submission = filled_form().to_submission().unwrap();
        assert_eq!(submission.homework_submission_rate, 50.0);
    }

    #[test]
    fn status_scale_is_fixed() {
        assert_eq!(HomeworkStatus::Completed.submission_rate(), 100.0);
        assert_eq!(HomeworkStatus::Partial.submission_rate(), 50.0);
        assert_eq!(HomeworkStatus::Missing.submission_rate(), 0.0);
    }

    #[test]
    fn submission_mirrors_the_form_fields() {
        let submission = filled_form().to_submission().unwrap();
        assert_eq!(submission.student_id, 3);
        assert_eq!(
            submission.week_start_date,
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()
        );
        assert_eq!(submission.attendance_score, 85.0);
        assert_eq!(submission.test_score_average, 78.0);
        assert!(submission.behavior_flag);
    }

    #[test]
    fn clear_scores_retains_student_and_week() {
        let mut form = filled_form();
        form.clear_scores();
        assert_eq!(form.student_id, Some(3));
        assert_eq!(
            form.week_start_date,
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()
        );
        assert_eq!(form.attendance, None);
        assert_eq!(form.assignment_score, None);
        assert!(!form.behavior_issue);
    }

    #[test]
    fn incomplete_form_does_not_build_a_submission() {
        let mut form = filled_form();
        form.clear_scores();
        assert!(form.to_submission().is_err());
    }
}
