use anyhow::Context;
use chrono::NaiveDate;
use tokio::task::JoinSet;

use crate::api::ApiClient;
use crate::models::{Reasons, RiskLevel, RiskRecord, Student, WeeklyMetric};

/// One roster card: a student plus their latest risk classification and
/// latest weekly metric.
#[derive(Debug, Clone)]
pub struct StudentOverview {
    pub student: Student,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub attendance: f64,
    pub assignment: f64,
    pub reasons: Reasons,
    pub latest_week: Option<NaiveDate>,
    /// Full metric history, latest first.
    pub metrics: Vec<WeeklyMetric>,
}

impl StudentOverview {
    fn from_parts(student: Student, history: Vec<RiskRecord>, metrics: Vec<WeeklyMetric>) -> Self {
        let (risk_level, risk_score, reasons) = match history.first() {
            Some(latest) => (latest.risk_level, latest.risk_score, latest.risk_reasons.clone()),
            None => (RiskLevel::Low, 0.0, Reasons::default()),
        };
        let (attendance, assignment, latest_week) = match metrics.first() {
            Some(latest) => (
                latest.attendance_score,
                latest.homework_submission_rate,
                Some(latest.week_start_date),
            ),
            None => (0.0, 0.0, None),
        };
        StudentOverview {
            student,
            risk_level,
            risk_score,
            attendance,
            assignment,
            reasons,
            latest_week,
            metrics,
        }
    }

    fn fallback(student: Student) -> Self {
        StudentOverview::from_parts(student, Vec::new(), Vec::new())
    }
}

pub fn assigned_to(students: Vec<Student>, teacher_id: i64) -> Vec<Student> {
    students
        .into_iter()
        .filter(|student| student.teacher_id == teacher_id)
        .collect()
}

// The backend claims newest-first ordering on both endpoints; sort anyway so
// a silent reordering cannot corrupt "latest" selection.
pub fn sort_history_latest_first(history: &mut [RiskRecord]) {
    history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn sort_metrics_latest_first(metrics: &mut [WeeklyMetric]) {
    metrics.sort_by(|a, b| b.week_start_date.cmp(&a.week_start_date));
}

/// Fetch the student list, keep the teacher's assignees and enrich each one.
pub async fn fetch_roster(
    api: &ApiClient,
    teacher_id: i64,
) -> anyhow::Result<Vec<StudentOverview>> {
    let students = assigned_to(
        api.list_students()
            .await
            .context("failed to load the student list")?,
        teacher_id,
    );
    Ok(enrich_all(api, students).await)
}

/// Run both per-student lookups for every student concurrently and wait for
/// the whole set to settle. Dropping the JoinSet aborts any lookups still in
/// flight, so an interrupted refresh does not leak requests.
pub async fn enrich_all(api: &ApiClient, students: Vec<Student>) -> Vec<StudentOverview> {
    let mut lookups = JoinSet::new();
    for (slot, student) in students.iter().cloned().enumerate() {
        let api = api.clone();
        lookups.spawn(async move { (slot, enrich(&api, student).await) });
    }

    let mut slots: Vec<Option<StudentOverview>> = students.iter().map(|_| None).collect();
    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((slot, overview)) => slots[slot] = Some(overview),
            Err(err) => tracing::warn!(error = %err, "enrichment task failed"),
        }
    }

    slots
        .into_iter()
        .zip(students)
        .map(|(slot, student)| slot.unwrap_or_else(|| StudentOverview::fallback(student)))
        .collect()
}

/// A failed lookup never aborts the batch; the student falls back to a
/// default record and the failure is logged.
pub async fn enrich(api: &ApiClient, student: Student) -> StudentOverview {
    let (history, metrics) = tokio::join!(
        api.student_history(student.id),
        api.student_metrics(student.id)
    );
    match (history, metrics) {
        (Ok(mut history), Ok(mut metrics)) => {
            sort_history_latest_first(&mut history);
            sort_metrics_latest_first(&mut metrics);
            StudentOverview::from_parts(student, history, metrics)
        }
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(
                student_id = student.id,
                error = %err,
                "enrichment failed; defaulting student record"
            );
            StudentOverview::fallback(student)
        }
    }
}

pub fn filter_by_search(overviews: Vec<StudentOverview>, term: &str) -> Vec<StudentOverview> {
    let needle = term.to_lowercase();
    overviews
        .into_iter()
        .filter(|overview| {
            overview.student.name.to_lowercase().contains(&needle)
                || overview.student.roll_number.to_lowercase().contains(&needle)
        })
        .collect()
}
