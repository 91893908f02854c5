use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::RiskLevel;
use crate::roster::StudentOverview;

const MAX_AT_RISK_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_students: usize,
    pub high_risk_count: usize,
    pub pending_updates: usize,
    pub updates_done_pct: f64,
}

#[derive(Debug, Clone)]
pub struct RiskEntry {
    pub student_id: i64,
    pub name: String,
    pub roll_number: String,
    pub issue: String,
    pub level: RiskLevel,
    pub score: f64,
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Counts over the same teacher-filtered roster the card list renders.
/// A student is pending when their latest metric predates the reporting week.
pub fn dashboard_stats(overviews: &[StudentOverview], reporting_week: NaiveDate) -> DashboardStats {
    let total_students = overviews.len();
    let high_risk_count = overviews
        .iter()
        .filter(|overview| overview.risk_level == RiskLevel::High)
        .count();
    let pending_updates = overviews
        .iter()
        .filter(|overview| overview.latest_week.map_or(true, |week| week < reporting_week))
        .count();
    let updates_done_pct = if total_students == 0 {
        100.0
    } else {
        (total_students - pending_updates) as f64 / total_students as f64 * 100.0
    };

    DashboardStats {
        total_students,
        high_risk_count,
        pending_updates,
        updates_done_pct,
    }
}

/// Top students by descending risk score, Medium and High only, capped at 5.
pub fn rank_at_risk(overviews: &[StudentOverview]) -> Vec<RiskEntry> {
    let mut entries: Vec<RiskEntry> = overviews
        .iter()
        .filter(|overview| matches!(overview.risk_level, RiskLevel::Medium | RiskLevel::High))
        .map(|overview| RiskEntry {
            student_id: overview.student.id,
            name: overview.student.name.clone(),
            roll_number: overview.student.roll_number.clone(),
            issue: overview
                .reasons
                .first()
                .unwrap_or("General Risk")
                .to_string(),
            level: overview.risk_level,
            score: overview.risk_score,
        })
        .collect();

    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(MAX_AT_RISK_ENTRIES);
    entries
}

/// Average attendance per week across the roster, oldest week first.
pub fn weekly_attendance_trend(overviews: &[StudentOverview]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for overview in overviews {
        for metric in &overview.metrics {
            let entry = weeks.entry(metric.week_start_date).or_insert((0.0, 0));
            entry.0 += metric.attendance_score;
            entry.1 += 1;
        }
    }
    weeks
        .into_iter()
        .map(|(week, (total, count))| (week, total / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reasons, Student, WeeklyMetric};

    fn overview(
        id: i64,
        name: &str,
        level: RiskLevel,
        score: f64,
        reasons: Vec<&str>,
        latest_week: Option<NaiveDate>,
    ) -> StudentOverview {
        StudentOverview {
            student: Student {
                id,
                name: name.to_string(),
                roll_number: format!("10-A-{id:02}"),
                teacher_id: 7,
            },
            risk_level: level,
            risk_score: score,
            attendance: 80.0,
            assignment: 70.0,
            reasons: Reasons::new(reasons.into_iter().map(String::from).collect()),
            latest_week,
            metrics: Vec::new(),
        }
    }

    fn week(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn week_start_lands_on_monday() {
        // 2026-01-14 is a Wednesday
        assert_eq!(week_start(week(14)), week(12));
        assert_eq!(week_start(week(12)), week(12));
    }

    #[test]
    fn ranking_is_sorted_capped_and_never_low() {
        let overviews = vec![
            overview(1, "A", RiskLevel::High, 0.91, vec!["Attendance drop"], None),
            overview(2, "B", RiskLevel::Low, 0.95, vec![], None),
            overview(3, "C", RiskLevel::Medium, 0.55, vec![], None),
            overview(4, "D", RiskLevel::High, 0.84, vec![], None),
            overview(5, "E", RiskLevel::Medium, 0.48, vec![], None),
            overview(6, "F", RiskLevel::High, 0.77, vec![], None),
            overview(7, "G", RiskLevel::Medium, 0.61, vec![], None),
        ];

        let entries = rank_at_risk(&overviews);
        assert_eq!(entries.len(), 5);
        assert!(entries.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert!(entries.iter().all(|entry| entry.level != RiskLevel::Low));
        // the Low student outscores everyone but still never ranks
        assert!(entries.iter().all(|entry| entry.student_id != 2));
    }

    #[test]
    fn ranking_carries_first_reason_or_general_risk() {
        let overviews = vec![
            overview(1, "A", RiskLevel::High, 0.9, vec!["Attendance drop", "Low scores"], None),
            overview(2, "B", RiskLevel::Medium, 0.5, vec![], None),
        ];
        let entries = rank_at_risk(&overviews);
        assert_eq!(entries[0].issue, "Attendance drop");
        assert_eq!(entries[1].issue, "General Risk");
    }

    #[test]
    fn stats_count_high_risk_and_pending() {
        let reporting_week = week(12);
        let overviews = vec![
            overview(1, "A", RiskLevel::High, 0.9, vec![], Some(week(12))),
            overview(2, "B", RiskLevel::Low, 0.1, vec![], Some(week(5))),
            overview(3, "C", RiskLevel::Medium, 0.5, vec![], None),
        ];
        let stats = dashboard_stats(&overviews, reporting_week);
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.high_risk_count, 1);
        assert_eq!(stats.pending_updates, 2);
        assert!((stats.updates_done_pct - 100.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn stats_on_empty_roster() {
        let stats = dashboard_stats(&[], week(12));
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.high_risk_count, 0);
        assert_eq!(stats.updates_done_pct, 100.0);
    }

    #[test]
    fn trend_averages_each_week_oldest_first() {
        let mut first = overview(1, "A", RiskLevel::Low, 0.1, vec![], None);
        first.metrics = vec![
            WeeklyMetric {
                week_start_date: week(12),
                attendance_score: 90.0,
                homework_submission_rate: 80.0,
                test_score_average: 70.0,
                behavior_flag: false,
            },
            WeeklyMetric {
                week_start_date: week(5),
                attendance_score: 70.0,
                homework_submission_rate: 60.0,
                test_score_average: 65.0,
                behavior_flag: false,
            },
        ];
        let mut second = overview(2, "B", RiskLevel::Low, 0.1, vec![], None);
        second.metrics = vec![WeeklyMetric {
            week_start_date: week(12),
            attendance_score: 80.0,
            homework_submission_rate: 75.0,
            test_score_average: 68.0,
            behavior_flag: false,
        }];

        let trend = weekly_attendance_trend(&[first, second]);
        assert_eq!(trend, vec![(week(5), 70.0), (week(12), 85.0)]);
    }
}
