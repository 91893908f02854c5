use std::fmt::Write;

use chrono::NaiveDate;

use crate::risk::{DashboardStats, RiskEntry};
use crate::roster::StudentOverview;
use crate::session::Session;

pub fn dashboard_report(
    session: &Session,
    stats: &DashboardStats,
    at_risk: &[RiskEntry],
    trend: &[(NaiveDate, f64)],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Teacher Dashboard");
    let _ = writeln!(output, "Welcome back, {}", session.full_name);
    let _ = writeln!(output);
    let _ = writeln!(output, "## This Week");
    let _ = writeln!(output, "- Assigned students: {}", stats.total_students);
    let _ = writeln!(output, "- Pending updates: {}", stats.pending_updates);
    let _ = writeln!(output, "- High risk: {}", stats.high_risk_count);
    let _ = writeln!(output, "- Updates done: {:.0}%", stats.updates_done_pct);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students at Risk");
    if at_risk.is_empty() {
        let _ = writeln!(output, "No students currently flagged as high risk.");
    } else {
        for entry in at_risk {
            let _ = writeln!(
                output,
                "- {} ({}) {} risk, score {:.2}: {}",
                entry.name, entry.roll_number, entry.level, entry.score, entry.issue
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Performance Trends");
    if trend.is_empty() {
        let _ = writeln!(output, "No weekly metrics recorded yet.");
    } else {
        for (week, average) in trend {
            let _ = writeln!(output, "- week of {}: avg attendance {:.1}%", week, average);
        }
    }

    output
}

pub fn roster_report(overviews: &[StudentOverview]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# My Students");
    if overviews.is_empty() {
        let _ = writeln!(output, "No students to show.");
        return output;
    }

    let _ = writeln!(output, "{} students", overviews.len());
    let _ = writeln!(output);
    for overview in overviews {
        let _ = writeln!(
            output,
            "- {} ({}) {} risk",
            overview.student.name, overview.student.roll_number, overview.risk_level
        );
        let _ = writeln!(
            output,
            "  attendance {:.0}%, assignments {:.0}%",
            overview.attendance, overview.assignment
        );
    }

    output
}

pub fn student_detail(overview: &StudentOverview) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", overview.student.name);
    let _ = writeln!(output, "{} - Student", overview.student.roll_number);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Assessment");
    let _ = writeln!(
        output,
        "Score {:.0} ({} risk)",
        overview.risk_score * 100.0,
        overview.risk_level
    );
    let _ = writeln!(output, "Risk factors:");
    if overview.reasons.is_empty() {
        let _ = writeln!(output, "No specific factors identified.");
    } else {
        for reason in overview.reasons.iter() {
            let _ = writeln!(output, "- {}", reason);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Trend");
    if overview.metrics.is_empty() {
        let _ = writeln!(output, "No weekly metrics recorded yet.");
    } else {
        for metric in overview.metrics.iter().rev() {
            let _ = writeln!(
                output,
                "- week of {}: {:.0}%",
                metric.week_start_date, metric.attendance_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Homework Consistency");
    if overview.metrics.is_empty() {
        let _ = writeln!(output, "No weekly metrics recorded yet.");
    } else {
        for metric in overview.metrics.iter().rev() {
            let _ = writeln!(
                output,
                "- week of {}: {:.0}%",
                metric.week_start_date, metric.homework_submission_rate
            );
        }
    }

    if let Some(latest) = overview.metrics.first() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Latest Week ({})", latest.week_start_date);
        let _ = writeln!(output, "- Attendance: {:.0}%", latest.attendance_score);
        let _ = writeln!(output, "- Homework submission: {:.0}%", latest.homework_submission_rate);
        let _ = writeln!(output, "- Test average: {:.0}%", latest.test_score_average);
        let _ = writeln!(
            output,
            "- Behavior incident: {}",
            if latest.behavior_flag { "yes" } else { "no" }
        );
    }

    output
}
