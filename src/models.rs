use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub roll_number: String,
    pub teacher_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Risk reasons as decoded from the backend, which sends either a JSON list
/// of strings, a string holding an encoded list, or a plain string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reasons(Vec<String>);

impl Reasons {
    pub fn new(reasons: Vec<String>) -> Self {
        Reasons(reasons)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for Reasons {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            List(Vec<String>),
            Text(String),
        }

        let reasons = match Wire::deserialize(deserializer)? {
            Wire::List(list) => list,
            Wire::Text(raw) => decode_reason_text(&raw),
        };
        Ok(Reasons(reasons))
    }
}

fn decode_reason_text(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    vec![raw.to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskRecord {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    #[serde(default)]
    pub risk_reasons: Reasons,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeeklyMetric {
    pub week_start_date: NaiveDate,
    pub attendance_score: f64,
    pub homework_submission_rate: f64,
    pub test_score_average: f64,
    pub behavior_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSubmission {
    pub student_id: i64,
    pub week_start_date: NaiveDate,
    pub attendance_score: f64,
    pub homework_submission_rate: f64,
    pub test_score_average: f64,
    pub behavior_flag: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkOutcome {
    pub total: u32,
    pub success: u32,
    pub failed: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    #[serde(other)]
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub id: i64,
    pub role: Role,
    pub full_name: String,
}
