use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{BulkOutcome, LoginResponse, MetricSubmission, RiskRecord, Student, WeeklyMetric};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{detail}")]
    Backend { status: StatusCode, detail: String },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Thin JSON client for the EduPredict backend. All durable state lives on
/// the other side of these endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| anyhow::anyhow!("failed to build HTTP client: {err}"))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
            password: &'a str,
        }
        self.post_json("/login", &Credentials { email, password }).await
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        self.get_json("/students/").await
    }

    pub async fn student_history(&self, student_id: i64) -> Result<Vec<RiskRecord>, ApiError> {
        self.get_json(&format!("/students/{student_id}/history")).await
    }

    pub async fn student_metrics(&self, student_id: i64) -> Result<Vec<WeeklyMetric>, ApiError> {
        self.get_json(&format!("/students/{student_id}/metrics")).await
    }

    pub async fn submit_metric(&self, metric: &MetricSubmission) -> Result<(), ApiError> {
        let url = self.url("/metrics/");
        let response = self
            .http
            .post(&url)
            .json(metric)
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;
        Self::check_status(response).await.map(|_| ())
    }

    pub async fn submit_metrics_bulk(
        &self,
        batch: &[MetricSubmission],
    ) -> Result<BulkOutcome, ApiError> {
        self.post_json("/metrics/bulk", &batch).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Backend {
            status,
            detail: extract_detail(status, &body),
        })
    }
}

/// Prefer the backend's `detail` field over a generic status message.
fn extract_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }
    format!("backend returned status {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_field_is_preferred() {
        let detail = extract_detail(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Invalid credentials"}"#,
        );
        assert_eq!(detail, "Invalid credentials");
    }

    #[test]
    fn structured_detail_is_kept_verbatim() {
        let detail = extract_detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#,
        );
        assert!(detail.contains("field required"));
    }

    #[test]
    fn non_json_body_falls_back_to_status() {
        let detail = extract_detail(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(detail, "backend returned status 502 Bad Gateway");
    }

    #[test]
    fn json_without_detail_falls_back_to_status() {
        let detail = extract_detail(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "boom"}"#);
        assert!(detail.starts_with("backend returned status 500"));
    }
}
