use async_trait::async_trait;

use super::{SafetyService, ServiceError};
use crate::config::ClientConfig;
use crate::models::{CheckOutcome, CheckRequest, CheckResponse, SuggestResponse, Suggestion};

/// HTTP client for the rules service endpoints.
pub struct HttpSafetyService {
    client: reqwest::Client,
    check_url: String,
    suggest_url: String,
    base_url: String,
    timeout_secs: u64,
}

impl HttpSafetyService {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            check_url: config.check_url(),
            suggest_url: config.suggest_url(),
            base_url: config.base().to_string(),
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_connect() {
            ServiceError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ServiceError::Timeout(self.timeout_secs)
        } else {
            ServiceError::HttpClient(e.to_string())
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SafetyService for HttpSafetyService {
    async fn check_medication(&self, request: &CheckRequest) -> Result<CheckOutcome, ServiceError> {
        let response = self
            .client
            .post(&self.check_url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let parsed: CheckResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::ResponseParsing(e.to_string()))?;

        if !parsed.success {
            return Err(ServiceError::Rejected);
        }

        Ok(CheckOutcome {
            safe: parsed.safe,
            warnings: parsed.warnings,
        })
    }

    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ServiceError> {
        let response = self
            .client
            .get(&self.suggest_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let parsed: SuggestResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::ResponseParsing(e.to_string()))?;

        if !parsed.success {
            return Err(ServiceError::Rejected);
        }

        Ok(parsed.suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::models::{Generation, MedicationContext, MedicationEntry, PatientContext, Severity};

    async fn check_handler(Json(body): Json<Value>) -> (StatusCode, String) {
        let name = body["medication_name"].as_str().unwrap_or_default().to_lowercase();
        let reply = match name.as_str() {
            "diphenhydramine" => json!({
                "success": true,
                "safe": false,
                "warnings": [{
                    "severity": "high",
                    "icon": "⚠️",
                    "title": "Anticholinergic effects",
                    "message": "Avoid in adults over 65",
                    "category": "Beers Criteria"
                }]
            })
            .to_string(),
            "acetaminophen" => json!({"success": true, "safe": true, "warnings": []}).to_string(),
            // Echo the request back so the wire format can be asserted.
            "echo" => json!({
                "success": true,
                "safe": false,
                "warnings": [{
                    "severity": "low",
                    "title": "echo",
                    "message": body.to_string()
                }]
            })
            .to_string(),
            "broken" => "{\"success\": true".to_string(),
            "refused" => json!({"success": false, "error": "bad input"}).to_string(),
            "crash" => return (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
            _ => json!({"success": true, "safe": false, "warnings": []}).to_string(),
        };
        (StatusCode::OK, reply)
    }

    async fn suggest_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let q = params.get("q").cloned().unwrap_or_default();
        Json(json!({
            "success": true,
            "suggestions": [
                {"name": format!("{q}arin"), "type": "generic"},
                {"name": "Coumadin", "type": "brand"}
            ]
        }))
    }

    async fn spawn_rules_server() -> ClientConfig {
        let app = Router::new()
            .route("/api/check-medication", post(check_handler))
            .route("/api/drug-suggest", get(suggest_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ClientConfig {
            base_url: format!("http://{addr}/"),
            ..ClientConfig::default()
        }
    }

    fn request(name: &str) -> CheckRequest {
        let context = MedicationContext {
            existing_medications: vec![MedicationEntry {
                name: "warfarin".into(),
                doses_per_day: 1,
            }],
            patient: PatientContext { age: 81 },
        };
        CheckRequest::new(name, context, Generation::new(1))
    }

    #[tokio::test]
    async fn check_returns_warnings() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        let outcome = service.check_medication(&request("Diphenhydramine")).await.unwrap();
        assert!(!outcome.safe);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].severity, Severity::High);
        assert_eq!(outcome.warnings[0].title, "Anticholinergic effects");
    }

    #[tokio::test]
    async fn check_sends_request_body() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        let outcome = service.check_medication(&request("echo")).await.unwrap();
        let sent: Value = serde_json::from_str(&outcome.warnings[0].message).unwrap();
        assert_eq!(sent["medication_name"], "echo");
        assert_eq!(sent["age"], 81);
        assert_eq!(sent["existing_medications"][0]["name"], "warfarin");
        assert_eq!(sent["existing_medications"][0]["doses_per_day"], 1);
    }

    #[tokio::test]
    async fn safe_and_no_match_bodies() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        assert_eq!(
            service.check_medication(&request("acetaminophen")).await.unwrap(),
            CheckOutcome::safe()
        );
        assert_eq!(
            service.check_medication(&request("asdfghjkl")).await.unwrap(),
            CheckOutcome::no_match()
        );
    }

    #[tokio::test]
    async fn malformed_body_is_parsing_error() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        let err = service.check_medication(&request("broken")).await.unwrap_err();
        assert!(matches!(err, ServiceError::ResponseParsing(_)));
    }

    #[tokio::test]
    async fn unsuccessful_body_is_rejected() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        // `warnings` is missing as well; either way this is a failed check.
        let err = service.check_medication(&request("refused")).await.unwrap_err();
        assert!(matches!(err, ServiceError::ResponseParsing(_) | ServiceError::Rejected));
    }

    #[tokio::test]
    async fn server_error_status_is_reported() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        let err = service.check_medication(&request("crash")).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Http {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig {
            base_url: format!("http://{addr}"),
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let service = HttpSafetyService::new(&config).unwrap();
        let err = service.check_medication(&request("warfarin")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Connection(_)));
    }

    #[tokio::test]
    async fn suggest_passes_query() {
        let service = HttpSafetyService::new(&spawn_rules_server().await).unwrap();
        let suggestions = service.suggest("warf").await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].name, "warfarin");
        assert_eq!(suggestions[1].kind.as_deref(), Some("brand"));
    }
}
