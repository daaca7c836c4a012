//! Client for the external face/voice biometric services.
//!
//! The services run out of process behind an HTTP contract: a health
//! probe, sample registration with a minimum-count requirement, and an
//! authenticate call returning a confidence score. This side only needs
//! the contract to decide user-facing messaging; it implements none of
//! the recognition itself.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Result;

/// `GET /health` response. Field names follow the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    #[serde(default, rename = "models_loaded")]
    pub models_ready: bool,
    #[serde(default, rename = "database_connected")]
    pub store_ready: bool,
}

impl ServiceHealth {
    pub fn is_usable(&self) -> bool {
        self.models_ready && self.store_ready
    }
}

/// `POST /register` response: progress toward the minimum sample count.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterProgress {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "embeddings_count")]
    pub count: u32,
    #[serde(default, rename = "minimum_required")]
    pub minimum_required: u32,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl RegisterProgress {
    /// Message shown to the user after submitting a sample.
    pub fn user_message(&self) -> String {
        if !self.success {
            return self
                .message
                .clone()
                .unwrap_or_else(|| "Sample could not be registered. Try again.".to_string());
        }
        if self.complete {
            "Registration complete.".to_string()
        } else {
            format!(
                "Registered {} of {} samples. Keep going.",
                self.count, self.minimum_required
            )
        }
    }
}

/// `POST /authenticate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthDecision {
    pub success: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthDecision {
    pub fn user_message(&self) -> String {
        if let Some(ref message) = self.message {
            return message.clone();
        }
        if self.success {
            format!("Welcome back ({:.0}% match).", self.confidence * 100.0)
        } else {
            "Authentication failed. Try again or use manual login.".to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SampleRequest<'a> {
    user_id: &'a str,
    sample: String,
}

pub struct BiometricClient {
    http: reqwest::Client,
    base_url: String,
}

impl BiometricClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn encode_sample(sample: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(sample)
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        let health = self
            .http
            .get(self.url("/health"))
            .send()
            .await?
            .json::<ServiceHealth>()
            .await?;
        debug!(?health, "biometric health");
        Ok(health)
    }

    pub async fn register(&self, user_id: &str, sample: &[u8]) -> Result<RegisterProgress> {
        let body = SampleRequest {
            user_id,
            sample: Self::encode_sample(sample),
        };
        let progress = self
            .http
            .post(self.url("/register"))
            .json(&body)
            .send()
            .await?
            .json::<RegisterProgress>()
            .await?;
        debug!(user_id, count = progress.count, "biometric register");
        Ok(progress)
    }

    pub async fn authenticate(&self, user_id: &str, sample: &[u8]) -> Result<AuthDecision> {
        let body = json!({
            "user_id": user_id,
            "sample": Self::encode_sample(sample),
        });
        let decision = self
            .http
            .post(self.url("/authenticate"))
            .json(&body)
            .send()
            .await?
            .json::<AuthDecision>()
            .await?;
        debug!(
            user_id,
            success = decision.success,
            confidence = decision.confidence,
            "biometric authenticate"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_health_response() {
        let json = r#"{"status": "healthy", "models_loaded": true, "database_connected": false}"#;
        let health: ServiceHealth = serde_json::from_str(json).unwrap();
        assert!(health.models_ready);
        assert!(!health.store_ready);
        assert!(!health.is_usable());
    }

    #[test]
    fn test_parse_register_progress() {
        let json = r#"{"success": true, "embeddings_count": 3, "minimum_required": 5, "complete": false}"#;
        let progress: RegisterProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.count, 3);
        assert_eq!(progress.user_message(), "Registered 3 of 5 samples. Keep going.");
    }

    #[test]
    fn test_register_complete_message() {
        let json = r#"{"success": true, "embeddings_count": 5, "minimum_required": 5, "complete": true}"#;
        let progress: RegisterProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.user_message(), "Registration complete.");
    }

    #[test]
    fn test_register_failure_uses_service_message() {
        let json = r#"{"success": false, "message": "No face detected in image"}"#;
        let progress: RegisterProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.user_message(), "No face detected in image");
    }

    #[test]
    fn test_auth_decision_messages() {
        let ok: AuthDecision =
            serde_json::from_str(r#"{"success": true, "confidence": 0.92}"#).unwrap();
        assert_eq!(ok.user_message(), "Welcome back (92% match).");

        let denied: AuthDecision =
            serde_json::from_str(r#"{"success": false, "confidence": 0.31}"#).unwrap();
        assert!(denied.user_message().contains("manual login"));
    }

    #[test]
    fn test_url_joins_cleanly() {
        let client = BiometricClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/health"), "http://127.0.0.1:5000/health");
    }
}
