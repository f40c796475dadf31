use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CallContext, DispatchReceipt, DispatchRequest, Lead};
use crate::phone::NormalizedPhone;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Places one outbound call request. A single attempt: retries belong to the caller.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        phone: &NormalizedPhone,
        lead: &Lead,
    ) -> Result<DispatchReceipt, AppError>;
}

/// Client for the OmniDimension calling API.
#[derive(Clone)]
pub struct OmniDimClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    agent_id: i64,
}

impl std::fmt::Debug for OmniDimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmniDimClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

impl OmniDimClient {
    /// Creates a new `OmniDimClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://backend.omnidim.io/api/v1`.
    /// * `api_key` - Bearer token.
    /// * `agent_id` - Agent that places the calls.
    /// * `timeout` - Per-request timeout; the request never waits longer.
    pub fn new(
        base_url: String,
        api_key: String,
        agent_id: i64,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create OmniDim client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            agent_id,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.omnidim_base_url.clone(),
            config.omnidim_api_key.clone(),
            config.agent_id,
            config.http_timeout,
        )
    }

    /// Builds the request body for `lead`.
    pub fn build_request(&self, phone: &NormalizedPhone, lead: &Lead) -> DispatchRequest {
        DispatchRequest {
            agent_id: self.agent_id,
            to_number: phone.submission(),
            call_context: CallContext::from_lead(lead),
        }
    }
}

#[async_trait]
impl CallDispatcher for OmniDimClient {
    async fn dispatch(
        &self,
        phone: &NormalizedPhone,
        lead: &Lead,
    ) -> Result<DispatchReceipt, AppError> {
        let url = format!("{}/calls/dispatch", self.base_url);
        let body = self.build_request(phone, lead);
        tracing::info!(
            "Dispatching call to {} for lead {}",
            body.to_number,
            body.call_context.lead_id
        );
        tracing::debug!("OmniDim URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("OmniDim request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "OmniDim returned {}: {}",
                status, error_text
            )));
        }

        let text = response.text().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read OmniDim response: {}", e))
        })?;

        let receipt = match serde_json::from_str::<Value>(&text) {
            Ok(data) => match extract_call_id(&data) {
                Some(id) => DispatchReceipt::CallId(id),
                None => {
                    tracing::warn!("OmniDim response has no call id: {}", data);
                    DispatchReceipt::Accepted
                }
            },
            Err(e) => {
                tracing::warn!("OmniDim returned a non-JSON success body: {}", e);
                DispatchReceipt::Accepted
            }
        };

        Ok(receipt)
    }
}

/// Looks for a call identifier, in order: `call_id`, `id`, `data.id`.
/// Accepts string or integer values; empty strings are ignored.
pub fn extract_call_id(data: &Value) -> Option<String> {
    let candidates = [
        data.get("call_id"),
        data.get("id"),
        data.get("data").and_then(|d| d.get("id")),
    ];

    candidates.into_iter().flatten().find_map(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = OmniDimClient::new(
            "https://example.com/api/v1/".to_string(),
            "token".to_string(),
            42,
            Duration::from_secs(5),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://example.com/api/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OmniDimClient::new(
            "https://example.com".to_string(),
            "super-secret".to_string(),
            1,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }

    #[test]
    fn test_extract_call_id_precedence() {
        assert_eq!(
            extract_call_id(&json!({"call_id": "c-1", "id": "x"})),
            Some("c-1".to_string())
        );
        assert_eq!(extract_call_id(&json!({"id": 991})), Some("991".to_string()));
        assert_eq!(
            extract_call_id(&json!({"call_id": "", "data": {"id": "d-7"}})),
            Some("d-7".to_string())
        );
        assert_eq!(extract_call_id(&json!({"status": "queued"})), None);
        assert_eq!(extract_call_id(&json!([1, 2])), None);
    }
}
