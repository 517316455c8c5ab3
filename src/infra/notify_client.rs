use crate::app::ports::{NotificationRequest, NotifyApiPort};
use crate::config::NotifyConfig;
use crate::error::DispatchError;
use async_trait::async_trait;
use serde::Deserialize;

/// Twilio Notify `Notifications` endpoint over reqwest.
///
/// One `create_notification` is one POST; the API answers for the request as a
/// whole and never per binding.
pub struct TwilioNotifyClient {
    client: reqwest::Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioNotifyClient {
    pub fn new(config: &NotifyConfig, service_sid: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/v1/Services/{}/Notifications",
                config.base_url.trim_end_matches('/'),
                service_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Form fields for one request: a `ToBinding` JSON object per address plus the body.
pub fn form_params(request: &NotificationRequest) -> Result<Vec<(&'static str, String)>, DispatchError> {
    let mut params = Vec::with_capacity(request.bindings.len() + 1);
    for binding in &request.bindings {
        let encoded = serde_json::to_string(binding)
            .map_err(|e| DispatchError::Transport(format!("encoding binding: {}", e)))?;
        params.push(("ToBinding", encoded));
    }
    params.push(("Body", request.body.clone()));
    Ok(params)
}

fn api_error(status: u16, body: &str) -> DispatchError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            trimmed.chars().take(200).collect()
        }
    });
    DispatchError::Api {
        status,
        code: parsed.code,
        message,
    }
}

#[async_trait]
impl NotifyApiPort for TwilioNotifyClient {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        let params = form_params(request)?;
        tracing::debug!("POST {} with {} bindings", self.endpoint, request.bindings.len());
        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::Binding;

    fn request(addrs: &[&str]) -> NotificationRequest {
        NotificationRequest {
            bindings: addrs
                .iter()
                .map(|a| Binding { binding_type: "sms".into(), address: a.to_string() })
                .collect(),
            body: "Reminder: vote today".into(),
        }
    }

    #[test]
    fn one_to_binding_per_address_then_body() {
        let params = form_params(&request(&["+15550001", "+15550002"])).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].0, "ToBinding");
        assert_eq!(params[0].1, r#"{"binding_type":"sms","address":"+15550001"}"#);
        assert_eq!(params[1].1, r#"{"binding_type":"sms","address":"+15550002"}"#);
        assert_eq!(params[2], ("Body", "Reminder: vote today".to_string()));
    }

    #[test]
    fn api_error_uses_json_code_and_message() {
        let err = api_error(400, r#"{"code": 20001, "message": "Invalid binding", "status": 400}"#);
        assert_eq!(
            err,
            DispatchError::Api { status: 400, code: Some(20001), message: "Invalid binding".into() }
        );
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        assert_eq!(
            api_error(502, "Bad Gateway"),
            DispatchError::Api { status: 502, code: None, message: "Bad Gateway".into() }
        );
        assert_eq!(
            api_error(503, ""),
            DispatchError::Api { status: 503, code: None, message: "HTTP 503".into() }
        );
    }

    #[test]
    fn endpoint_joins_base_and_service() {
        let cfg = NotifyConfig {
            account_sid: "AC1".into(),
            auth_token: "t".into(),
            base_url: "http://localhost:9000/".into(),
            timeout_secs: 1,
        };
        let client = TwilioNotifyClient::new(&cfg, "IS123");
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/Services/IS123/Notifications");
    }
}
