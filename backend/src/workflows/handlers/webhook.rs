// Webhook - call an external HTTP endpoint

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use super::config_str;
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};

/// `call_webhook`: sends `body` (default: the payload) to `url`.
/// A non-2xx response is reported as a failed result.
pub struct WebhookHandler {
    client: reqwest::Client,
}

impl WebhookHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn parse_method(raw: &str) -> Option<Method> {
    match raw.to_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

#[async_trait]
impl ActionHandler for WebhookHandler {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        let Some(raw_url) = config_str(config, "url") else {
            return Ok(ActionResult::failure("Missing URL"));
        };
        let url = match url::Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Ok(ActionResult::failure(&format!("Invalid URL '{}'", raw_url))),
        };
        let method_name = config_str(config, "method").unwrap_or("POST");
        let Some(method) = parse_method(method_name) else {
            return Ok(ActionResult::failure(&format!("Unsupported HTTP method '{}'", method_name)));
        };

        let mut request = self.client.request(method.clone(), url);

        if let Some(headers) = config.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key.as_str(), v);
                }
            }
        }

        if method != Method::GET {
            let body = match config.get("body") {
                Some(body) if !body.is_null() => body,
                _ => payload,
            };
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Ok(ActionResult::failure(&format!(
                "endpoint returned status {}",
                status.as_u16()
            )));
        }

        let response_body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(ActionResult::success(Some(json!({
            "statusCode": status.as_u16(),
            "responseBody": response_body,
        }))))
    }
}
