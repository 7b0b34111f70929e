//! Trading API client with retry and response parsing

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{E2eError, E2eResult};
use crate::retry::RetryPolicy;

/// Per-request behaviour
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Retry non-success responses and transport errors
    pub apply_retries: bool,
    /// Parse the body (JSON, unwrapping `result`) instead of returning raw text
    pub parse_result: bool,
    /// Only log these fields of list/object responses
    pub fields_to_show: Option<Vec<String>>,
    /// Max list items shown in request logs
    pub truncate_len: usize,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            apply_retries: true,
            parse_result: true,
            fields_to_show: None,
            truncate_len: 5,
        }
    }
}

/// Blocking HTTP client for the platform's REST APIs
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req
    }

    pub fn get(&self, path: &str, options: &RequestOptions) -> E2eResult<Value> {
        self.send(Method::GET, path, None, options)
    }

    pub fn post(&self, path: &str, body: &Value, options: &RequestOptions) -> E2eResult<Value> {
        self.send(Method::POST, path, Some(body), options)
    }

    pub fn put(&self, path: &str, body: &Value, options: &RequestOptions) -> E2eResult<Value> {
        self.send(Method::PUT, path, Some(body), options)
    }

    pub fn delete(&self, path: &str, options: &RequestOptions) -> E2eResult<Value> {
        self.send(Method::DELETE, path, None, options)
    }

    /// Send a request, retrying per the client's policy.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> E2eResult<Value> {
        if !options.apply_retries {
            let resp = self.request(method.clone(), path, body).send()?;
            let (status, text) = read_response(resp)?;
            debug!("{}", format_request_log(&method, path, status, &text, options));
            return Ok(parse_body(&text, options.parse_result));
        }

        let attempts = self.policy.max_retries.max(1);
        let mut attempt = 0;
        loop {
            let last = attempt + 1 == attempts;
            let delay = self.policy.delay_for(attempt);

            match self.request(method.clone(), path, body).send() {
                Ok(resp) => {
                    let (status, text) = read_response(resp)?;
                    debug!("{}", format_request_log(&method, path, status, &text, options));

                    if (200..300).contains(&status) {
                        return Ok(parse_body(&text, options.parse_result));
                    }
                    if last {
                        let err = E2eError::RequestFailed {
                            status,
                            body: text.trim().to_string(),
                        };
                        error!("{}", err);
                        return Err(err);
                    }
                    warn!(
                        "Request failed (attempt {}/{}), status_code: {} - {}, retrying in {:.2}s...",
                        attempt + 1,
                        attempts,
                        status,
                        text.trim(),
                        delay.as_secs_f64()
                    );
                }
                Err(e) => {
                    if last {
                        return Err(e.into());
                    }
                    warn!(
                        "Request failed (attempt {}/{}), retrying in {:.2}s. Error: {}",
                        attempt + 1,
                        attempts,
                        delay.as_secs_f64(),
                        e
                    );
                }
            }
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

fn read_response(resp: Response) -> E2eResult<(u16, String)> {
    let status = resp.status().as_u16();
    let text = resp.text()?;
    Ok((status, text))
}

/// Interpret a response body.
///
/// Empty body is `[]`; a JSON object with `result` yields that field; other
/// JSON is returned whole; anything else comes back as a string.
pub fn parse_body(text: &str, parse_result: bool) -> Value {
    if !parse_result {
        return Value::String(text.to_string());
    }
    if text.trim().is_empty() {
        return Value::Array(Vec::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut map)) => match map.remove("result") {
            Some(result) => result,
            None => Value::Object(map),
        },
        Ok(other) => other,
        Err(_) => Value::String(text.to_string()),
    }
}

/// One-line request log with a shortened body
pub fn format_request_log(method: &Method, path: &str, status: u16, body: &str, options: &RequestOptions) -> String {
    let shown = match serde_json::from_str::<Value>(body) {
        Ok(value) => shorten(value, options).to_string(),
        Err(_) => body.chars().take(500).collect(),
    };
    format!("{} {} -> {} {}", method, path, status, shown)
}

fn shorten(value: Value, options: &RequestOptions) -> Value {
    let pick = |v: Value| match (&options.fields_to_show, v) {
        (Some(fields), Value::Object(map)) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
        ),
        (_, v) => v,
    };

    match value {
        Value::Array(items) => {
            let total = items.len();
            let mut kept: Vec<Value> = items.into_iter().take(options.truncate_len).map(pick).collect();
            if total > options.truncate_len {
                kept.push(Value::String(format!("... {} more", total - options.truncate_len)));
            }
            Value::Array(kept)
        }
        Value::Object(mut map) => match map.remove("result") {
            Some(result) => shorten(result, options),
            None => pick(Value::Object(map)),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_unwraps_result() {
        assert_eq!(parse_body(r#"{"result": [1, 2]}"#, true), json!([1, 2]));
        assert_eq!(parse_body(r#"{"code": 0}"#, true), json!({"code": 0}));
        assert_eq!(parse_body("", true), json!([]));
        assert_eq!(parse_body("not json", true), json!("not json"));
        assert_eq!(parse_body(r#"{"result": 1}"#, false), json!(r#"{"result": 1}"#));
    }

    #[test]
    fn test_request_log_truncates_lists() {
        let options = RequestOptions {
            truncate_len: 2,
            fields_to_show: Some(vec!["id".to_string()]),
            ..Default::default()
        };
        let body = r#"{"result": [{"id": 1, "x": 0}, {"id": 2, "x": 0}, {"id": 3, "x": 0}]}"#;
        let line = format_request_log(&Method::GET, "/orders", 200, body, &options);
        assert_eq!(line, r#"GET /orders -> 200 [{"id":1},{"id":2},"... 1 more"]"#);
    }

    #[test]
    fn test_transport_errors_exhaust_retries() {
        // nothing listens on port 9 of localhost
        let client = ApiClient::new("http://127.0.0.1:9")
            .unwrap()
            .with_policy(RetryPolicy::immediate(2));
        let err = client.get("/ping", &RequestOptions::default()).unwrap_err();
        assert!(matches!(err, E2eError::Http(_)));
    }
}
