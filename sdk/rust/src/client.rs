use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};

/// Body of a successful `POST /register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub token: String,
    pub requests_remaining: u64,
    pub message: String,
}

/// Status plus decoded JSON body. Non-JSON bodies decode to `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Quota left after a charged request.
    pub fn remaining_after(&self) -> Option<u64> {
        self.body.get("requestsRemainingAfter").and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    forwarded_for: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            forwarded_for: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send `X-Forwarded-For: <ip>`. Only honored by gateways that trust it.
    pub fn as_client(mut self, ip: impl Into<String>) -> Self {
        self.forwarded_for = Some(ip.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Perform a request against the gateway.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(ip) = &self.forwarded_for {
            request = request.header("X-Forwarded-For", ip);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        Ok(ApiResponse { status, body })
    }

    pub async fn ping(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::GET, "/ping", None).await
    }

    pub async fn register(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::POST, "/register", None).await
    }

    /// Register and return a client that carries the issued token.
    pub async fn registered(self) -> Result<(Self, Registration), Box<dyn std::error::Error>> {
        let resp = self.register().await?;
        if !resp.is_success() {
            return Err(format!("Gateway returned error status {}: {}", resp.status, resp.body).into());
        }
        let registration: Registration = serde_json::from_value(resp.body)?;
        let client = self.with_token(registration.token.clone());
        Ok((client, registration))
    }

    pub async fn recharge(&self, amount: Option<Value>) -> Result<ApiResponse, reqwest::Error> {
        let body = match amount {
            Some(amount) => json!({ "amount": amount }),
            None => json!({}),
        };
        self.send(Method::POST, "/recharge", Some(body)).await
    }

    pub async fn list_items(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::GET, "/items", None).await
    }

    pub async fn get_item(&self, id: u64) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::GET, &format!("/items/{id}"), None).await
    }

    pub async fn create_item(&self, name: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::POST, "/items", Some(json!({ "name": name })))
            .await
    }

    pub async fn update_item(&self, id: u64, name: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::PUT, &format!("/items/{id}"), Some(json!({ "name": name })))
            .await
    }

    pub async fn delete_item(&self, id: u64) -> Result<ApiResponse, reqwest::Error> {
        self.send(Method::DELETE, &format!("/items/{id}"), None).await
    }
}
