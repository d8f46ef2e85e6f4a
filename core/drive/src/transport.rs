//! Shared HTTP transport.
//!
//! One pooled `reqwest::Client` is shared by every operation of a drive.
//! Browser-like decoration headers are installed as client defaults so they
//! reach every outbound request, including part PUTs and content downloads.

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use adrive_common::{AuthError, Error, Result};

use crate::config::DriveConfig;

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
const JSON_ACCEPT: &str = "application/json, text/plain, */*";

/// HTTP transport with fixed timeouts and header decoration.
#[derive(Clone)]
pub struct Transport {
    http: Client,
    request_timeout: std::time::Duration,
}

impl Transport {
    /// Build the pooled client described by `config`.
    ///
    /// # Errors
    /// - Header values that are not valid HTTP header text
    /// - TLS backend initialisation failure
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(decoration_headers(config)?)
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            request_timeout: config.request_timeout(),
        })
    }

    /// POST a JSON body, optionally with a bearer token, and return the raw
    /// response whatever its status.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<Response> {
        debug!(url, "POST");

        let payload = serde_json::to_vec(body)?;
        let mut request = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(header::ACCEPT, JSON_ACCEPT)
            .body(payload);

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request to {} failed: {}", url, e)))
    }

    /// POST a JSON body and decode a JSON answer.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T> {
        let response = self.send_json(url, bearer, body).await?;
        handle_response(response).await
    }

    /// PUT a streamed body to a pre-signed URL, returning the status code.
    ///
    /// The response body is drained so the connection can return to the pool.
    pub async fn put_stream(&self, url: &str, body: reqwest::Body) -> Result<StatusCode> {
        let response = self
            .http
            .put(url)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let _ = response.bytes().await;
        Ok(status)
    }

    /// GET a URL without authentication. Used for signed content URLs.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request to {} failed: {}", url, e)))
    }
}

fn decoration_headers(config: &DriveConfig) -> Result<HeaderMap> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|e| Error::InvalidInput(format!("Invalid header value {:?}: {}", v, e)))
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::ORIGIN, value(&config.origin)?);
    headers.insert(header::REFERER, value(&config.referer)?);
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::ACCEPT_LANGUAGE, value(&config.accept_language)?);
    Ok(headers)
}

/// Handle API response with error checking.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "API request rejected");

    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(body),
        StatusCode::UNAUTHORIZED => AuthError::Unauthorized(body).into(),
        StatusCode::FORBIDDEN => Error::PermissionDenied(body),
        _ => Error::Api {
            status: status.as_u16(),
            body,
        },
    })
}
