//! HTTP client for the appliance control API.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ClientError;

/// Whole-request timeout for control calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Control API client.
///
/// Holds the bearer token obtained at login and attaches it to every
/// subsequent request.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new control API client.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// The base URL every route is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The current bearer token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub(crate) fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    /// `GET` a JSON resource.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let request = self.authorized(self.client.get(self.url(path)?))?;
        let response = self.send(request, path).await?;
        Ok(response.json().await?)
    }

    /// `POST` a JSON body and decode the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)?).json(body);
        let response = self.send(self.with_token_if_any(request), path).await?;
        Ok(response.json().await?)
    }

    /// `POST` a JSON body, ignoring the response body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let request = self.authorized(self.client.post(self.url(path)?).json(body))?;
        self.send(request, path).await.map(drop)
    }

    /// `PUT` a JSON body, ignoring the response body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let request = self.authorized(self.client.put(self.url(path)?).json(body))?;
        self.send(request, path).await.map(drop)
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidAddress {
                address: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    /// Attach the bearer token; fails if there is none.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.read();
        let token = token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(request.bearer_auth(token))
    }

    fn with_token_if_any(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Connection(format!("Cannot connect to {}", self.base_url))
            } else {
                ClientError::Http(e)
            }
        })?;

        let status = response.status();
        debug!(path = path, status = status.as_u16(), "Control API call");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
