//! Authenticated client for the clinic management REST API.
//!
//! Every call goes through `ApiClient::execute`, which attaches the stored
//! access token and, on a 401, performs at most one refresh-and-retry cycle
//! per request before ending the session.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{CurrentUser, Session, SessionEvent, TokenPair};
use crate::config::Config;

use super::request::PendingRequest;
use super::ApiError;

/// HTTP request timeout in seconds, when none is configured
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for `/auth/me`, long enough to ride out a backend cold start
const CURRENT_USER_TIMEOUT_SECS: u64 = 15;

const REFRESH_PATH: &str = "/auth/refresh";

/// Response body of `/auth/login`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Backend asks the UI to show the post-login notice
    #[serde(default)]
    pub show_notice: bool,
}

/// API client bound to one base endpoint and one session.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the session.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        session: Session,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: Session) -> Result<Self, ApiError> {
        Self::with_timeout(config.api_url.clone(), session, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full URL for a path under the base endpoint
    pub fn url(&self, path: &str) -> String {
        PendingRequest::get(path).resolve_url(&self.base_url)
    }

    // ===== Interceptors =====

    /// Outbound decoration: attach the stored access token, if any.
    /// Returns the token that was attached.
    fn authorize(&self, request: &mut PendingRequest) -> Option<String> {
        match self.session.access_token() {
            Ok(Some(token)) => {
                request.set_bearer(&token);
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Could not read access token, sending unauthenticated");
                None
            }
        }
    }

    fn should_refresh(request: &PendingRequest, error: &ApiError) -> bool {
        error.is_unauthorized() && !request.is_login() && !request.is_retried()
    }

    /// Send a request, recovering once from an expired access token
    pub async fn execute(&self, mut request: PendingRequest) -> Result<Response, ApiError> {
        let sent_with = self.authorize(&mut request);

        match self.dispatch(&request).await {
            Ok(response) => Ok(response),
            Err(error) if Self::should_refresh(&request, &error) => {
                self.retry_after_refresh(request, sent_with, error).await
            }
            Err(error) => Err(error),
        }
    }

    async fn retry_after_refresh(
        &self,
        mut request: PendingRequest,
        sent_with: Option<String>,
        original: ApiError,
    ) -> Result<Response, ApiError> {
        request.mark_retried();

        let guard = self.session.lock_refresh().await;

        // Another request may have rotated the tokens while this one waited
        let current = self.session.access_token()?;
        if let Some(token) = current.filter(|t| Some(t) != sent_with.as_ref()) {
            drop(guard);
            debug!(url = %request.url, "Retrying with token refreshed by a concurrent request");
            request.set_bearer(&token);
            return self.dispatch(&request).await;
        }

        let Some(refresh_token) = self.session.refresh_token()? else {
            debug!(url = %request.url, "No refresh token stored, giving up");
            return Err(original);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(pair) => {
                // A partly written pair would pair the new access token with a spent refresh token
                if let Err(e) = self.session.store(&pair) {
                    self.session.expire(format!("Failed to persist refreshed tokens: {}", e));
                    return Err(original);
                }
                self.session.emit(SessionEvent::Refreshed);
                drop(guard);

                info!(url = %request.url, "Access token refreshed, retrying request");
                request.set_bearer(&pair.access_token);
                self.dispatch(&request).await
            }
            Err(refresh_error) => {
                self.session.expire(refresh_error.to_string());
                Err(original)
            }
        }
    }

    /// Exchange the refresh token for a new pair. Sent without credentials.
    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .query(&[("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| ApiError::RefreshFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RefreshFailed(
                ApiError::from_status(status, &body).user_message(),
            ));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| ApiError::RefreshFailed(format!("invalid refresh response: {}", e)))
    }

    /// Build, send and check a request. No recovery.
    async fn dispatch(&self, request: &PendingRequest) -> Result<Response, ApiError> {
        let response = request.build(&self.client, &self.base_url)?.send().await?;
        let status = response.status();
        debug!(method = %request.method, url = %request.url, status = status.as_u16(), retried = request.is_retried(), "API response");

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Typed helpers =====

    /// Execute and decode a JSON response body
    pub async fn execute_json<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    /// Execute and discard the response body
    pub async fn execute_empty(&self, request: PendingRequest) -> Result<(), ApiError> {
        self.execute(request).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_json(PendingRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.execute_json(PendingRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.execute_json(PendingRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_empty(PendingRequest::delete(path)).await
    }

    // ===== Session operations =====

    /// Log in with email and password and start a new session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = PendingRequest::post(super::request::LOGIN_PATH)
            .form(&[("username", email), ("password", password)]);

        let login: LoginResponse = self.execute_json(request).await?;
        self.session
            .start(&login.access_token, login.refresh_token.as_deref())?;
        Ok(login)
    }

    /// Explicitly rotate the token pair. Ends the session if the refresh is rejected.
    pub async fn refresh_session(&self) -> Result<TokenPair, ApiError> {
        let _guard = self.session.lock_refresh().await;

        let refresh_token = self
            .session
            .refresh_token()?
            .ok_or_else(|| ApiError::Unauthorized("No refresh token stored".to_string()))?;

        match self.request_refresh(&refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.session.store(&pair) {
                    self.session.expire(format!("Failed to persist refreshed tokens: {}", e));
                    return Err(e.into());
                }
                self.session.emit(SessionEvent::Refreshed);
                Ok(pair)
            }
            Err(e) => {
                self.session.expire(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the logged-in account
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.execute_json(
            PendingRequest::get("/auth/me").timeout(Duration::from_secs(CURRENT_USER_TIMEOUT_SECS)),
        )
        .await
    }

    /// Drop the local session
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.logout()?;
        Ok(())
    }
}
