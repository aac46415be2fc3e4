use super::transport::{ApiRequest, HttpTransport, Method, ReqwestTransport};
use super::types::{LoginRequest, ProfileUpdate, Token};
use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

/// Authentication and profile endpoints of the backend API
pub struct AuthClient<T: HttpTransport = ReqwestTransport> {
    base: Url,
    transport: T,
    access_token: Option<String>,
}

impl AuthClient<ReqwestTransport> {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_transport(base_url, ReqwestTransport::new()?)
    }
}

impl<T: HttpTransport> AuthClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        // Endpoints are joined relative to the base path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            transport,
            access_token: None,
        })
    }

    /// Attach a bearer token to every later request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn sign_in(&self, credentials: &LoginRequest) -> Result<Token, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
        let token = self.request(Method::Post, "users/login/", None, Some(body))?;
        info!(user = %credentials.username, "signed in");
        Ok(token)
    }

    /// Starts the Google OAuth flow; the response carries the redirect
    pub fn google_login(&self) -> Result<Value, ApiError> {
        self.request(Method::Get, "users/google-login", None, None)
    }

    /// Completes the OAuth flow. `query` is the redirect's query string,
    /// forwarded unchanged.
    pub fn callback(&self, query: Option<&str>) -> Result<Value, ApiError> {
        self.request(Method::Get, "users/callback/", query, None)
    }

    pub fn logout(&self) -> Result<Value, ApiError> {
        self.request(Method::Post, "user/logout/", None, None)
    }

    pub fn update_profile(&self, user_id: u64, profile: &ProfileUpdate) -> Result<Value, ApiError> {
        let body = json!({ "data": profile });
        self.request(Method::Post, &format!("users/{user_id}/profile"), None, Some(body))
    }

    fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<Value>,
    ) -> Result<R, ApiError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))?;
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.set_query(Some(query.trim_start_matches('?')));
        }

        let request = ApiRequest {
            method,
            url,
            body,
            bearer: self.access_token.clone(),
        };
        debug!(?method, url = %request.url, "api request");
        let response = self.transport.send(&request)?;

        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        // Some endpoints answer with an empty body
        let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &response.body
        };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
