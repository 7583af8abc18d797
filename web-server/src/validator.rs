// web-server/src/validator.rs
use async_trait::async_trait;
use common::{inspect_token, unix_now, AuthConfig, TokenStatus};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("could not build validation client: {0}")]
    Client(String),

    #[error("validation request failed: {0}")]
    Network(String),

    #[error("validation backend answered {0}")]
    Unavailable(reqwest::StatusCode),
}

/// Asks the backend whether a bearer token is still good
#[async_trait]
pub trait RemoteValidator: Send + Sync {
    /// `Ok(false)` means the backend answered and refused the token.
    /// Any error means no verdict was reached.
    async fn validate(&self, token: &str) -> Result<bool, ValidationError>;
}

pub struct HttpValidator {
    client: reqwest::Client,
    url: String,
}

impl HttpValidator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValidationError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RemoteValidator for HttpValidator {
    async fn validate(&self, token: &str) -> Result<bool, ValidationError> {
        // Single attempt; the caller falls back to the local check on failure
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ValidationError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!("Backend refused token with status {}", status);
            return Ok(false);
        }
        // Gateway errors, outages and misrouted requests say nothing about the token
        Err(ValidationError::Unavailable(status))
    }
}

/// Who produced a `TokenStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSource {
    /// The backend answered
    Remote,
    /// The backend was configured but gave no verdict
    LocalFallback,
    /// No backend configured
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCheck {
    pub status: TokenStatus,
    pub source: CheckSource,
}

impl TokenCheck {
    fn new(status: TokenStatus, source: CheckSource) -> Self {
        Self { status, source }
    }
}

/// Remote check first, local JWT-shape check when the backend is unreachable
#[derive(Clone, Default)]
pub struct TwoTierValidator {
    remote: Option<Arc<dyn RemoteValidator>>,
}

impl TwoTierValidator {
    pub fn new(remote: Option<Arc<dyn RemoteValidator>>) -> Self {
        Self { remote }
    }

    pub fn local_only() -> Self {
        Self { remote: None }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ValidationError> {
        let remote = match &config.validation_url {
            Some(url) => {
                tracing::info!("Validating tokens against {}", url);
                let validator = HttpValidator::new(
                    url.clone(),
                    Duration::from_secs(config.validation_timeout_secs),
                )?;
                Some(Arc::new(validator) as Arc<dyn RemoteValidator>)
            }
            None => {
                tracing::warn!("No validation URL configured, using local token checks only");
                None
            }
        };

        Ok(Self::new(remote))
    }

    pub async fn check(&self, token: &str) -> TokenCheck {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return TokenCheck::new(inspect_token(token, unix_now()), CheckSource::Local),
        };

        match remote.validate(token).await {
            Ok(true) => TokenCheck::new(TokenStatus::Valid, CheckSource::Remote),
            Ok(false) => TokenCheck::new(TokenStatus::Rejected, CheckSource::Remote),
            Err(e) => {
                tracing::warn!("Remote token validation failed, falling back to local check: {}", e);
                TokenCheck::new(inspect_token(token, unix_now()), CheckSource::LocalFallback)
            }
        }
    }
}
