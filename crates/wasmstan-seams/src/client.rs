//! Client sessions
//!
//! A [`ClientSession`] is what the collaborator's client builds when it
//! connects: it asks the client-locator seam where the server is at
//! connection time, so a substituted locator redirects every new session.

use crate::error::SeamError;
use crate::registry::SeamRegistry;
use crate::seam::ClientLocator;
use std::time::Duration;
use wasmstan_backend::Endpoint;

/// API prefix every service route lives under
pub const API_PREFIX: &str = "/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A client connection to the compilation service
#[derive(Debug, Clone)]
pub struct ClientSession {
    endpoint: Endpoint,
    base_url: String,
    http: reqwest::Client,
}

impl ClientSession {
    /// Connect to wherever `locator` points
    ///
    /// # Errors
    /// The locator's own error, or [`SeamError::Http`] if the HTTP client
    /// cannot be built
    pub fn connect(locator: &dyn ClientLocator) -> Result<Self, SeamError> {
        let endpoint = locator.locate()?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = endpoint.http_url(API_PREFIX);
        tracing::debug!(%base_url, "client session opened");

        Ok(Self {
            endpoint,
            base_url,
            http,
        })
    }

    /// Connect through the client-locator seam currently bound in `registry`
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if no locator is published, otherwise as
    /// [`ClientSession::connect`]
    pub fn connect_via(registry: &SeamRegistry) -> Result<Self, SeamError> {
        let locator = registry.client_locator()?;
        Self::connect(locator.as_ref())
    }

    /// Server this session talks to
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// `http://<host>:<port>/v1`
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of `path` under the API prefix
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Query the service's health route
    ///
    /// # Errors
    /// [`SeamError::Http`] on connection failure, a non-success status, or a
    /// body that is not JSON
    pub async fn health(&self) -> Result<serde_json::Value, SeamError> {
        let body = self
            .http
            .get(self.url("health"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::FixedLocator;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_uses_located_endpoint() {
        let session = ClientSession::connect(&FixedLocator(Endpoint::new("127.0.0.1", 5055))).unwrap();
        assert_eq!(session.base_url(), "http://127.0.0.1:5055/v1");
        assert_eq!(session.url("/models/abc/fits"), "http://127.0.0.1:5055/v1/models/abc/fits");
        assert_eq!(session.endpoint().port, 5055);
    }

    #[test]
    fn connect_via_requires_locator() {
        let registry = SeamRegistry::new();
        let err = ClientSession::connect_via(&registry).unwrap_err();
        assert!(err.is_binding_failure());
    }

    #[tokio::test]
    async fn health_on_closed_port_is_http_error() {
        let port = wasmstan_backend::readiness::free_port("127.0.0.1").await.unwrap();
        let session = ClientSession::connect(&FixedLocator(Endpoint::new("127.0.0.1", port))).unwrap();
        assert!(matches!(session.health().await, Err(SeamError::Http(_))));
    }
}
