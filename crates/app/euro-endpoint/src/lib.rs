mod error;

pub use error::{EndpointError, Result};

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;
use tracing::info;
use url::Url;

const DEFAULT_API_URL: &str = "https://api.eurora-labs.com";

/// Source of the bearer token attached to every API request.
///
/// Token storage and refresh live outside this workspace; implementors only
/// hand over whatever token is current.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// A resolved API base URL plus the HTTP client used to reach it.
#[derive(Clone)]
pub struct Endpoint {
    client: Client,
    base_url: Url,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token_source.is_some())
            .finish()
    }
}

impl Endpoint {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            token_source: None,
        })
    }

    pub fn with_token_source(mut self, token_source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(token_source);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `segments` to the base URL path. Each segment is percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EndpointError::invalid_url(self.base_url.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Accept either an absolute URL or a path relative to the base URL.
    pub fn resolve(&self, location: &str) -> Result<Url> {
        match Url::parse(location) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(location.trim_start_matches('/'))
                .map_err(|e| EndpointError::invalid_url(e.to_string())),
            Err(e) => Err(EndpointError::invalid_url(e.to_string())),
        }
    }

    pub async fn get(&self, url: Url) -> RequestBuilder {
        self.authorize(self.client.get(url)).await
    }

    pub async fn post(&self, url: Url) -> RequestBuilder {
        self.authorize(self.client.post(url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.get(url).await.query(query).send().await?;
        decode_json(check_status(response).await?).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        let response = self.post(url).await.json(body).send().await?;
        decode_json(check_status(response).await?).await
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token_source {
            Some(source) => match source.access_token().await {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
            None => request,
        }
    }
}

/// Turn a non-success response into [`EndpointError::Status`], keeping the
/// message from the server's error envelope when there is one.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(EndpointError::Status {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"message": ".."}`, `{"error": ".."}` and
/// `{"error": {"message": ".."}}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let message = value
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| value.get("error").and_then(|e| e.as_str()))
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        })?;

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| EndpointError::invalid_url(format!("{url}: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(EndpointError::invalid_url(url));
    }
    Ok(parsed)
}

/// Centralized API endpoint manager.
///
/// Owns the current API URL and broadcasts an [`Endpoint`] via
/// `tokio::sync::watch` whenever the URL changes. Consumers subscribe once and
/// always get the latest endpoint.
pub struct EndpointManager {
    tx: watch::Sender<Endpoint>,
    client: Client,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl EndpointManager {
    pub fn new(initial_url: &str) -> Result<Self> {
        let url = if initial_url.is_empty() {
            DEFAULT_API_URL
        } else {
            initial_url
        };

        let client = Client::builder()
            .user_agent(concat!("euro-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EndpointError::Client)?;

        let endpoint = Endpoint::new(client.clone(), url)?;
        let (tx, _) = watch::channel(endpoint);

        Ok(Self {
            tx,
            client,
            token_source: None,
        })
    }

    pub fn from_env() -> Result<Self> {
        let url = std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&url)
    }

    pub fn with_token_source(mut self, token_source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(Arc::clone(&token_source));
        self.tx
            .send_modify(|endpoint| endpoint.token_source = Some(token_source));
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Endpoint> {
        self.tx.subscribe()
    }

    pub fn current_url(&self) -> String {
        self.tx.borrow().base_url().to_string()
    }

    pub fn set_base_url(&self, url: &str) -> Result<()> {
        let mut endpoint = Endpoint::new(self.client.clone(), url)?;
        endpoint.token_source = self.token_source.clone();
        self.tx.send_replace(endpoint);
        info!("Switched API endpoint to {}", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    struct StaticToken;

    #[async_trait]
    impl TokenSource for StaticToken {
        async fn access_token(&self) -> Option<String> {
            Some("secret-token".to_string())
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    #[test]
    fn url_appends_encoded_segments() {
        let endpoint = Endpoint::new(Client::new(), "https://api.example.com/v1/").unwrap();
        let url = endpoint.url(&["conversations", "a b", "messages"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/conversations/a%20b/messages"
        );
    }

    #[test]
    fn resolve_accepts_relative_and_absolute_locations() {
        let endpoint = Endpoint::new(Client::new(), "https://api.example.com/v1/").unwrap();

        assert_eq!(
            endpoint.resolve("/files/abc.pdf").unwrap().as_str(),
            "https://api.example.com/v1/files/abc.pdf"
        );
        assert_eq!(
            endpoint.resolve("https://cdn.example.com/x.png").unwrap().as_str(),
            "https://cdn.example.com/x.png"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            Endpoint::new(Client::new(), "mailto:someone@example.com"),
            Err(EndpointError::InvalidUrl(_))
        ));
    }

    #[test]
    fn extracts_known_envelopes() {
        assert_eq!(
            extract_error_message(r#"{"message": "Conversation not found"}"#).as_deref(),
            Some("Conversation not found")
        );
        assert_eq!(
            extract_error_message(r#"{"error": "Unauthorized"}"#).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "Too large", "code": 413}}"#)
                .as_deref(),
            Some("Too large")
        );
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
        assert_eq!(extract_error_message(r#"{"message": "  "}"#), None);
    }

    #[test]
    fn set_base_url_notifies_subscribers() {
        let manager = EndpointManager::new("https://one.example.com").unwrap();
        let mut rx = manager.subscribe();

        manager.set_base_url("https://two.example.com").unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().base_url().as_str(),
            "https://two.example.com/"
        );
        assert_eq!(manager.current_url(), "https://two.example.com/");
    }

    #[tokio::test]
    async fn get_json_sends_query_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(query_param("page", "2"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let manager = EndpointManager::new(&server.uri())
            .unwrap()
            .with_token_source(Arc::new(StaticToken));
        let endpoint = manager.subscribe().borrow().clone();

        let pong: Pong = endpoint
            .get_json(endpoint.url(&["ping"]).unwrap(), &[("page", "2".to_string())])
            .await
            .unwrap();

        assert_eq!(pong, Pong { ok: true });
    }

    #[tokio::test]
    async fn error_envelope_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attachments"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"message": "Unsupported file type"})),
            )
            .mount(&server)
            .await;

        let endpoint = Endpoint::new(Client::new(), &server.uri()).unwrap();
        let err = endpoint
            .post_json::<_, serde_json::Value>(
                endpoint.url(&["attachments"]).unwrap(),
                &serde_json::json!({"attachments": []}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(err.server_message(), Some("Unsupported file type"));
    }
}
