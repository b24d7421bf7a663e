//! Model catalog discovery.
//!
//! Given a provider endpoint and an optional API key, fetches `GET
//! {endpoint}/models` and normalizes whatever the provider answers into
//! [`Model`] records. Providers disagree on payload shape (a bare array,
//! `{"models": [...]}` or `{"data": [...]}`) and rarely tag capabilities
//! explicitly, so the client is tolerant on the way in and infers
//! capabilities from model metadata when it has to.

use async_trait::async_trait;
use aw_types::{CapabilityId, Model};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Why a catalog fetch produced no model list.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The endpoint answered with a non-success status.
    #[error("models request failed: {status} {status_text}")]
    Http { status: u16, status_text: String },
    /// The request never produced an HTTP response.
    #[error("models request unreachable: {0}")]
    Network(String),
    /// The response parsed as JSON but matched none of the known shapes.
    #[error("unrecognized models payload: {shape}")]
    Format { shape: String },
}

/// Raw outcome of one catalog request. Status interpretation stays with
/// the client so transports can stay dumb.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// One HTTP GET, abstracted so native (reqwest) and browser (fetch)
/// transports can back the same client.
#[async_trait(?Send)]
pub trait CatalogTransport {
    /// Errors are transport-level only (DNS, refused connection, CORS).
    /// A served error status is a normal `Ok` response.
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<TransportResponse, String>;
}

/// Object-safe surface the controller consumes.
#[async_trait(?Send)]
pub trait ModelCatalog {
    async fn fetch_models(&self, endpoint: &str, api_key: &str) -> Result<Vec<Model>, CatalogError>;
}

/// Catalog client over a pluggable transport.
pub struct ModelCatalogClient<T> {
    transport: T,
}

impl<T: CatalogTransport> ModelCatalogClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait(?Send)]
impl<T: CatalogTransport> ModelCatalog for ModelCatalogClient<T> {
    async fn fetch_models(&self, endpoint: &str, api_key: &str) -> Result<Vec<Model>, CatalogError> {
        let url = models_url(endpoint);
        let bearer = (!api_key.is_empty()).then_some(api_key);
        let response = self
            .transport
            .get(&url, bearer)
            .await
            .map_err(CatalogError::Network)?;
        if !(200..300).contains(&response.status) {
            return Err(CatalogError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }
        let payload: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|err| CatalogError::Format {
                shape: format!("not JSON ({err})"),
            })?;
        let items = extract_items(&payload)?;

        let mut models = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<CatalogItem>(item.clone()) {
                Ok(item) => models.push(item.into_model()),
                Err(err) => warn!(%err, "skipping malformed catalog entry"),
            }
        }
        Ok(models)
    }
}

/// `{endpoint}/models`, trimming at most one trailing slash off the
/// endpoint so `https://x/` and `https://x` request the same URL.
fn models_url(endpoint: &str) -> String {
    let base = endpoint.strip_suffix('/').unwrap_or(endpoint);
    format!("{base}/models")
}

/// Accepts a bare array, `{"models": [...]}` or `{"data": [...]}`, in
/// that order of preference.
fn extract_items(payload: &serde_json::Value) -> Result<&Vec<serde_json::Value>, CatalogError> {
    if let Some(items) = payload.as_array() {
        return Ok(items);
    }
    for key in ["models", "data"] {
        if let Some(items) = payload.get(key).and_then(|v| v.as_array()) {
            return Ok(items);
        }
    }
    let shape = describe_shape(payload);
    warn!(%shape, "models payload matched no known shape");
    Err(CatalogError::Format { shape })
}

fn describe_shape(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        serde_json::Value::Null => "null".into(),
        serde_json::Value::Bool(_) => "boolean".into(),
        serde_json::Value::Number(_) => "number".into(),
        serde_json::Value::String(_) => "string".into(),
        serde_json::Value::Array(_) => "array".into(),
    }
}

/// One entry as providers actually serve it. Everything beyond `id` is
/// optional.
#[derive(Debug, Deserialize)]
struct CatalogItem {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    capabilities: Option<Vec<String>>,
    #[serde(default)]
    features: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl CatalogItem {
    fn into_model(self) -> Model {
        let capabilities = self.capabilities();
        let display_name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.id.clone(),
        };
        Model {
            id: self.id,
            display_name,
            capabilities,
        }
    }

    /// An explicit capability list wins when it names at least one known
    /// capability; otherwise fall through to keyword inference.
    fn capabilities(&self) -> Vec<CapabilityId> {
        if let Some(explicit) = &self.capabilities {
            let mut known = Vec::new();
            for value in explicit {
                if let Some(capability) = CapabilityId::parse(value) {
                    if !known.contains(&capability) {
                        known.push(capability);
                    }
                }
            }
            if !known.is_empty() {
                return known;
            }
        }
        infer_capabilities(&self.id, self.kind.as_deref(), self.features.as_deref())
    }
}

const CAPABILITY_KEYWORDS: &[(CapabilityId, &[&str])] = &[
    (CapabilityId::Llm, &["language", "llm", "chat", "text"]),
    (CapabilityId::Vlm, &["vision", "vlm", "image", "visual"]),
    (CapabilityId::Sst, &["speech", "sst", "transcrib"]),
    (CapabilityId::Tts, &["tts", "text-to-speech", "synthesis"]),
];

/// Scans the model's id, type and feature tags for capability keywords.
/// A model matching nothing is assumed to be a plain language model.
fn infer_capabilities(id: &str, kind: Option<&str>, features: Option<&[String]>) -> Vec<CapabilityId> {
    let mut haystack = id.to_lowercase();
    if let Some(kind) = kind {
        haystack.push(' ');
        haystack.push_str(&kind.to_lowercase());
    }
    for feature in features.unwrap_or_default() {
        haystack.push(' ');
        haystack.push_str(&feature.to_lowercase());
    }

    let mut capabilities = Vec::new();
    for (capability, keywords) in CAPABILITY_KEYWORDS {
        if keywords.iter().any(|keyword| haystack.contains(keyword)) {
            capabilities.push(*capability);
        }
    }
    if capabilities.is_empty() {
        capabilities.push(CapabilityId::Llm);
    }
    capabilities
}

/// reqwest-backed transport for native builds.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
#[async_trait(?Send)]
impl CatalogTransport for HttpTransport {
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<TransportResponse, String> {
        let mut request = self.client.get(url).header("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|err| err.to_string())?;
        let status = response.status();
        let body = response.text().await.map_err(|err| err.to_string())?;
        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_owned(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CannedTransport {
        status: u16,
        body: String,
        seen_url: RefCell<Option<String>>,
        seen_bearer: RefCell<Option<Option<String>>>,
    }

    impl CannedTransport {
        fn ok(body: &str) -> Self {
            Self::status(200, body)
        }

        fn status(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_owned(),
                seen_url: RefCell::new(None),
                seen_bearer: RefCell::new(None),
            }
        }
    }

    #[async_trait(?Send)]
    impl<'a> CatalogTransport for &'a CannedTransport {
        async fn get(&self, url: &str, bearer: Option<&str>) -> Result<TransportResponse, String> {
            *self.seen_url.borrow_mut() = Some(url.to_owned());
            *self.seen_bearer.borrow_mut() = Some(bearer.map(str::to_owned));
            Ok(TransportResponse {
                status: self.status,
                status_text: if self.status == 500 {
                    "Internal Server Error".to_owned()
                } else {
                    "OK".to_owned()
                },
                body: self.body.clone(),
            })
        }
    }

    fn caps(model: &Model) -> Vec<CapabilityId> {
        model.capabilities.clone()
    }

    #[test]
    fn models_url_trims_exactly_one_trailing_slash() {
        assert_eq!(models_url("https://api.example.com/v1"), "https://api.example.com/v1/models");
        assert_eq!(models_url("https://api.example.com/v1/"), "https://api.example.com/v1/models");
        assert_eq!(models_url("https://api.example.com/v1//"), "https://api.example.com/v1//models");
    }

    #[tokio::test]
    async fn bearer_header_follows_the_api_key() -> anyhow::Result<()> {
        let transport = CannedTransport::ok("[]");
        let client = ModelCatalogClient::new(&transport);

        client.fetch_models("https://x", "").await?;
        assert_eq!(transport.seen_bearer.borrow().clone(), Some(None));

        client.fetch_models("https://x", "sk-test-123").await?;
        assert_eq!(
            transport.seen_bearer.borrow().clone(),
            Some(Some("sk-test-123".to_owned()))
        );
        assert_eq!(transport.seen_url.borrow().clone(), Some("https://x/models".to_owned()));
        Ok(())
    }

    #[tokio::test]
    async fn accepts_all_three_payload_shapes() -> anyhow::Result<()> {
        for body in [
            r#"[{"id": "m1"}]"#,
            r#"{"models": [{"id": "m1"}]}"#,
            r#"{"data": [{"id": "m1"}]}"#,
        ] {
            let transport = CannedTransport::ok(body);
            let models = ModelCatalogClient::new(&transport)
                .fetch_models("https://x", "")
                .await?;
            assert_eq!(models.len(), 1);
            assert_eq!(models[0].id, "m1");
        }
        Ok(())
    }

    #[tokio::test]
    async fn models_key_wins_over_data_key() -> anyhow::Result<()> {
        let transport = CannedTransport::ok(r#"{"data": [{"id": "lose"}], "models": [{"id": "win"}]}"#);
        let models = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await?;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "win");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_shape_is_a_format_error() -> anyhow::Result<()> {
        let transport = CannedTransport::ok(r#"{"items": [], "total": 0}"#);
        let err = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await
            .unwrap_err();
        match err {
            CatalogError::Format { shape } => assert_eq!(shape, "object with keys [items, total]"),
            other => panic!("expected Format, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn non_json_body_is_a_format_error() -> anyhow::Result<()> {
        let transport = CannedTransport::ok("<html>not json</html>");
        let err = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Format { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn served_error_status_is_an_http_error() -> anyhow::Result<()> {
        let transport = CannedTransport::status(500, "boom");
        let err = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await
            .unwrap_err();
        match err {
            CatalogError::Http { status, status_text } => {
                assert_eq!(status, 500);
                assert_eq!(status_text, "Internal Server Error");
            }
            other => panic!("expected Http, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped_not_fatal() -> anyhow::Result<()> {
        let transport = CannedTransport::ok(r#"[{"id": "good"}, {"name": "no id"}, 7]"#);
        let models = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await?;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "good");
        Ok(())
    }

    #[tokio::test]
    async fn display_name_prefers_name_then_id() -> anyhow::Result<()> {
        let transport = CannedTransport::ok(r#"[{"id": "m1", "name": "Model One"}, {"id": "m2"}, {"id": "m3", "name": ""}]"#);
        let models = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await?;
        assert_eq!(models[0].display_name, "Model One");
        assert_eq!(models[1].display_name, "m2");
        assert_eq!(models[2].display_name, "m3");
        Ok(())
    }

    #[test]
    fn keyword_inference_covers_each_capability() {
        assert_eq!(infer_capabilities("chat-basic", None, None), vec![CapabilityId::Llm]);
        assert_eq!(infer_capabilities("image-gen", None, None), vec![CapabilityId::Vlm]);
        assert_eq!(infer_capabilities("whisper-transcribe", None, None), vec![CapabilityId::Sst]);
        assert_eq!(infer_capabilities("voice-synthesis", None, None), vec![CapabilityId::Tts]);
    }

    #[test]
    fn chat_vision_pro_is_both_llm_and_vlm() {
        assert_eq!(
            infer_capabilities("chat-vision-pro", None, None),
            vec![CapabilityId::Llm, CapabilityId::Vlm]
        );
    }

    #[test]
    fn unmatched_model_defaults_to_llm() {
        assert_eq!(infer_capabilities("mystery-9000", None, None), vec![CapabilityId::Llm]);
    }

    #[test]
    fn inference_reads_type_and_features_too() {
        assert_eq!(
            infer_capabilities("m1", Some("vision"), None),
            vec![CapabilityId::Vlm]
        );
        assert_eq!(
            infer_capabilities("m2", None, Some(&["tts".to_owned()])),
            vec![CapabilityId::Tts]
        );
    }

    #[tokio::test]
    async fn explicit_capabilities_override_inference() -> anyhow::Result<()> {
        let transport =
            CannedTransport::ok(r#"[{"id": "chat-vision-pro", "capabilities": ["TTS", "bogus"]}]"#);
        let models = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await?;
        assert_eq!(caps(&models[0]), vec![CapabilityId::Tts]);
        Ok(())
    }

    #[tokio::test]
    async fn all_unknown_explicit_capabilities_fall_back_to_inference() -> anyhow::Result<()> {
        let transport = CannedTransport::ok(r#"[{"id": "whisper-speech", "capabilities": ["bogus"]}]"#);
        let models = ModelCatalogClient::new(&transport)
            .fetch_models("https://x", "")
            .await?;
        assert_eq!(caps(&models[0]), vec![CapabilityId::Sst]);
        Ok(())
    }
}
