//! Browser HTTP transport for the model catalog, backed by `gloo-net`.

use async_trait::async_trait;
use aw_catalog::{CatalogTransport, TransportResponse};

pub struct FetchTransport;

#[async_trait(?Send)]
impl CatalogTransport for FetchTransport {
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<TransportResponse, String> {
        let mut request = gloo_net::http::Request::get(url).header("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let status_text = response.status_text();
        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(TransportResponse {
            status,
            status_text,
            body,
        })
    }
}
