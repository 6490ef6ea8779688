use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use reqwest::header::ACCEPT;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const USER_AGENT: &str = concat!("mcap-loader/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> RawResponse {
        RawResponse { status, body: body.into() }
    }
}

/// Issues a single GET. Status handling is left to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: Url) -> Result<RawResponse, reqwest::Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: Url) -> Result<RawResponse, reqwest::Error> {
        (**self).get(url).await
    }
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl ReqwestTransport {
    pub fn new(api_key: Option<String>) -> Result<ReqwestTransport, reqwest::Error> {
        let http = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(ReqwestTransport::with_client(http, api_key))
    }

    pub fn with_client(http: reqwest::Client, api_key: Option<String>) -> ReqwestTransport {
        ReqwestTransport { http, api_key }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: Url) -> Result<RawResponse, reqwest::Error> {
        let mut request = self.http.get(url)
            .header(ACCEPT, "application/json");

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn sends_api_key_and_returns_status_and_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/ping")
                .header(API_KEY_HEADER, "demo-key");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"gecko_says":"(V3) To the Moon!"}"#);
        }).await;

        let transport = ReqwestTransport::new(Some("demo-key".into())).unwrap();
        let url = Url::parse(&server.url("/api/v3/ping")).unwrap();
        let response = transport.get(url).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], br#"{"gecko_says":"(V3) To the Moon!"}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/limited");
            then.status(429);
        }).await;

        let transport = ReqwestTransport::new(None).unwrap();
        let url = Url::parse(&server.url("/limited")).unwrap();
        let response = transport.get(url).await.unwrap();

        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
