//! HTTP exchange with the captcha service.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Proxy};

use crate::config::ClientConfig;
use crate::error::{CaptchaError, Result};
use crate::models::{Endpoint, ServiceResponse};

/// Sends an encoded JSON body to an endpoint and decodes the JSON reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, body: Vec<u8>) -> Result<ServiceResponse>;
}

/// [`Transport`] backed by `reqwest`, honoring the proxy and TLS settings of a
/// [`ClientConfig`]. A fresh client is built for every call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    proxy: Option<String>,
    accept_invalid_certs: bool,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            proxy: config.proxy().map(str::to_string),
            accept_invalid_certs: config.accept_invalid_certs(),
        }
    }

    /// Build the one-shot client for a request.
    fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder().danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(proxy_url) = &self.proxy {
            let proxy = Proxy::all(proxy_url.as_str()).map_err(|e| {
                CaptchaError::Config(format!("invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: Endpoint, body: Vec<u8>) -> Result<ServiceResponse> {
        let client = self.build_client()?;

        let response = client
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?
            .json::<ServiceResponse>()
            .await?;

        tracing::trace!("{} -> {:?}", endpoint, response);
        Ok(response)
    }
}
