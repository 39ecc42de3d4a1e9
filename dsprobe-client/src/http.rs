//! reqwest implementations of [`Backend`] and [`PriceSource`]

use crate::backend::{Backend, PriceSource};
use crate::endpoints::EndpointMap;
use async_trait::async_trait;
use dsprobe_core::{AttackKind, Error, Network, RawResponse, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const COINGECKO_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";

fn build_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(
                error = %err,
                "Failed to construct HTTP client with timeout. Falling back to default client."
            );
            reqwest::Client::new()
        }
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::transport(format!("request timed out after {:?}", timeout))
    } else {
        Error::transport(err.to_string())
    }
}

async fn into_raw(response: reqwest::Response, timeout: Duration) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    debug!(status, bytes = body.len(), "Backend response received");
    Ok(RawResponse::new(status, body))
}

/// HTTP client for the attack backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoints: EndpointMap,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(endpoints: EndpointMap) -> Self {
        Self::with_timeout(endpoints, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoints: EndpointMap, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            endpoints,
            timeout,
        }
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn generate_wallet(&self, network: Network) -> Result<RawResponse> {
        let url = self.endpoints.wallet_url();
        debug!(url = %url, network = %network, "POST generate-wallet");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "network": network }))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        into_raw(response, self.timeout).await
    }

    async fn list_utxos(&self, address: &str, network: Network) -> Result<RawResponse> {
        let url = self.endpoints.utxos_url();
        debug!(url = %url, address, network = %network, "GET utxos");

        let response = self
            .client
            .get(&url)
            .query(&[("address", address), ("network", network.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        into_raw(response, self.timeout).await
    }

    async fn dispatch(&self, kind: AttackKind, body: &Value) -> Result<RawResponse> {
        let url = self.endpoints.attack_url(kind);
        debug!(url = %url, attack = %kind, "POST attack");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        into_raw(response, self.timeout).await
    }
}

/// BTC/USD quotes from CoinGecko's simple price API
#[derive(Debug, Clone)]
pub struct CoinGeckoPriceSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl CoinGeckoPriceSource {
    pub fn new() -> Self {
        Self::with_url(COINGECKO_PRICE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_url<S: Into<String>>(url: S, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            url: url.into(),
            timeout,
        }
    }
}

impl Default for CoinGeckoPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull `bitcoin.usd` out of a simple-price response
pub fn parse_price_body(body: &str) -> Result<Option<f64>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::transport(format!("invalid price response: {}", e)))?;
    Ok(value.pointer("/bitcoin/usd").and_then(Value::as_f64))
}

#[async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn btc_usd(&self) -> Result<Option<f64>> {
        debug!(url = %self.url, "Fetching BTC/USD rate");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let raw = into_raw(response, self.timeout).await?;
        if !raw.is_success() {
            return Err(Error::service(Some(raw.status), raw.body));
        }
        parse_price_body(&raw.body)
    }
}
