//! Backend trait
//!
//! The backend builds, signs and broadcasts transactions. dsprobe only talks
//! to it through this request/response seam, so the transport stays dumb:
//! every method returns the raw status and body, and interpretation happens
//! in the components that call it.

use async_trait::async_trait;
use dsprobe_core::{AttackKind, Network, RawResponse, Result};
use serde_json::Value;

#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST {network}` to the key-generation endpoint
    async fn generate_wallet(&self, network: Network) -> Result<RawResponse>;

    /// `GET ?address=&network=` against the UTXO index
    async fn list_utxos(&self, address: &str, network: Network) -> Result<RawResponse>;

    /// `POST` an attack request body to the endpoint bound to `kind`
    async fn dispatch(&self, kind: AttackKind, body: &Value) -> Result<RawResponse>;
}

/// Source of the BTC/USD exchange rate
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current rate, or `None` when the source has no usable quote
    async fn btc_usd(&self) -> Result<Option<f64>>;
}
