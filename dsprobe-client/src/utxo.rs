//! Spendable output discovery through the backend's UTXO index

use crate::backend::Backend;
use dsprobe_core::{Error, Network, ResponseBody, Result, Utxo};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Picks the output an attack will spend.
///
/// Selection takes the first output in the order the index returns them.
/// It does not check that the value covers the send amount plus fee; the
/// backend rejects an underfunded spend.
pub struct UtxoResolver {
    backend: Arc<dyn Backend>,
}

impl UtxoResolver {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn resolve(&self, address: &str, network: Network) -> Result<Utxo> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::MissingAddress);
        }

        debug!(address, network = %network, "Resolving UTXO");
        let raw = self.backend.list_utxos(address, network).await?;
        let body = ResponseBody::parse(&raw.body);

        if let Some(message) = body.error_message() {
            return Err(Error::service(Some(raw.status), message));
        }
        if !raw.is_success() {
            return Err(Error::service(Some(raw.status), raw.body));
        }

        let first = body
            .lookup(&["utxos"])
            .and_then(Value::as_array)
            .and_then(|utxos| utxos.first())
            .filter(|entry| !entry.is_null())
            .ok_or_else(|| Error::NoUtxoFound {
                address: address.to_string(),
            })?;

        let utxo: Utxo = serde_json::from_value(first.clone()).map_err(|e| {
            Error::service(Some(raw.status), format!("malformed utxo entry: {}", e))
        })?;

        info!(
            address,
            network = %network,
            outpoint = %utxo.outpoint(),
            value = utxo.value,
            "UTXO selected"
        );
        Ok(utxo)
    }
}
