//! Key pair and address provisioning through the backend

use crate::backend::Backend;
use dsprobe_core::{Error, Network, ResponseBody, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A freshly generated key and the address the backend recommends spending from
#[derive(Clone, PartialEq)]
pub struct GeneratedWallet {
    pub signing_key: String,
    pub recommended_address: String,
}

impl fmt::Debug for GeneratedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedWallet")
            .field("signing_key", &"<redacted>")
            .field("recommended_address", &self.recommended_address)
            .finish()
    }
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Requests key generation. Never retries, so a failure cannot leave a trail of unused keys.
pub struct WalletProvisioner {
    backend: Arc<dyn Backend>,
}

impl WalletProvisioner {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, network: Network) -> Result<GeneratedWallet> {
        info!(network = %network, "Requesting wallet generation");

        let raw = self.backend.generate_wallet(network).await?;
        let body = ResponseBody::parse(&raw.body);

        if let Some(message) = body.error_message() {
            warn!(status = raw.status, error = %message, "Backend refused wallet generation");
            return Err(Error::service(Some(raw.status), message));
        }
        if !raw.is_success() {
            return Err(Error::service(Some(raw.status), raw.body));
        }

        let json = body
            .as_json()
            .ok_or_else(|| Error::service(Some(raw.status), "wallet response is not JSON"))?;
        let signing_key = str_field(json, &["wif", "signingKey"]).ok_or_else(|| {
            Error::service(Some(raw.status), "wallet response missing signing key")
        })?;
        let recommended_address = str_field(json, &["recommended_address"]).ok_or_else(|| {
            Error::service(Some(raw.status), "wallet response missing recommended_address")
        })?;

        info!(
            network = %network,
            address = %recommended_address,
            "Wallet generated"
        );

        Ok(GeneratedWallet {
            signing_key: signing_key.to_string(),
            recommended_address: recommended_address.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockCall};
    use dsprobe_core::RawResponse;

    fn provisioner(backend: MockBackend) -> (Arc<MockBackend>, WalletProvisioner) {
        let backend = Arc::new(backend);
        (backend.clone(), WalletProvisioner::new(backend))
    }

    #[tokio::test]
    async fn test_generate_accepts_wif() {
        let (backend, wallets) = provisioner(MockBackend::new());
        let wallet = wallets.generate(Network::Testnet).await.unwrap();

        assert_eq!(wallet.signing_key, "cTestKey");
        assert_eq!(wallet.recommended_address, "tb1qmockattacker");
        assert_eq!(backend.calls(), vec![MockCall::GenerateWallet(Network::Testnet)]);
    }

    #[tokio::test]
    async fn test_generate_accepts_signing_key_alias() {
        let (_, wallets) = provisioner(MockBackend::new().with_wallet(Ok(RawResponse::new(
            200,
            r#"{"signingKey":"L1aW4aub","recommended_address":"bc1qabc"}"#,
        ))));
        let wallet = wallets.generate(Network::Mainnet).await.unwrap();
        assert_eq!(wallet.signing_key, "L1aW4aub");
        assert_eq!(wallet.recommended_address, "bc1qabc");
    }

    #[tokio::test]
    async fn test_error_field_surfaced_verbatim() {
        let (backend, wallets) = provisioner(MockBackend::new().with_wallet(Ok(
            RawResponse::new(200, r#"{"error":"keygen unavailable"}"#),
        )));
        let err = wallets.generate(Network::Testnet).await.unwrap_err();

        assert_eq!(err, Error::service(Some(200), "keygen unavailable"));
        // no retry
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_not_retried() {
        let (backend, wallets) = provisioner(
            MockBackend::new().with_wallet(Err(Error::transport("connection refused"))),
        );
        let err = wallets.generate(Network::Testnet).await.unwrap_err();

        assert_eq!(err, Error::transport("connection refused"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (_, wallets) = provisioner(
            MockBackend::new().with_wallet(Ok(RawResponse::new(502, "Bad Gateway"))),
        );
        let err = wallets.generate(Network::Testnet).await.unwrap_err();
        assert_eq!(err, Error::service(Some(502), "Bad Gateway"));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_, wallets) = provisioner(MockBackend::new().with_wallet(Ok(RawResponse::new(
            200,
            r#"{"recommended_address":"tb1q"}"#,
        ))));
        let err = wallets.generate(Network::Testnet).await.unwrap_err();
        assert!(err.to_string().contains("missing signing key"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = GeneratedWallet {
            signing_key: "cSecret".into(),
            recommended_address: "tb1q".into(),
        };
        let rendered = format!("{:?}", wallet);
        assert!(!rendered.contains("cSecret"));
        assert!(rendered.contains("tb1q"));
    }
}
