//! External service clients for dsprobe
//!
//! This crate holds the seams to everything dsprobe calls but does not
//! implement:
//!
//! - `Backend`: wallet generation, UTXO index and attack endpoints
//! - `PriceSource`: the BTC/USD rate
//! - `WalletProvisioner`, `UtxoResolver`, `AmountConverter`: the leaf
//!   workflow steps built on those seams
//!
//! # Example
//!
//! ```no_run
//! use dsprobe_client::{EndpointMap, HttpBackend, UtxoResolver};
//! use dsprobe_core::Network;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(HttpBackend::new(EndpointMap::new("http://127.0.0.1:8000")));
//!     let utxo = UtxoResolver::new(backend)
//!         .resolve("tb1q...", Network::Testnet)
//!         .await?;
//!     println!("{}", utxo);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod endpoints;
pub mod http;
pub mod price;
pub mod utxo;
pub mod wallet;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::{Backend, PriceSource};
pub use endpoints::EndpointMap;
pub use http::{CoinGeckoPriceSource, HttpBackend, COINGECKO_PRICE_URL, DEFAULT_TIMEOUT};
pub use price::{AmountConverter, Conversion};
pub use utxo::UtxoResolver;
pub use wallet::{GeneratedWallet, WalletProvisioner};
