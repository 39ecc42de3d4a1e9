//! Attack construction, dispatch and orchestration for dsprobe
//!
//! This crate turns a configured session into attack requests and drives
//! the session workflow. It includes:
//!
//! - `PayloadBuilder`: Projects a session onto the body of one attack variant
//! - `AttackExecutor`: Sends one request with a timeout and cancellation
//! - `AttackOrchestrator`: The session state machine tying wallet, UTXO,
//!   conversion and execution together
//!
//! # Example
//!
//! ```no_run
//! use dsprobe_attack::AttackOrchestrator;
//! use dsprobe_client::{CoinGeckoPriceSource, EndpointMap, HttpBackend};
//! use dsprobe_core::SessionUpdate;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = AttackOrchestrator::new(
//!         Arc::new(HttpBackend::new(EndpointMap::new("http://127.0.0.1:8000"))),
//!         Arc::new(CoinGeckoPriceSource::new()),
//!     );
//!
//!     orchestrator.generate_wallet().await?;
//!     orchestrator.fetch_utxo().await?;
//!     orchestrator.configure(SessionUpdate::new().merchant_address("tb1q..."))?;
//!
//!     let outcome = orchestrator.execute().await?;
//!     println!("{}", outcome.body);
//!     Ok(())
//! }
//! ```

pub mod executor;
pub mod orchestrator;
pub mod payload;

pub use executor::{AttackExecutor, AttackOutcome};
pub use orchestrator::{AttackOrchestrator, OrchestratorConfig};
pub use payload::{AttackRequest, DelayedSpend, PayloadBuilder, SpendParams};
