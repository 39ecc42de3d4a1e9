//! Attack orchestrator
//!
//! The `AttackOrchestrator` owns one [`Session`] and drives it through the
//! workflow:
//!
//! ```text
//! Idle -> WalletPending -> WalletReady -> UtxoPending -> UtxoReady
//!      -> Configured -> Executing -> Completed | Failed
//! ```
//!
//! - Every external call is awaited in the order the operator drives it
//! - At most one `execute` is in flight per orchestrator
//! - `Completed` and `Failed` accept another `execute`, which is how
//!   delayed-doublespend chains off a previous result
//! - Every outbound call is bounded by `OrchestratorConfig::call_timeout`

use crate::executor::{AttackExecutor, AttackOutcome};
use crate::payload::{AttackRequest, PayloadBuilder};
use dsprobe_client::{
    AmountConverter, Backend, Conversion, GeneratedWallet, PriceSource, UtxoResolver,
    WalletProvisioner, DEFAULT_TIMEOUT,
};
use dsprobe_core::{
    Error, OrchestratorState, Result, ResultView, Session, SessionUpdate, Utxo,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on every outbound call
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    state: OrchestratorState,
    view: Option<ResultView>,
}

/// State machine coordinating one attack session
pub struct AttackOrchestrator {
    /// Session ID
    id: Uuid,
    backend: Arc<dyn Backend>,
    wallets: WalletProvisioner,
    utxos: UtxoResolver,
    converter: AmountConverter,
    config: OrchestratorConfig,
    inner: Mutex<Inner>,
    /// Set while an execute is in flight
    busy: AtomicBool,
    in_flight: Mutex<Option<CancellationToken>>,
}

/// Releases the busy flag when an execute ends, however it ends.
///
/// If the execute future was dropped mid-dispatch the session would still
/// read `Executing`; the guard moves it to `Failed` with a cancellation.
struct ExecutionGuard<'a> {
    orchestrator: &'a AttackOrchestrator,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        let orch = self.orchestrator;
        orch.in_flight.lock().take();
        {
            let mut inner = orch.inner.lock();
            if inner.state == OrchestratorState::Executing {
                warn!(session = %orch.id, "Execute aborted before completion");
                inner.state = OrchestratorState::Failed;
                inner.view = Some(ResultView::error(Error::Cancelled));
            }
        }
        orch.busy.store(false, Ordering::Release);
    }
}

impl AttackOrchestrator {
    /// Create an orchestrator with a fresh default session
    pub fn new(backend: Arc<dyn Backend>, prices: Arc<dyn PriceSource>) -> Self {
        Self::with_config(backend, prices, OrchestratorConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn Backend>,
        prices: Arc<dyn PriceSource>,
        config: OrchestratorConfig,
    ) -> Self {
        let id = Uuid::now_v7();
        info!(session = %id, "Creating new AttackOrchestrator");
        Self {
            id,
            wallets: WalletProvisioner::new(backend.clone()),
            utxos: UtxoResolver::new(backend.clone()),
            converter: AmountConverter::new(prices),
            backend,
            config,
            inner: Mutex::new(Inner::default()),
            busy: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        self.inner.lock().state
    }

    /// Snapshot of the session
    pub fn session(&self) -> Session {
        self.inner.lock().session.clone()
    }

    /// What the operator should currently see
    pub fn view(&self) -> Option<ResultView> {
        self.inner.lock().view.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The request `execute` would send right now
    pub fn preview(&self) -> AttackRequest {
        PayloadBuilder::build_selected(&self.inner.lock().session)
    }

    /// Bound an outbound call by the configured timeout
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::transport(format!(
                "request timed out after {:?}",
                self.config.call_timeout
            ))),
        }
    }

    /// Enter a pending state, returning the state to restore on failure
    fn begin(&self, operation: &'static str, pending: OrchestratorState) -> Result<OrchestratorState> {
        let mut inner = self.inner.lock();
        if inner.state.is_pending() {
            return Err(Error::InvalidState {
                operation,
                state: inner.state.to_string(),
            });
        }
        let previous = inner.state;
        inner.state = pending;
        debug!(session = %self.id, from = %previous, to = %pending, "State transition");
        Ok(previous)
    }

    fn fail_view(&self, err: &Error) {
        self.inner.lock().view = Some(ResultView::error(err));
    }

    /// Ask the backend for a new key pair and adopt its recommended address
    pub async fn generate_wallet(&self) -> Result<GeneratedWallet> {
        let network = self.inner.lock().session.network;
        let previous = self.begin("generate a wallet", OrchestratorState::WalletPending)?;

        let result = self.bounded(self.wallets.generate(network)).await;

        let mut inner = self.inner.lock();
        match result {
            Ok(wallet) => {
                inner.session.signing_key = wallet.signing_key.clone();
                inner.session.attacker_address = wallet.recommended_address.clone();
                inner.state = OrchestratorState::WalletReady;
                info!(
                    session = %self.id,
                    address = %wallet.recommended_address,
                    "Wallet ready"
                );
                Ok(wallet)
            }
            Err(err) => {
                warn!(session = %self.id, error = %err, "Wallet generation failed");
                inner.state = previous;
                inner.view = Some(ResultView::error(&err));
                Err(err)
            }
        }
    }

    /// Look up the first spendable output of the attacker address
    pub async fn fetch_utxo(&self) -> Result<Utxo> {
        let (address, network) = {
            let inner = self.inner.lock();
            (inner.session.attacker_address.clone(), inner.session.network)
        };
        if address.trim().is_empty() {
            let err = Error::MissingAddress;
            self.fail_view(&err);
            return Err(err);
        }

        self.begin("fetch a UTXO", OrchestratorState::UtxoPending)?;

        let result = self.bounded(self.utxos.resolve(&address, network)).await;

        let mut inner = self.inner.lock();
        match result {
            Ok(utxo) => {
                inner.session.utxo = utxo.clone();
                inner.state = OrchestratorState::UtxoReady;
                Ok(utxo)
            }
            Err(err) => {
                warn!(session = %self.id, address = %address, error = %err, "UTXO lookup failed");
                inner.state = OrchestratorState::WalletReady;
                inner.view = Some(ResultView::error(&err));
                Err(err)
            }
        }
    }

    /// Convert a USD amount into the session's send amount. Advisory only.
    pub async fn convert_amount(&self, usd: &str) -> Result<Conversion> {
        let state = self.state();
        if state == OrchestratorState::Executing {
            return Err(Error::InvalidState {
                operation: "convert",
                state: state.to_string(),
            });
        }

        match self.bounded(self.converter.convert(usd)).await {
            Ok(conversion) => {
                let mut inner = self.inner.lock();
                inner.session.send_amount_sats = conversion.sats;
                inner.session.btc_usd_rate = Some(conversion.rate);
                Ok(conversion)
            }
            Err(err) => {
                self.fail_view(&err);
                Err(err)
            }
        }
    }

    /// Apply user-edited fields.
    ///
    /// The session becomes `Configured` once it has an attacker address, or
    /// immediately for attacks that need no wallet.
    pub fn configure(&self, update: SessionUpdate) -> Result<OrchestratorState> {
        let mut inner = self.inner.lock();
        if inner.state.is_pending() {
            return Err(Error::InvalidState {
                operation: "configure",
                state: inner.state.to_string(),
            });
        }

        inner.session.apply(update)?;

        let ready = inner.session.has_attacker_address()
            || !inner.session.selected_attack.needs_wallet();
        if ready && inner.state != OrchestratorState::Configured {
            debug!(session = %self.id, from = %inner.state, "State transition to configured");
            inner.state = OrchestratorState::Configured;
        }
        Ok(inner.state)
    }

    /// Dispatch the selected attack once.
    ///
    /// A 2xx response without an `error` field completes the session and
    /// becomes `last_result`. Anything else fails it and leaves
    /// `last_result` untouched.
    pub async fn execute(&self) -> Result<AttackOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(session = %self.id, "Execute rejected, another attack is in flight");
            return Err(Error::Busy);
        }
        let _guard = ExecutionGuard { orchestrator: self };

        let request = {
            let mut inner = self.inner.lock();
            if !inner.state.can_execute() {
                return Err(Error::InvalidState {
                    operation: "execute",
                    state: inner.state.to_string(),
                });
            }
            let request = PayloadBuilder::build_selected(&inner.session);
            inner.state = OrchestratorState::Executing;
            inner.view = None;
            request
        };

        let token = CancellationToken::new();
        *self.in_flight.lock() = Some(token.clone());

        let executor = AttackExecutor::new(request.kind(), self.config.call_timeout);
        info!(
            session = %self.id,
            attempt = %executor.id(),
            attack = %request.kind(),
            "Executing attack"
        );
        let result = executor.run(self.backend.as_ref(), &request, token).await;

        let mut inner = self.inner.lock();
        match result {
            Ok(outcome) => match outcome.service_error() {
                None => {
                    inner.session.record_result(outcome.body.clone());
                    inner.state = OrchestratorState::Completed;
                    inner.view = Some(ResultView::Result(outcome.body.clone()));
                    Ok(outcome)
                }
                Some(err) => {
                    inner.state = OrchestratorState::Failed;
                    inner.view = Some(ResultView::Result(outcome.body));
                    Err(err)
                }
            },
            Err(err) => {
                inner.state = OrchestratorState::Failed;
                inner.view = Some(ResultView::error(&err));
                Err(err)
            }
        }
    }

    /// Abort the in-flight execute. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(token) => {
                info!(session = %self.id, "Cancelling in-flight attack");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Empty the displayed result without touching the session
    pub fn clear_result(&self) {
        self.inner.lock().view = None;
    }

    /// Discard the session and start over in `Idle`
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_pending() || self.is_busy() {
            return Err(Error::InvalidState {
                operation: "reset",
                state: inner.state.to_string(),
            });
        }
        *inner = Inner::default();
        info!(session = %self.id, "Session reset");
        Ok(())
    }
}
