//! Attack executor that performs a single bounded, cancellable dispatch
//!
//! This module provides the `AttackExecutor` which is responsible for:
//! - Encoding the request body
//! - Sending exactly one request to the attack endpoint
//! - Enforcing the per-call timeout
//! - Honoring cancellation
//! - Logging via tracing

use crate::payload::AttackRequest;
use chrono::{DateTime, Utc};
use dsprobe_client::Backend;
use dsprobe_core::{AttackKind, Error, RawResponse, ResponseBody, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What came back from one dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    /// Attempt ID (UUID v7 for time-ordered tracking)
    pub attempt: Uuid,
    pub kind: AttackKind,
    /// HTTP status
    pub status: u16,
    /// Response body, structured if it parsed
    pub body: ResponseBody,
    pub finished_at: DateTime<Utc>,
}

impl AttackOutcome {
    fn from_raw(attempt: Uuid, kind: AttackKind, raw: RawResponse) -> Self {
        Self {
            attempt,
            kind,
            status: raw.status,
            body: ResponseBody::parse(&raw.body),
            finished_at: Utc::now(),
        }
    }

    /// The service-level failure this response represents, if any.
    ///
    /// Non-2xx statuses and 2xx bodies carrying an `error` field both count.
    pub fn service_error(&self) -> Option<Error> {
        if let Some(message) = self.body.error_message() {
            return Some(Error::service(Some(self.status), message));
        }
        if !(200..300).contains(&self.status) {
            return Some(Error::service(Some(self.status), self.body.render()));
        }
        None
    }

    pub fn is_success(&self) -> bool {
        self.service_error().is_none()
    }
}

/// Runs one attack attempt
pub struct AttackExecutor {
    /// Unique identifier for this attempt
    id: Uuid,
    kind: AttackKind,
    timeout: Duration,
}

impl AttackExecutor {
    pub fn new(kind: AttackKind, timeout: Duration) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Dispatch `request` once.
    ///
    /// Transport failures and timeouts are errors. Any HTTP response, whatever
    /// its status, is an `Ok` outcome for the caller to classify.
    pub async fn run(
        self,
        backend: &dyn Backend,
        request: &AttackRequest,
        cancel: CancellationToken,
    ) -> Result<AttackOutcome> {
        let body = request.to_body()?;
        let id = self.id;
        let kind = self.kind;

        info!(attempt = %id, attack = %kind, "Dispatching attack");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(self.timeout, backend.dispatch(kind, &body)) => match res {
                Ok(inner) => inner,
                Err(_) => Err(Error::transport(format!(
                    "request timed out after {:?}",
                    self.timeout
                ))),
            },
        };

        match result {
            Ok(raw) => {
                let outcome = AttackOutcome::from_raw(id, kind, raw);
                if outcome.is_success() {
                    info!(attempt = %id, attack = %kind, status = outcome.status, "Attack completed");
                } else {
                    warn!(attempt = %id, attack = %kind, status = outcome.status, "Attack rejected by backend");
                }
                Ok(outcome)
            }
            Err(Error::Cancelled) => {
                warn!(attempt = %id, attack = %kind, "Attack cancelled");
                Err(Error::Cancelled)
            }
            Err(e) => {
                error!(attempt = %id, attack = %kind, error = %e, "Attack dispatch failed");
                Err(e)
            }
        }
    }
}
