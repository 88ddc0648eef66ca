//! Two-stage confirmation tracking of a force-included transaction.
//!
//! ```text
//! Idle ──begin──▶ AwaitingL1 ──receipt ok──▶ L1Confirmed ──derived hash──▶ AwaitingL2 ──receipt ok──▶ L2Confirmed
//!                     │                           └──no derived hash: terminal     │
//!                     └──────────── watch error / revert ──▶ Failed ◀──────────────┘
//! ```
//!
//! The tracker only reacts to watch results; polling is done by the caller.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use uncensored_sdk::InclusionSdk;
use uncensored_types::{chains, L2Chain, Result, TxReceipt, UncensoredError};

use crate::notice::{Notice, NoticeLevel, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Idle,
    AwaitingL1,
    L1Confirmed,
    AwaitingL2,
    L2Confirmed,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::L1Confirmed | Stage::L2Confirmed | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State of the current force-inclusion attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAttempt {
    pub target: L2Chain,
    pub l1_chain_id: u64,
    pub l2_chain_id: u64,
    pub l1_tx_hash: Option<B256>,
    pub l2_tx_hash: Option<B256>,
    pub stage: Stage,
    /// Reason of the failure when `stage` is `Failed`.
    pub error: Option<String>,
}

/// Observable state of a receipt watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchStatus {
    Pending,
    Success(TxReceipt),
    Error(String),
}

impl From<Result<TxReceipt>> for WatchStatus {
    fn from(result: Result<TxReceipt>) -> Self {
        match result {
            Ok(receipt) => WatchStatus::Success(receipt),
            Err(e) => WatchStatus::Error(e.to_string()),
        }
    }
}

/// Tracker event for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    StageChanged { from: Stage, to: Stage },
    WatchStarted { chain_id: u64, tx_hash: B256 },
}

/// Callback type for tracker events.
pub type TrackerEventHandler = Box<dyn Fn(TrackerEvent) + Send + Sync>;

/// Drives a [`SubmissionAttempt`] through its stages.
pub struct ConfirmationTracker {
    attempt: SubmissionAttempt,
    notifier: Arc<dyn Notifier>,
    on_event: Option<TrackerEventHandler>,
}

impl ConfirmationTracker {
    pub fn new(notifier: Arc<dyn Notifier>, on_event: Option<TrackerEventHandler>) -> Self {
        Self { attempt: SubmissionAttempt::default(), notifier, on_event }
    }

    pub fn attempt(&self) -> &SubmissionAttempt {
        &self.attempt
    }

    fn emit(&self, event: TrackerEvent) {
        if let Some(ref handler) = self.on_event {
            handler(event);
        }
    }

    fn transition(&mut self, to: Stage) {
        let from = self.attempt.stage;
        self.attempt.stage = to;
        tracing::debug!(%from, %to, "submission stage changed");
        self.emit(TrackerEvent::StageChanged { from, to });
    }

    fn notify(&self, chain_id: u64, tx_hash: B256, level: NoticeLevel, message: String) {
        let key = tx_hash.to_string();
        self.notifier.show(Notice {
            link: Some(chains::tx_url(Some(chain_id), &key)),
            key,
            level,
            message,
        });
    }

    fn fail(&mut self, chain_id: u64, tx_hash: B256, reason: String) {
        tracing::warn!(%tx_hash, chain_id, %reason, "submission failed");
        let message = format!("Transaction failed: {}", reason);
        self.notify(chain_id, tx_hash, NoticeLevel::Failure, message);
        self.attempt.error = Some(reason);
        self.transition(Stage::Failed);
    }

    fn expect_stage(&self, expected: Stage, event: &'static str) -> Result<()> {
        if self.attempt.stage != expected {
            return Err(UncensoredError::InvalidTransition {
                stage: self.attempt.stage.to_string(),
                event,
            });
        }
        Ok(())
    }

    /// Reject a watch result for a hash this attempt does not track, and drop
    /// its leftover notice from a replaced attempt.
    fn reject_stale(&self, tx_hash: B256, event: &'static str) -> Result<()> {
        if self.attempt.l1_tx_hash == Some(tx_hash) || self.attempt.l2_tx_hash == Some(tx_hash) {
            return Ok(());
        }
        tracing::debug!(%tx_hash, "ignoring result of a replaced attempt");
        self.notifier.dismiss(&tx_hash.to_string());
        Err(UncensoredError::InvalidTransition {
            stage: format!("tracking {:?}", self.attempt.l1_tx_hash),
            event,
        })
    }

    /// Start tracking a freshly broadcast L1 transaction, replacing any previous attempt.
    pub fn begin(&mut self, target: L2Chain, l1_chain_id: u64, l2_chain_id: u64, l1_tx_hash: B256) {
        self.attempt = SubmissionAttempt {
            target,
            l1_chain_id,
            l2_chain_id,
            ..Default::default()
        };
        self.attempt.l1_tx_hash = Some(l1_tx_hash);
        self.transition(Stage::AwaitingL1);
        self.emit(TrackerEvent::WatchStarted { chain_id: l1_chain_id, tx_hash: l1_tx_hash });
        self.notify(
            l1_chain_id,
            l1_tx_hash,
            NoticeLevel::Loading,
            "Waiting for L1 transaction".into(),
        );
    }

    /// React to the L1 watch. Returns the L2 hash to watch next, if any.
    pub fn on_l1_status(
        &mut self,
        l1_tx_hash: B256,
        status: WatchStatus,
        sdk: &dyn InclusionSdk,
    ) -> Result<Option<B256>> {
        self.reject_stale(l1_tx_hash, "handle a receipt of another L1 transaction")?;
        self.expect_stage(Stage::AwaitingL1, "handle an L1 receipt")?;
        if self.attempt.l1_tx_hash != Some(l1_tx_hash) {
            return Err(UncensoredError::InvalidTransition {
                stage: format!("tracking {:?}", self.attempt.l1_tx_hash),
                event: "handle a receipt of another L1 transaction",
            });
        }
        let l1_chain_id = self.attempt.l1_chain_id;

        let receipt = match status {
            WatchStatus::Pending => return Ok(None),
            WatchStatus::Error(reason) => {
                self.fail(l1_chain_id, l1_tx_hash, reason);
                return Ok(None);
            }
            WatchStatus::Success(receipt) => receipt,
        };
        if !receipt.succeeded() {
            self.fail(l1_chain_id, l1_tx_hash, "reverted on L1".into());
            return Ok(None);
        }

        self.transition(Stage::L1Confirmed);
        let message = "L1 transaction confirmed".to_string();
        self.notify(l1_chain_id, l1_tx_hash, NoticeLevel::Success, message);

        let l2_chain_id = self.attempt.l2_chain_id;
        let hashes = match sdk.l2_tx_hashes(&receipt, l2_chain_id) {
            Ok(hashes) => hashes,
            Err(e) => {
                self.fail(l1_chain_id, l1_tx_hash, format!("cannot derive L2 transaction: {}", e));
                return Ok(None);
            }
        };

        let Some(&l2_tx_hash) = hashes.first() else {
            tracing::info!(%l1_tx_hash, "no L2 transaction derived from L1 receipt");
            return Ok(None);
        };
        self.attempt.l2_tx_hash = Some(l2_tx_hash);
        self.transition(Stage::AwaitingL2);
        self.emit(TrackerEvent::WatchStarted { chain_id: l2_chain_id, tx_hash: l2_tx_hash });
        let message = "Waiting for L2 transaction".to_string();
        self.notify(l2_chain_id, l2_tx_hash, NoticeLevel::Loading, message);
        Ok(Some(l2_tx_hash))
    }

    /// React to the L2 watch.
    pub fn on_l2_status(&mut self, l2_tx_hash: B256, status: WatchStatus) -> Result<()> {
        self.reject_stale(l2_tx_hash, "handle a receipt of another L2 transaction")?;
        self.expect_stage(Stage::AwaitingL2, "handle an L2 receipt")?;
        if self.attempt.l2_tx_hash != Some(l2_tx_hash) {
            return Err(UncensoredError::InvalidTransition {
                stage: format!("tracking {:?}", self.attempt.l2_tx_hash),
                event: "handle a receipt of another L2 transaction",
            });
        }
        let l2_chain_id = self.attempt.l2_chain_id;

        match status {
            WatchStatus::Pending => {}
            WatchStatus::Error(reason) => self.fail(l2_chain_id, l2_tx_hash, reason),
            WatchStatus::Success(receipt) if !receipt.succeeded() => {
                self.fail(l2_chain_id, l2_tx_hash, "reverted on L2".into())
            }
            WatchStatus::Success(_) => {
                self.transition(Stage::L2Confirmed);
                self.notify(
                    l2_chain_id,
                    l2_tx_hash,
                    NoticeLevel::Success,
                    "L2 transaction confirmed".into(),
                );
            }
        }
        Ok(())
    }

    /// Drop the notices of the current attempt. Receipt watches keep running.
    pub fn dismiss_notices(&self) {
        for hash in [self.attempt.l1_tx_hash, self.attempt.l2_tx_hash].into_iter().flatten() {
            self.notifier.dismiss(&hash.to_string());
        }
    }
}
