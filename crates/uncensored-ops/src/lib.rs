//! Submission coordination: direct sends and force inclusion.
//!
//! Coordinates between the wallet, the inclusion SDK and the confirmation
//! tracker to get an L2 transaction included, through L1 if needed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};
use uncensored_sdk::InclusionSdk;
use uncensored_types::{
    chains, L2Chain, Network, Result, TransactionDraft, TxReceipt, TxRequest, UncensoredError,
    ValidatedDraft,
};
use uncensored_wallet::WalletProvider;

pub mod notice;
pub mod tracker;

pub use notice::{Notice, NoticeBoard, NoticeLevel, Notifier, TracingNotifier};
pub use tracker::{
    ConfirmationTracker, Stage, SubmissionAttempt, TrackerEvent, TrackerEventHandler, WatchStatus,
};

/// Notice key of submission failures (before any hash exists).
pub const SUBMISSION_NOTICE_KEY: &str = "submission";

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: Network,
}

/// Result of a submit action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The wallet was on the wrong chain; a switch was requested and nothing was sent.
    SwitchRequested { from: u64, to: u64 },
    /// The wallet accepted and broadcast the transaction.
    Broadcast { chain_id: u64, tx_hash: B256 },
}

/// Result of a full force inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion {
    SwitchRequested { from: u64, to: u64 },
    Tracked(SubmissionAttempt),
}

/// Submits drafts and tracks force-included transactions to completion.
pub struct ForceInclusionClient {
    config: ClientConfig,
    wallet: Arc<dyn WalletProvider>,
    sdk: Arc<dyn InclusionSdk>,
    notifier: Arc<dyn Notifier>,
    tracker: Mutex<ConfirmationTracker>,
}

impl ForceInclusionClient {
    pub fn new(
        config: ClientConfig,
        wallet: Arc<dyn WalletProvider>,
        sdk: Arc<dyn InclusionSdk>,
        notifier: Arc<dyn Notifier>,
        on_event: Option<TrackerEventHandler>,
    ) -> Self {
        let tracker = Mutex::new(ConfirmationTracker::new(notifier.clone(), on_event));
        Self { config, wallet, sdk, notifier, tracker }
    }

    fn tracker(&self) -> MutexGuard<'_, ConfirmationTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current force-inclusion attempt.
    pub fn attempt(&self) -> SubmissionAttempt {
        self.tracker().attempt().clone()
    }

    /// Return `Some(switch outcome)` when the wallet is not on `required`.
    async fn ensure_chain(&self, required: u64) -> Result<Option<SubmitOutcome>> {
        let current = self.wallet.chain_id().await?;
        if current == required {
            return Ok(None);
        }
        tracing::info!(current, required, "wrong network, requesting switch");
        self.wallet.switch_chain(required).await?;
        Ok(Some(SubmitOutcome::SwitchRequested { from: current, to: required }))
    }

    fn report_failure(&self, err: UncensoredError) -> UncensoredError {
        tracing::warn!(error = %err, "submission failed");
        self.notifier.show(Notice {
            key: SUBMISSION_NOTICE_KEY.into(),
            level: NoticeLevel::Failure,
            message: "Transaction failed".into(),
            link: None,
        });
        err
    }

    /// Send the draft as a regular transaction on its L2.
    pub async fn send_direct(&self, draft: &TransactionDraft) -> Result<SubmitOutcome> {
        let tx = draft.validate()?;
        self.submit_direct(&tx).await.map_err(|e| self.report_failure(e))
    }

    async fn submit_direct(&self, tx: &ValidatedDraft) -> Result<SubmitOutcome> {
        let l2_chain_id = tx.target.chain_id(self.config.network);
        if let Some(switch) = self.ensure_chain(l2_chain_id).await? {
            return Ok(switch);
        }
        let request = TxRequest {
            from: None,
            to: tx.to,
            value: tx.value()?,
            data: tx.data.clone(),
            gas: Some(U64::from(tx.gas_limit)),
        };
        let tx_hash = self.wallet.send_transaction(&request).await?;
        Ok(SubmitOutcome::Broadcast { chain_id: l2_chain_id, tx_hash })
    }

    /// Re-encode the draft for its L2's inbox and send it on L1.
    ///
    /// Requires the wallet to be on the designated L1; otherwise one switch is
    /// requested and the caller re-triggers after it completes.
    pub async fn force_submit(&self, draft: &TransactionDraft) -> Result<SubmitOutcome> {
        let tx = draft.validate()?;
        self.submit_forced(&tx).await.map_err(|e| self.report_failure(e))
    }

    async fn submit_forced(&self, tx: &ValidatedDraft) -> Result<SubmitOutcome> {
        let l1_chain_id = self.config.network.l1_chain_id();
        let l2_chain_id = tx.target.chain_id(self.config.network);
        if let Some(switch) = self.ensure_chain(l1_chain_id).await? {
            return Ok(switch);
        }
        let value = tx.value()?;
        let l1_tx = self
            .sdk
            .transform_transaction(tx.to, value, &tx.data, tx.gas_limit, l2_chain_id)?;
        tracing::info!(
            l2 = %tx.target,
            l2_chain_id,
            inbox = %l1_tx.to,
            "force-including transaction"
        );
        let tx_hash = self.wallet.send_transaction(&l1_tx.into()).await?;
        Ok(SubmitOutcome::Broadcast { chain_id: l1_chain_id, tx_hash })
    }

    /// Track a broadcast force-inclusion transaction through both stages.
    pub async fn track(&self, target: L2Chain, l1_tx_hash: B256) -> Result<SubmissionAttempt> {
        let network = self.config.network;
        let l1_chain_id = network.l1_chain_id();
        let l2_chain_id = target.chain_id(network);

        self.tracker().begin(target, l1_chain_id, l2_chain_id, l1_tx_hash);

        let status = WatchStatus::from(self.wallet.wait_for_receipt(l1_chain_id, l1_tx_hash).await);
        let next = self.tracker().on_l1_status(l1_tx_hash, status, self.sdk.as_ref())?;

        if let Some(l2_tx_hash) = next {
            let status =
                WatchStatus::from(self.wallet.wait_for_receipt(l2_chain_id, l2_tx_hash).await);
            self.tracker().on_l2_status(l2_tx_hash, status)?;
        }
        Ok(self.attempt())
    }

    /// Submit through L1 and, once broadcast, track to completion.
    pub async fn force_include(&self, draft: &TransactionDraft) -> Result<Inclusion> {
        match self.force_submit(draft).await? {
            SubmitOutcome::SwitchRequested { from, to } => {
                Ok(Inclusion::SwitchRequested { from, to })
            }
            SubmitOutcome::Broadcast { tx_hash, .. } => {
                Ok(Inclusion::Tracked(self.track(draft.target, tx_hash).await?))
            }
        }
    }

    /// Wait for a directly sent transaction and report it.
    pub async fn confirm_direct(&self, chain_id: u64, tx_hash: B256) -> Result<TxReceipt> {
        let key = tx_hash.to_string();
        let link = Some(chains::tx_url(Some(chain_id), &key));
        let show = |level, message: &str| {
            self.notifier.show(Notice {
                key: key.clone(),
                level,
                message: message.to_string(),
                link: link.clone(),
            })
        };

        show(NoticeLevel::Loading, "Waiting for transaction");
        match self.wallet.wait_for_receipt(chain_id, tx_hash).await {
            Ok(receipt) if receipt.succeeded() => {
                show(NoticeLevel::Success, "Transaction confirmed");
                Ok(receipt)
            }
            Ok(_) => {
                show(NoticeLevel::Failure, "Transaction reverted");
                Err(UncensoredError::ReceiptReverted(key.clone()))
            }
            Err(e) => {
                show(NoticeLevel::Failure, "Transaction failed");
                Err(e)
            }
        }
    }

    /// The wallet moved to another chain: clear the current attempt's notices.
    ///
    /// Receipt watches already in flight are not cancelled.
    pub fn on_chain_changed(&self, chain_id: u64) {
        tracing::info!(chain_id, "wallet chain changed");
        self.notifier.dismiss(SUBMISSION_NOTICE_KEY);
        self.tracker().dismiss_notices();
    }
}
