//! Single-writer store for the live intake collection. Every source of
//! mutation (feed events, the countdown ticker, operator actions, the
//! reconciliation refetch) is funneled through one command channel into one
//! reducer task, which publishes whole-collection snapshots over a watch
//! channel. Readers never touch the collection directly.

use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::intake::{IntakeAction, PaymentIntakeRecord};
use crate::models::wire::{BackendPayment, FeedEvent};

#[derive(Debug)]
pub enum IntakeCommand {
    /// Backend-pushed event from the feed listener.
    Feed(FeedEvent),
    /// One countdown step for every open record.
    Tick,
    /// Optimistic operator transition, already emitted on the channel.
    Apply {
        payment_id: String,
        action: IntakeAction,
    },
    /// Authoritative backend snapshot from the reconciliation refetch.
    Reconcile(Vec<BackendPayment>),
}

/// Handle to the reducer task: commands in, snapshots out.
#[derive(Clone)]
pub struct IntakeStore {
    command_tx: mpsc::UnboundedSender<IntakeCommand>,
    snapshot_rx: watch::Receiver<Vec<PaymentIntakeRecord>>,
}

impl IntakeStore {
    /// Spawn the reducer task and return the store handle alongside the
    /// task handle. The caller owns the task's lifetime.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<IntakeCommand>();
        let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());

        let handle = tokio::spawn(async move {
            let mut records: Vec<PaymentIntakeRecord> = Vec::new();
            while let Some(command) = command_rx.recv().await {
                apply_command(&mut records, command);
                if snapshot_tx.send(records.clone()).is_err() {
                    debug!("All snapshot receivers dropped, stopping intake reducer");
                    break;
                }
            }
            debug!("Intake reducer task terminated");
        });

        (
            Self {
                command_tx,
                snapshot_rx,
            },
            handle,
        )
    }

    pub fn command(&self, command: IntakeCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .map_err(|_| AppError::Internal("Intake reducer channel closed".to_string()))
    }

    /// Latest published snapshot of the collection.
    pub fn snapshot(&self) -> Vec<PaymentIntakeRecord> {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait until the reducer has published a snapshot newer than the one
    /// last observed through this handle.
    pub async fn changed(&mut self) -> Result<(), AppError> {
        self.snapshot_rx
            .changed()
            .await
            .map_err(|_| AppError::Internal("Intake reducer channel closed".to_string()))
    }
}

/// The reducer itself. Kept free of async so the transition semantics are
/// testable without a runtime.
fn apply_command(records: &mut Vec<PaymentIntakeRecord>, command: IntakeCommand) {
    match command {
        IntakeCommand::Feed(FeedEvent::NewPayment {
            payment_id,
            user_id,
            amount,
            currency,
        }) => {
            if records.iter().any(|r| r.payment_id == payment_id) {
                warn!("Duplicate newPayment event for {}, ignoring", payment_id);
                return;
            }
            debug!("New payment {} from user {} entered the feed", payment_id, user_id);
            records.insert(
                0,
                PaymentIntakeRecord::new(payment_id, user_id, amount, currency),
            );
        }
        IntakeCommand::Feed(FeedEvent::ScreenshotSubmitted {
            payment_id,
            screenshot_url,
        }) => match records.iter_mut().find(|r| r.payment_id == payment_id) {
            Some(record) => {
                if record.attach_screenshot(screenshot_url) {
                    debug!("Screenshot attached to payment {}", payment_id);
                } else {
                    debug!("Screenshot for terminal payment {}, ignored", payment_id);
                }
            }
            // Unmatched screenshot events are dropped without error
            None => debug!("Screenshot for unknown payment {}, dropped", payment_id),
        },
        IntakeCommand::Tick => {
            for record in records.iter_mut() {
                record.tick();
            }
        }
        IntakeCommand::Apply { payment_id, action } => {
            match records.iter_mut().find(|r| r.payment_id == payment_id) {
                Some(record) => {
                    if let Err(e) = record.apply_action(action) {
                        // The dispatcher pre-validates against the latest
                        // snapshot, so this only fires when a feed event
                        // raced the operator.
                        warn!("Dropped stale operator action: {}", e);
                    }
                }
                None => warn!(
                    "Operator action {:?} for unknown payment {}, dropped",
                    action, payment_id
                ),
            }
        }
        IntakeCommand::Reconcile(backend_payments) => {
            reconcile(records, backend_payments);
        }
    }
}

/// Merge the backend's authoritative list into the local collection.
///
/// - A record the backend also knows: backend status wins, except that an
///   optimistic (pending) local transition the backend has not caught up
///   with yet is kept; the pending flag is cleared once both sides agree.
/// - A record only the backend knows is appended with a fresh countdown.
/// - Records only known locally are left alone (terminal rows are never
///   deleted, they just stop updating).
/// - The local countdown is always kept; it is a visual cue, not state the
///   backend tracks.
fn reconcile(records: &mut Vec<PaymentIntakeRecord>, backend_payments: Vec<BackendPayment>) {
    for backend in backend_payments {
        match records
            .iter_mut()
            .find(|r| r.payment_id == backend.payment_id)
        {
            Some(local) => {
                if local.screenshot_url.is_none() {
                    local.screenshot_url = backend.screenshot_url.clone();
                }
                if local.pending_sync {
                    if local.status == backend.status {
                        debug!(
                            "Backend caught up with optimistic transition for {}",
                            local.payment_id
                        );
                        local.pending_sync = false;
                    }
                    // Mismatch while pending: the emitted event may still be
                    // in flight, keep the optimistic status until next pass.
                } else if local.status != backend.status {
                    warn!(
                        "Status divergence for {}: local {:?}, backend {:?}; backend wins",
                        local.payment_id, local.status, backend.status
                    );
                    local.status = backend.status;
                }
            }
            None => {
                debug!(
                    "Backend knows payment {} we never saw on the feed, appending",
                    backend.payment_id
                );
                let mut record = PaymentIntakeRecord::new(
                    backend.payment_id,
                    backend.user_id,
                    backend.amount,
                    backend.currency,
                );
                record.status = backend.status;
                record.screenshot_url = backend.screenshot_url;
                records.push(record);
            }
        }
    }
}
