//! Action dispatcher: turns operator intent into outbound channel events
//! plus an optimistic local transition. Emission is fire-and-forget; the
//! local state is updated regardless of delivery and reconciliation is what
//! eventually corrects any divergence.

use bigdecimal::BigDecimal;
use log::warn;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::models::intake::{IntakeAction, PaymentIntakeRecord, RejectReason};
use crate::models::wire::OperatorEvent;
use crate::services::intake_store::{IntakeCommand, IntakeStore};

#[derive(Clone)]
pub struct ActionDispatcher {
    store: IntakeStore,
    outbound_tx: mpsc::UnboundedSender<OperatorEvent>,
}

impl ActionDispatcher {
    pub fn new(store: IntakeStore, outbound_tx: mpsc::UnboundedSender<OperatorEvent>) -> Self {
        Self { store, outbound_tx }
    }

    /// Send the card number the user should transfer to. Emits one
    /// `adminResponse` into the user's room and optimistically moves the
    /// record to `WAITING_SCREENSHOT`.
    pub fn send_card(&self, payment_id: &str, card_number: &str) -> AppResult<()> {
        if card_number.trim().is_empty() {
            return Err(AppError::Validation("Card number must not be empty".to_string()));
        }
        let record = self.gated(payment_id, IntakeAction::SendCard)?;

        self.emit(OperatorEvent::AdminResponse {
            room_name: record.room_name(),
            card_number: card_number.trim().to_string(),
            payment_id: payment_id.to_string(),
        });
        self.apply(payment_id, IntakeAction::SendCard)
    }

    /// Confirm the payment with the coin amount to credit.
    pub fn confirm(&self, payment_id: &str, coin_amount: BigDecimal) -> AppResult<()> {
        self.gated(payment_id, IntakeAction::Confirm)?;

        self.emit(OperatorEvent::ConfirmPayment {
            payment_id: payment_id.to_string(),
            confirmed: true,
            coin_amount: Some(coin_amount),
            reason: None,
        });
        self.apply(payment_id, IntakeAction::Confirm)
    }

    /// Reject the payment with a reason.
    pub fn reject(&self, payment_id: &str, reason: RejectReason) -> AppResult<()> {
        self.gated(payment_id, IntakeAction::Reject)?;

        self.emit(OperatorEvent::ConfirmPayment {
            payment_id: payment_id.to_string(),
            confirmed: false,
            coin_amount: None,
            reason: Some(reason.as_text().to_string()),
        });
        self.apply(payment_id, IntakeAction::Reject)
    }

    /// Look up the record in the latest snapshot and check the transition
    /// table before anything leaves the process.
    fn gated(&self, payment_id: &str, action: IntakeAction) -> AppResult<PaymentIntakeRecord> {
        let snapshot = self.store.snapshot();
        let record = snapshot
            .into_iter()
            .find(|r| r.payment_id == payment_id)
            .ok_or_else(|| AppError::NotFound(format!("Payment {} is not in the live feed", payment_id)))?;

        if !record.status.allows(action) {
            return Err(AppError::Validation(format!(
                "Action {:?} is not available for payment {} in status {:?}",
                action, payment_id, record.status
            )));
        }
        Ok(record)
    }

    /// Fire-and-forget emission. A closed channel is logged and otherwise
    /// ignored; the optimistic transition proceeds either way.
    fn emit(&self, event: OperatorEvent) {
        if self.outbound_tx.send(event).is_err() {
            warn!("Outbound feed channel closed, operator event not delivered");
        }
    }

    fn apply(&self, payment_id: &str, action: IntakeAction) -> AppResult<()> {
        self.store.command(IntakeCommand::Apply {
            payment_id: payment_id.to_string(),
            action,
        })
    }
}
