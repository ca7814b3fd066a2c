//! View model for the operator table: one row per record with the display
//! columns, the urgency flag and the action set derived from status.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::intake::{IntakeAction, PaymentIntakeRecord, PaymentStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRow {
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub time_left: String,
    pub urgent: bool,
    pub pending_sync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    pub actions: RowActions,
}

/// Which operator controls are shown for a row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowActions {
    pub send_card: bool,
    pub confirm: bool,
    pub reject: bool,
}

impl From<PaymentStatus> for RowActions {
    fn from(status: PaymentStatus) -> Self {
        Self {
            send_card: status.allows(IntakeAction::SendCard),
            confirm: status.allows(IntakeAction::Confirm),
            reject: status.allows(IntakeAction::Reject),
        }
    }
}

/// Remaining time in the table's `MM:SS` format.
pub fn format_time_left(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Order records for display: urgent rows first, most urgent at the top;
/// everything else keeps feed order (newest first, since inserts go to the
/// front of the collection).
pub fn order_for_display(records: &[PaymentIntakeRecord]) -> Vec<IntakeRow> {
    let mut ordered: Vec<&PaymentIntakeRecord> = records.iter().collect();
    ordered.sort_by_key(|r| {
        if r.is_urgent() {
            (0u8, r.time_left_seconds)
        } else {
            (1u8, 0)
        }
    });

    ordered
        .into_iter()
        .map(|r| IntakeRow {
            payment_id: r.payment_id.clone(),
            created_at: r.created_at,
            user_id: r.user_id.clone(),
            amount: r.amount.clone(),
            currency: r.currency.clone(),
            status: r.status,
            time_left: format_time_left(r.time_left_seconds),
            urgent: r.is_urgent(),
            pending_sync: r.pending_sync,
            screenshot_url: r.screenshot_url.clone(),
            actions: RowActions::from(r.status),
        })
        .collect()
}
