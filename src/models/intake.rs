use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Countdown assigned to every new intake record, in seconds.
pub const INITIAL_COUNTDOWN_SECS: u32 = 120;

/// Records below this remaining time are flagged and sorted to the top.
pub const URGENT_THRESHOLD_SECS: u32 = 30;

/// Status of an in-flight payment request as the operator sees it.
///
/// `Confirmed` and `Rejected` are terminal: once a record reaches them it
/// receives no further countdown or field mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    WaitingCard,
    WaitingScreenshot,
    Pending,
    Confirmed,
    Rejected,
}

/// Operator intents the dispatcher can apply to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeAction {
    SendCard,
    Confirm,
    Reject,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Confirmed | PaymentStatus::Rejected)
    }

    /// Whether the given operator action is offered in this status.
    /// Card input only while waiting for a card, confirm only once a
    /// screenshot is expected, reject anywhere short of a terminal state.
    pub fn allows(&self, action: IntakeAction) -> bool {
        match action {
            IntakeAction::SendCard => matches!(self, PaymentStatus::WaitingCard),
            IntakeAction::Confirm => matches!(self, PaymentStatus::WaitingScreenshot),
            IntakeAction::Reject => !self.is_terminal(),
        }
    }
}

/// Reason attached to an operator rejection. The fixed variants carry the
/// operator-facing strings the backend expects; `Other` is free text and
/// must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    CardBlocked,
    AmountMismatch,
    ReceiptInvalid,
    Other(String),
}

pub const REASON_CARD_BLOCKED: &str = "Karta bloklangan";
pub const REASON_AMOUNT_MISMATCH: &str = "Summa mos kelmadi";
pub const REASON_RECEIPT_INVALID: &str = "Chek haqiqiy emas";

impl RejectReason {
    /// Build a reason from the selector value and optional free text.
    /// `"other"` requires non-empty text; anything else must match one of
    /// the enumerated reasons.
    pub fn from_parts(reason: &str, other_text: Option<&str>) -> Result<Self, String> {
        match reason {
            "other" => {
                let text = other_text.map(str::trim).unwrap_or("");
                if text.is_empty() {
                    Err("Reason text is required when 'other' is selected".to_string())
                } else {
                    Ok(RejectReason::Other(text.to_string()))
                }
            }
            REASON_CARD_BLOCKED => Ok(RejectReason::CardBlocked),
            REASON_AMOUNT_MISMATCH => Ok(RejectReason::AmountMismatch),
            REASON_RECEIPT_INVALID => Ok(RejectReason::ReceiptInvalid),
            other => Err(format!("Unknown reject reason: {}", other)),
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            RejectReason::CardBlocked => REASON_CARD_BLOCKED,
            RejectReason::AmountMismatch => REASON_AMOUNT_MISMATCH,
            RejectReason::ReceiptInvalid => REASON_RECEIPT_INVALID,
            RejectReason::Other(text) => text,
        }
    }
}

/// One in-flight payment request surfaced to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntakeRecord {
    pub payment_id: String,
    pub user_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub time_left_seconds: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    /// Set when an optimistic operator transition has been applied locally
    /// but not yet confirmed by the backend; cleared by reconciliation.
    #[serde(default)]
    pub pending_sync: bool,
}

impl PaymentIntakeRecord {
    pub fn new(payment_id: String, user_id: String, amount: BigDecimal, currency: String) -> Self {
        Self {
            payment_id,
            user_id,
            amount,
            currency,
            status: PaymentStatus::WaitingCard,
            time_left_seconds: INITIAL_COUNTDOWN_SECS,
            created_at: Utc::now(),
            screenshot_url: None,
            pending_sync: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_urgent(&self) -> bool {
        !self.is_terminal() && self.time_left_seconds < URGENT_THRESHOLD_SECS
    }

    /// Room the backend routes operator responses through for this user.
    pub fn room_name(&self) -> String {
        format!("room-{}", self.user_id)
    }

    /// One countdown step. Terminal records are left untouched; open ones
    /// floor at zero.
    pub fn tick(&mut self) {
        if !self.is_terminal() {
            self.time_left_seconds = self.time_left_seconds.saturating_sub(1);
        }
    }

    /// Attach a screenshot from the feed. Returns false (and changes
    /// nothing) when the record is already terminal.
    pub fn attach_screenshot(&mut self, screenshot_url: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.screenshot_url = Some(screenshot_url);
        self.status = PaymentStatus::WaitingScreenshot;
        true
    }

    /// Apply an operator action, enforcing the transition table. The
    /// resulting status is optimistic, so the record is marked pending
    /// until reconciliation hears back from the backend.
    pub fn apply_action(&mut self, action: IntakeAction) -> Result<(), String> {
        if !self.status.allows(action) {
            return Err(format!(
                "Action {:?} is not available for payment {} in status {:?}",
                action, self.payment_id, self.status
            ));
        }
        self.status = match action {
            IntakeAction::SendCard => PaymentStatus::WaitingScreenshot,
            IntakeAction::Confirm => PaymentStatus::Confirmed,
            IntakeAction::Reject => PaymentStatus::Rejected,
        };
        self.pending_sync = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn record() -> PaymentIntakeRecord {
        PaymentIntakeRecord::new(
            "pay-1".to_string(),
            "user-7".to_string(),
            BigDecimal::from_str("150000").unwrap(),
            "UZS".to_string(),
        )
    }

    #[test]
    fn new_record_starts_waiting_for_card() {
        let rec = record();
        assert_eq!(rec.status, PaymentStatus::WaitingCard);
        assert_eq!(rec.time_left_seconds, INITIAL_COUNTDOWN_SECS);
        assert_eq!(rec.screenshot_url, None);
        assert!(!rec.pending_sync);
    }

    #[test]
    fn room_name_is_derived_from_user_id() {
        assert_eq!(record().room_name(), "room-user-7");
    }

    #[test]
    fn transition_table() {
        use IntakeAction::*;
        use PaymentStatus::*;

        assert!(WaitingCard.allows(SendCard));
        assert!(!WaitingScreenshot.allows(SendCard));
        assert!(!Pending.allows(SendCard));

        assert!(WaitingScreenshot.allows(Confirm));
        assert!(!WaitingCard.allows(Confirm));
        assert!(!Pending.allows(Confirm));

        assert!(WaitingCard.allows(Reject));
        assert!(WaitingScreenshot.allows(Reject));
        assert!(Pending.allows(Reject));
        assert!(!Confirmed.allows(Reject));
        assert!(!Rejected.allows(Reject));
    }

    #[test]
    fn send_card_moves_to_waiting_screenshot() {
        let mut rec = record();
        rec.apply_action(IntakeAction::SendCard).unwrap();
        assert_eq!(rec.status, PaymentStatus::WaitingScreenshot);
        assert!(rec.pending_sync);
    }

    #[test]
    fn confirm_requires_waiting_screenshot() {
        let mut rec = record();
        assert!(rec.apply_action(IntakeAction::Confirm).is_err());
        rec.apply_action(IntakeAction::SendCard).unwrap();
        rec.apply_action(IntakeAction::Confirm).unwrap();
        assert_eq!(rec.status, PaymentStatus::Confirmed);
    }

    #[test]
    fn terminal_records_accept_no_actions() {
        let mut rec = record();
        rec.apply_action(IntakeAction::Reject).unwrap();
        assert_eq!(rec.status, PaymentStatus::Rejected);
        assert!(rec.apply_action(IntakeAction::Reject).is_err());
        assert!(rec.apply_action(IntakeAction::SendCard).is_err());
    }

    #[test]
    fn tick_floors_at_zero_and_skips_terminal() {
        let mut rec = record();
        rec.time_left_seconds = 1;
        rec.tick();
        rec.tick();
        assert_eq!(rec.time_left_seconds, 0);

        let mut done = record();
        done.apply_action(IntakeAction::Reject).unwrap();
        let before = done.time_left_seconds;
        done.tick();
        assert_eq!(done.time_left_seconds, before);
    }

    #[test]
    fn screenshot_attaches_only_while_open() {
        let mut rec = record();
        assert!(rec.attach_screenshot("https://cdn.example/shot.png".to_string()));
        assert_eq!(rec.status, PaymentStatus::WaitingScreenshot);
        assert_eq!(rec.screenshot_url.as_deref(), Some("https://cdn.example/shot.png"));

        rec.apply_action(IntakeAction::Confirm).unwrap();
        assert!(!rec.attach_screenshot("https://cdn.example/late.png".to_string()));
        assert_eq!(rec.screenshot_url.as_deref(), Some("https://cdn.example/shot.png"));
    }

    #[test]
    fn urgency_flag() {
        let mut rec = record();
        assert!(!rec.is_urgent());
        rec.time_left_seconds = 29;
        assert!(rec.is_urgent());
        rec.apply_action(IntakeAction::Reject).unwrap();
        assert!(!rec.is_urgent());
    }

    #[test]
    fn reject_reason_parsing() {
        assert_eq!(
            RejectReason::from_parts(REASON_CARD_BLOCKED, None).unwrap(),
            RejectReason::CardBlocked
        );
        assert_eq!(
            RejectReason::from_parts("other", Some("Suspicious transfer")).unwrap(),
            RejectReason::Other("Suspicious transfer".to_string())
        );
        assert!(RejectReason::from_parts("other", Some("   ")).is_err());
        assert!(RejectReason::from_parts("other", None).is_err());
        assert!(RejectReason::from_parts("no-such-reason", None).is_err());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::WaitingCard).unwrap(),
            "\"WAITING_CARD\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::WaitingScreenshot).unwrap(),
            "\"WAITING_SCREENSHOT\""
        );
    }

    proptest! {
        #[test]
        fn countdown_after_n_ticks(n in 0u32..400) {
            let mut rec = record();
            for _ in 0..n {
                rec.tick();
            }
            prop_assert_eq!(
                rec.time_left_seconds,
                INITIAL_COUNTDOWN_SECS.saturating_sub(n)
            );
        }
    }
}
