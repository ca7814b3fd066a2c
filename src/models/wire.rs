//! Tagged-union schema for the push channel. Every frame crossing the
//! boundary is validated here so malformed payloads fail at the edge with a
//! parse error instead of leaking half-empty records into the table.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Backend-originated events consumed by the feed listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum FeedEvent {
    #[serde(rename = "newPayment")]
    NewPayment {
        #[serde(rename = "paymentId")]
        payment_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "howMuch")]
        amount: BigDecimal,
        // The backend emits the misspelled "currencsy" field; the correct
        // spelling is accepted as an alias in case it ever gets fixed.
        #[serde(rename = "currencsy", alias = "currency")]
        currency: String,
    },
    #[serde(rename = "admin_screenshot")]
    ScreenshotSubmitted {
        #[serde(rename = "paymentId")]
        payment_id: String,
        #[serde(rename = "screenshotUrl")]
        screenshot_url: String,
    },
}

impl FeedEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Operator-originated events emitted back over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum OperatorEvent {
    #[serde(rename = "adminResponse")]
    AdminResponse {
        #[serde(rename = "roomName")]
        room_name: String,
        #[serde(rename = "cardNumber")]
        card_number: String,
        #[serde(rename = "paymentId")]
        payment_id: String,
    },
    #[serde(rename = "confirm_payment")]
    ConfirmPayment {
        #[serde(rename = "paymentId")]
        payment_id: String,
        confirmed: bool,
        #[serde(
            rename = "coinAmount",
            skip_serializing_if = "Option::is_none",
            with = "decimal_number",
            default
        )]
        coin_amount: Option<BigDecimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// The channel carries coin amounts as plain JSON numbers, not the string
/// form BigDecimal serializes to by default.
mod decimal_number {
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &Option<BigDecimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(amount) => serde_json::Number::from_str(&amount.to_string())
                .map_err(serde::ser::Error::custom)?
                .serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<BigDecimal>::deserialize(deserializer)
    }
}

/// Authoritative payment request as returned by the backend's REST API,
/// consumed by the reconciliation refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPayment {
    pub payment_id: String,
    pub user_id: String,
    #[serde(rename = "howMuch")]
    pub amount: BigDecimal,
    #[serde(rename = "currencsy", alias = "currency")]
    pub currency: String,
    pub status: crate::models::intake::PaymentStatus,
    #[serde(default)]
    pub screenshot_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn parses_new_payment_with_misspelled_currency_field() {
        let text = r#"{"event":"newPayment","paymentId":"p-1","userId":"u-9","howMuch":250000,"currencsy":"UZS"}"#;
        let event = FeedEvent::parse(text).unwrap();
        assert_eq!(
            event,
            FeedEvent::NewPayment {
                payment_id: "p-1".to_string(),
                user_id: "u-9".to_string(),
                amount: BigDecimal::from(250000),
                currency: "UZS".to_string(),
            }
        );
    }

    #[test]
    fn accepts_corrected_currency_spelling() {
        let text = r#"{"event":"newPayment","paymentId":"p-1","userId":"u-9","howMuch":"99.50","currency":"USD"}"#;
        let event = FeedEvent::parse(text).unwrap();
        match event {
            FeedEvent::NewPayment { amount, currency, .. } => {
                assert_eq!(amount, BigDecimal::from_str("99.50").unwrap());
                assert_eq!(currency, "USD");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn parses_screenshot_event() {
        let text = r#"{"event":"admin_screenshot","paymentId":"p-2","screenshotUrl":"https://cdn.example/p-2.png"}"#;
        let event = FeedEvent::parse(text).unwrap();
        assert_eq!(
            event,
            FeedEvent::ScreenshotSubmitted {
                payment_id: "p-2".to_string(),
                screenshot_url: "https://cdn.example/p-2.png".to_string(),
            }
        );
    }

    #[test]
    fn unknown_event_type_fails_loudly() {
        let text = r#"{"event":"somethingElse","paymentId":"p-3"}"#;
        assert!(FeedEvent::parse(text).is_err());
    }

    #[test]
    fn missing_fields_fail_loudly() {
        let text = r#"{"event":"newPayment","paymentId":"p-4"}"#;
        assert!(FeedEvent::parse(text).is_err());
    }

    #[test]
    fn admin_response_wire_shape() {
        let event = OperatorEvent::AdminResponse {
            room_name: "room-u-9".to_string(),
            card_number: "8600 1234 5678 9012".to_string(),
            payment_id: "p-1".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "adminResponse",
                "roomName": "room-u-9",
                "cardNumber": "8600 1234 5678 9012",
                "paymentId": "p-1",
            })
        );
    }

    #[test]
    fn confirm_payment_omits_absent_fields() {
        let confirm = OperatorEvent::ConfirmPayment {
            payment_id: "p-1".to_string(),
            confirmed: true,
            coin_amount: Some(BigDecimal::from(50)),
            reason: None,
        };
        let json: serde_json::Value = serde_json::to_value(&confirm).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "confirm_payment",
                "paymentId": "p-1",
                "confirmed": true,
                "coinAmount": 50,
            })
        );

        let reject = OperatorEvent::ConfirmPayment {
            payment_id: "p-1".to_string(),
            confirmed: false,
            coin_amount: None,
            reason: Some("Karta bloklangan".to_string()),
        };
        let json: serde_json::Value = serde_json::to_value(&reject).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "confirm_payment",
                "paymentId": "p-1",
                "confirmed": false,
                "reason": "Karta bloklangan",
            })
        );
    }

    #[test]
    fn coin_amount_is_a_json_number() {
        let event = OperatorEvent::ConfirmPayment {
            payment_id: "p-1".to_string(),
            confirmed: true,
            coin_amount: Some(BigDecimal::from_str("99.50").unwrap()),
            reason: None,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert!(json["coinAmount"].is_number());
        assert_eq!(json["coinAmount"], serde_json::json!(99.5));
    }
}
