//! Message channel between the embedded gateway checkout and the host app.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// One outcome posted by the checkout page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentMessage {
    #[serde(rename = "PAYMENT_SUCCESS")]
    Success {
        payment_id: String,
        #[serde(default)]
        order_id: Option<String>,
    },
    #[serde(rename = "PAYMENT_DISMISSED")]
    Dismissed,
    #[serde(rename = "PAYMENT_FAILED")]
    Failed {
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed payment message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("checkout is no longer listening")]
    Closed,
}

/// Sending half, handed to whatever hosts the checkout page.
#[derive(Clone, Debug)]
pub struct PaymentBridge {
    tx: mpsc::UnboundedSender<PaymentMessage>,
}

#[derive(Debug)]
pub struct PaymentReceiver {
    rx: mpsc::UnboundedReceiver<PaymentMessage>,
}

pub fn payment_channel() -> (PaymentBridge, PaymentReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PaymentBridge { tx }, PaymentReceiver { rx })
}

impl PaymentBridge {
    /// Parses a raw JSON message as posted by the checkout page.
    pub fn post_message(&self, raw: &str) -> Result<(), BridgeError> {
        let msg = serde_json::from_str(raw).map_err(|e| {
            tracing::warn!(error = %e, "dropping malformed payment message");
            BridgeError::Malformed(e)
        })?;
        self.send(msg)
    }

    pub fn send(&self, msg: PaymentMessage) -> Result<(), BridgeError> {
        self.tx.send(msg).map_err(|_| BridgeError::Closed)
    }
}

impl PaymentReceiver {
    pub async fn recv(&mut self) -> Option<PaymentMessage> { self.rx.recv().await }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parses_page_messages() {
        let (bridge, mut rx) = payment_channel();
        bridge.post_message(r#"{"type":"PAYMENT_SUCCESS","payment_id":"pay_1","order_id":"order_1"}"#).unwrap();
        bridge.post_message(r#"{"type":"PAYMENT_DISMISSED"}"#).unwrap();
        bridge.post_message(r#"{"type":"PAYMENT_FAILED","error":"Card declined"}"#).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(PaymentMessage::Success { payment_id: "pay_1".into(), order_id: Some("order_1".into()) })
        );
        assert_eq!(rx.recv().await, Some(PaymentMessage::Dismissed));
        assert_eq!(rx.recv().await, Some(PaymentMessage::Failed { error: Some("Card declined".into()) }));
    }

    #[test]
    fn test_rejects_unknown_messages() {
        let (bridge, _rx) = payment_channel();
        assert!(matches!(bridge.post_message(r#"{"type":"PAYMENT_MAYBE"}"#), Err(BridgeError::Malformed(_))));
        assert!(matches!(bridge.post_message("not json"), Err(BridgeError::Malformed(_))));
    }

    #[test]
    fn test_closed_receiver_reported() {
        let (bridge, rx) = payment_channel();
        drop(rx);
        assert!(matches!(bridge.send(PaymentMessage::Dismissed), Err(BridgeError::Closed)));
    }
}
