use std::sync::Mutex;

use rust_decimal::Decimal;

use super::*;
use crate::domain::aggregates::NewCartItem;
use crate::domain::value_objects::Money;

const ORDER_ID: Uuid = Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0001);

#[derive(Default)]
struct FakeBackend {
    intent_fails: bool,
    save_failures: Mutex<u32>,
    intents: Mutex<Vec<CreatePaymentIntentRequest>>,
    saves: Mutex<Vec<SaveOrderRequest>>,
}

impl FakeBackend {
    fn failing_saves(n: u32) -> Self {
        Self { save_failures: Mutex::new(n), ..Self::default() }
    }
    fn intents(&self) -> Vec<CreatePaymentIntentRequest> { self.intents.lock().unwrap().clone() }
    fn saves(&self) -> Vec<SaveOrderRequest> { self.saves.lock().unwrap().clone() }
}

#[async_trait]
impl CheckoutBackend for FakeBackend {
    async fn create_payment_intent(&self, req: &CreatePaymentIntentRequest) -> Result<CreatePaymentIntentResponse, ClientError> {
        self.intents.lock().unwrap().push(req.clone());
        if self.intent_fails {
            return Err(ClientError::Api { status: 502, message: "gateway unavailable".into() });
        }
        Ok(CreatePaymentIntentResponse {
            order_id: "order_1".into(),
            amount: Money::inr(req.amount).to_minor_units().unwrap(),
            currency: "INR".into(),
            key_id: "rzp_test_key".into(),
        })
    }

    async fn save_order(&self, req: &SaveOrderRequest) -> Result<SaveOrderResponse, ClientError> {
        self.saves.lock().unwrap().push(req.clone());
        let mut failures = self.save_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ClientError::Api { status: 500, message: "database unavailable".into() });
        }
        Ok(SaveOrderResponse { order_id: ORDER_ID, success: true })
    }
}

fn cart() -> CartStore {
    let mut cart = CartStore::default();
    cart.add_item(NewCartItem {
        product_id: "P1".into(),
        name: "Box Logo Tee".into(),
        price: Decimal::from(1299),
        image: "https://img.example/tee.jpg".into(),
        size: Some("M".into()),
        color: Some("Black".into()),
        quantity: 2,
    });
    cart
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(),
        phone: "9876543210".into(),
        address: "12 MG Road".into(),
        city: "Mumbai".into(),
        state: "Maharashtra".into(),
        pincode: "400001".into(),
    }
}

fn success(payment_id: &str) -> PaymentMessage {
    PaymentMessage::Success { payment_id: payment_id.into(), order_id: Some("order_1".into()) }
}

#[tokio::test]
async fn test_happy_path_records_once_and_clears_cart() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), Some("user_1".into()));

    let session = flow.proceed_to_payment(&cart, address()).await.unwrap();
    // 2598 + 18% GST, free shipping
    assert_eq!(session.summary.total.amount(), Decimal::from(3066));
    assert_eq!(session.amount_minor, 306_600);
    assert!(matches!(flow.state(), CheckoutState::RenderingPaymentUi(_)));

    let outcome = flow.handle_payment_message(&mut cart, success("PAY1")).await.unwrap();
    assert_eq!(outcome, CheckoutOutcome::Completed(OrderConfirmation { order_id: ORDER_ID, payment_id: "PAY1".into() }));

    let saves = flow.backend().saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].payment_id, "PAY1");
    assert_eq!(saves[0].gateway_order_id.as_deref(), Some("order_1"));
    assert_eq!(saves[0].amount, Decimal::from(3066));
    assert_eq!(saves[0].items.len(), 1);
    assert_eq!(saves[0].items[0].quantity, 2);
    assert_eq!(saves[0].user_id.as_deref(), Some("user_1"));
    assert!(cart.is_empty());
    assert!(matches!(flow.state(), CheckoutState::Complete(_)));
}

#[tokio::test]
async fn test_order_records_the_cart_that_was_charged() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), Some("user_1".into()));
    flow.proceed_to_payment(&cart, address()).await.unwrap();

    cart.add_item(NewCartItem {
        product_id: "P2".into(),
        name: "Varsity Jacket".into(),
        price: Decimal::from(9999),
        image: "https://img.example/jacket.jpg".into(),
        size: Some("L".into()),
        color: None,
        quantity: 5,
    });
    flow.handle_payment_message(&mut cart, success("PAY1")).await.unwrap();

    let saves = flow.backend().saves();
    assert_eq!(saves[0].amount, Decimal::from(3066));
    assert_eq!(saves[0].items.len(), 1);
    assert_eq!(saves[0].items[0].product_id, "P1");
    assert_eq!(saves[0].items[0].quantity, 2);
}

#[tokio::test]
async fn test_dismissal_returns_to_address_without_recording() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None);
    flow.proceed_to_payment(&cart, address()).await.unwrap();

    let outcome = flow.handle_payment_message(&mut cart, PaymentMessage::Dismissed).await.unwrap();
    assert_eq!(outcome, CheckoutOutcome::Dismissed);
    assert_eq!(flow.state(), &CheckoutState::CollectingAddress);
    assert_eq!(cart.count(), 2);
    assert!(flow.backend().saves().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_keeps_cart_and_never_recharges() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::failing_saves(1), Some("user_1".into()));
    flow.proceed_to_payment(&cart, address()).await.unwrap();

    let err = flow.handle_payment_message(&mut cart, success("PAY1")).await.unwrap_err();
    assert!(matches!(&err, CheckoutError::OrderNotRecorded { payment_id, .. } if payment_id == "PAY1"));
    assert!(err.payment_captured());
    assert!(err.to_string().contains("Do not pay again"));
    assert_eq!(cart.count(), 2);
    assert!(matches!(flow.state(), CheckoutState::OrderNotRecorded(_)));

    let refused = flow.proceed_to_payment(&cart, address()).await.unwrap_err();
    assert!(matches!(refused, CheckoutError::PaymentAlreadyCaptured { .. }));
    assert_eq!(flow.backend().intents().len(), 1);

    let confirmation = flow.retry_order_record(&mut cart).await.unwrap();
    assert_eq!(confirmation.payment_id, "PAY1");
    let saves = flow.backend().saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0], saves[1]);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_invalid_address_stays_on_form() {
    let cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None);
    let bad = ShippingAddress { pincode: "4000".into(), ..address() };

    let err = flow.proceed_to_payment(&cart, bad).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidAddress(AddressError::InvalidPincode)));
    assert_eq!(err.to_string(), "Valid 6-digit pincode is required");
    assert_eq!(flow.state(), &CheckoutState::CollectingAddress);
    assert!(flow.backend().intents().is_empty());
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None);
    let err = flow.proceed_to_payment(&CartStore::default(), address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn test_intent_failure_returns_to_address() {
    let cart = cart();
    let backend = FakeBackend { intent_fails: true, ..FakeBackend::default() };
    let mut flow = CheckoutFlow::new(backend, None);

    let err = flow.proceed_to_payment(&cart, address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentIntent(_)));
    assert!(!err.payment_captured());
    assert_eq!(flow.state(), &CheckoutState::CollectingAddress);
    assert_eq!(flow.backend().intents().len(), 1);
}

#[tokio::test]
async fn test_gateway_failure_message_surfaces_reason() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None);
    flow.proceed_to_payment(&cart, address()).await.unwrap();

    let err = flow
        .handle_payment_message(&mut cart, PaymentMessage::Failed { error: Some("Card declined".into()) })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Payment failed: Card declined");
    assert_eq!(flow.state(), &CheckoutState::CollectingAddress);
    assert_eq!(cart.count(), 2);
    assert!(flow.backend().saves().is_empty());
}

#[tokio::test]
async fn test_messages_outside_payment_step_are_rejected() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None);
    let err = flow.handle_payment_message(&mut cart, success("PAY1")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::UnexpectedMessage("collecting_address")));
    assert!(flow.backend().saves().is_empty());
}

#[tokio::test]
async fn test_bridge_drives_the_flow() {
    let mut cart = cart();
    let mut flow = CheckoutFlow::new(FakeBackend::default(), None).with_email("asha@example.com");
    let session = flow.proceed_to_payment(&cart, address()).await.unwrap();

    let options = session.checkout_options();
    assert_eq!(options["order_id"], "order_1");
    assert_eq!(options["amount"], 306_600);
    assert_eq!(options["prefill"]["email"], "asha@example.com");
    assert_eq!(options["prefill"]["contact"], "9876543210");

    let (bridge, mut receiver) = payment_channel();
    bridge.post_message(r#"{"type":"PAYMENT_SUCCESS","payment_id":"PAY1","order_id":"order_1"}"#).unwrap();
    let outcome = flow.await_payment(&mut cart, &mut receiver).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Completed(_)));

    drop(bridge);
    flow.reset();
    let err = flow.await_payment(&mut cart, &mut receiver).await.unwrap_err();
    assert!(matches!(err, CheckoutError::ChannelClosed));
}
