//! Gateway contract tests: the call sequences strategy code relies on.

mod support;

use rust_decimal_macros::dec;

use venecto::domain::{OrderSide, OrderStatus, OrderType};
use venecto::error::ExchangeError;
use venecto::gateway::{ExchangeGateway, NewOrder, OrderSelector};

use support::MockGateway;

#[tokio::test]
async fn limit_submit_then_cancel_round_trip() {
    let gateway = MockGateway::new();

    // Price a conservative bid off the ticker, rounded to the tick.
    let info = gateway.get_symbol_info("BTC/USDT").await.unwrap();
    let ticker = gateway.get_ticker_24h("BTC/USDT").await.unwrap();
    let price = info.round_price(ticker.last * dec!(0.95));
    assert_eq!(price, dec!(57000.0));

    let order = gateway
        .submit_order(NewOrder::limit(
            "BTC/USDT",
            OrderSide::Buy,
            dec!(0.002),
            price,
        ))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::New);

    let open = gateway.get_open_orders(Some("BTC/USDT")).await.unwrap();
    assert!(open.iter().any(|o| o.order_id == order.order_id));

    gateway
        .cancel_order("BTC/USDT", OrderSelector::by_id(order.order_id.clone()))
        .await
        .unwrap();

    let open = gateway.get_open_orders(Some("BTC/USDT")).await.unwrap();
    assert!(!open.iter().any(|o| o.order_id == order.order_id));
}

#[tokio::test]
async fn limit_without_price_fails_before_the_wire() {
    let gateway = MockGateway::new();

    let mut order = NewOrder::limit("BTC/USDT", OrderSide::Buy, dec!(0.002), dec!(57000));
    order.price = None;

    let err = gateway.submit_order(order).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    // Nothing was transmitted.
    assert!(gateway.submitted.lock().is_empty());
}

#[tokio::test]
async fn stop_order_without_trigger_fails_before_the_wire() {
    let gateway = MockGateway::new();

    let mut order = NewOrder::market("BTC/USDT", OrderSide::Sell, dec!(0.002));
    order.order_type = OrderType::StopLoss;

    let err = gateway.submit_order(order).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    assert!(gateway.submitted.lock().is_empty());
}

#[tokio::test]
async fn cancel_without_identifier_is_rejected() {
    let gateway = MockGateway::new();
    let err = gateway
        .cancel_order("BTC/USDT", OrderSelector::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
}

#[tokio::test]
async fn modify_replaces_price_and_keeps_side() {
    let gateway = MockGateway::new();

    let original = gateway
        .submit_order(NewOrder::limit(
            "BTC/USDT",
            OrderSide::Buy,
            dec!(0.002),
            dec!(57000),
        ))
        .await
        .unwrap();

    let replacement = gateway
        .modify_order("BTC/USDT", &original.order_id, None, Some(dec!(56500)))
        .await
        .unwrap();

    assert_ne!(replacement.order_id, original.order_id);
    assert_eq!(replacement.side, OrderSide::Buy);
    assert_eq!(replacement.qty, dec!(0.002));
    assert_eq!(replacement.price, Some(dec!(56500)));
    // The original is gone from the venue's open set.
    let open = gateway.get_open_orders(None).await.unwrap();
    assert!(!open.iter().any(|o| o.order_id == original.order_id));
}
