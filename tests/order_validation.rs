use tradegate::gateway::validate::validate_order;
use tradegate::models::{ErrorKind, OrderKind, Side};

#[test]
fn limit_order_without_price_is_rejected() {
    let err = validate_order(Some("btc_usdt"), Some(0.5), None, Some("LIMIT"), Side::Buy)
        .expect_err("must reject");
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
    assert_eq!(err.message, "Price is required for LIMIT orders");
}

#[test]
fn market_order_with_price_is_rejected() {
    let err = validate_order(
        Some("btc_usdt"),
        Some(0.5),
        Some(50_000.0),
        Some("MARKET"),
        Side::Sell,
    )
    .expect_err("must reject");
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
    assert_eq!(err.message, "Do not send price for MARKET orders");
}

#[test]
fn order_type_defaults_to_limit() {
    let err = validate_order(Some("btc_usdt"), Some(0.5), None, None, Side::Buy)
        .expect_err("must reject");
    assert_eq!(err.message, "Price is required for LIMIT orders");

    let order = validate_order(Some("btc_usdt"), Some(0.5), Some(100.0), None, Side::Buy)
        .expect("valid order");
    assert_eq!(order.kind, OrderKind::Limit);
}

#[test]
fn order_type_is_case_insensitive() {
    let order = validate_order(Some("btc_usdt"), Some(25.0), None, Some("market"), Side::Buy)
        .expect("valid order");
    assert_eq!(order.kind, OrderKind::Market);
    assert_eq!(order.price, None);
}

#[test]
fn unknown_order_type_is_rejected() {
    let err = validate_order(
        Some("btc_usdt"),
        Some(0.5),
        Some(100.0),
        Some("STOP_LOSS"),
        Side::Buy,
    )
    .expect_err("must reject");
    assert_eq!(err.message, "type must be LIMIT or MARKET");
}

#[test]
fn missing_symbol_is_rejected() {
    let err = validate_order(None, Some(0.5), Some(100.0), Some("LIMIT"), Side::Buy)
        .expect_err("must reject");
    assert_eq!(err.message, "symbol is required");

    let err = validate_order(Some("  "), Some(0.5), Some(100.0), Some("LIMIT"), Side::Buy)
        .expect_err("must reject");
    assert_eq!(err.message, "symbol is required");
}

#[test]
fn non_positive_quantity_is_rejected() {
    for quantity in [None, Some(0.0), Some(-1.0)] {
        let err = validate_order(Some("btc_usdt"), quantity, Some(100.0), Some("LIMIT"), Side::Buy)
            .expect_err("must reject");
        assert_eq!(err.message, "quantity must be a positive number");
    }
}

#[test]
fn non_positive_limit_price_is_rejected() {
    let err = validate_order(Some("btc_usdt"), Some(0.5), Some(0.0), Some("LIMIT"), Side::Buy)
        .expect_err("must reject");
    assert_eq!(err.message, "price must be a positive number");
}

#[test]
fn valid_limit_order_passes_through_unchanged() {
    let order = validate_order(
        Some(" btc_usdt "),
        Some(0.01),
        Some(50_000.0),
        Some("LIMIT"),
        Side::Buy,
    )
    .expect("valid order");
    assert_eq!(order.symbol, "btc_usdt");
    assert_eq!(order.quantity, 0.01);
    assert_eq!(order.price, Some(50_000.0));
    assert_eq!(order.side, Side::Buy);
}
