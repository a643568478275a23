use tradegate::exchange::classify::classify;
use tradegate::models::{ErrorKind, ExchangeId};

#[test]
fn known_binance_insufficient_balance_code_is_remapped() {
    let err = classify(
        ExchangeId::Binance,
        "-2010",
        "Account has insufficient balance for requested action.",
    );
    assert_eq!(err.kind, ErrorKind::Rejected);
    assert_eq!(err.code.as_deref(), Some("-2010"));
    assert_eq!(err.message, "Order rejected: insufficient balance");
    assert!(err.help.is_some());
}

#[test]
fn known_bybit_auth_code_is_remapped() {
    let err = classify(ExchangeId::Bybit, "10003", "API key is invalid.");
    assert_eq!(err.message, "Authentication failed");
    assert_eq!(err.code.as_deref(), Some("10003"));
}

#[test]
fn known_kucoin_balance_code_is_remapped() {
    let err = classify(ExchangeId::Kucoin, "200004", "Balance insufficient!");
    assert_eq!(err.message, "Insufficient balance");
}

#[test]
fn known_bitget_min_value_code_is_remapped() {
    let err = classify(ExchangeId::Bitget, "45110", "less than the minimum amount 5 USDT");
    assert_eq!(err.message, "Order value below the minimum");
    assert!(err.help.is_some());
}

#[test]
fn known_xt_signature_code_is_remapped() {
    let err = classify(ExchangeId::Xt, "AUTH_105", "AUTH_105");
    assert_eq!(err.message, "Signature verification failed");
}

#[test]
fn unknown_code_preserves_the_raw_vendor_message() {
    let err = classify(ExchangeId::Binance, "-9999", "Totally new failure mode");
    assert_eq!(err.kind, ErrorKind::Rejected);
    assert_eq!(err.code.as_deref(), Some("-9999"));
    assert_eq!(err.message, "Totally new failure mode");
    assert!(err.help.is_none());
}

#[test]
fn unknown_code_with_empty_message_gets_a_generic_fallback() {
    let err = classify(ExchangeId::Kucoin, "999999", "");
    assert_eq!(err.message, "kucoin rejected the request");
}
