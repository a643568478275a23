use serde_json::json;
use std::collections::HashMap;
use tradegate::exchange::{binance, bitget, bybit, kucoin, xt};

#[test]
fn xt_maps_amount_fields_and_drops_zero_totals() {
    let payload = json!({
        "rc": 0,
        "mc": "SUCCESS",
        "result": {
            "assets": [
                {
                    "currency": "btc",
                    "availableAmount": "0.5",
                    "frozenAmount": "0.1",
                    "totalAmount": "0.6",
                    "convertUsdtAmount": "39000",
                },
                {
                    "currency": "doge",
                    "availableAmount": "0",
                    "frozenAmount": "0",
                    "totalAmount": "0",
                },
            ]
        }
    });
    let entries = xt::parse_portfolio_entries(&payload);
    assert_eq!(entries.len(), 1);
    let btc = &entries[0];
    assert_eq!(btc.currency, "btc");
    assert_eq!(btc.available, 0.5);
    assert_eq!(btc.frozen, 0.1);
    assert_eq!(btc.total, 0.6);
    assert_eq!(btc.usd_value, Some(39_000.0));
    assert_eq!(btc.exchanges, vec!["xt".to_string()]);
}

#[test]
fn xt_falls_back_to_available_plus_frozen_without_a_total() {
    let payload = json!({
        "rc": 0,
        "result": {
            "assets": [
                { "currency": "eth", "availableAmount": "2", "frozenAmount": "1" },
            ]
        }
    });
    let entries = xt::parse_portfolio_entries(&payload);
    assert_eq!(entries[0].total, 3.0);
}

#[test]
fn bybit_derives_available_from_wallet_balance_minus_locked() {
    let payload = json!({
        "retCode": 0,
        "result": {
            "list": [{
                "accountType": "UNIFIED",
                "coin": [
                    {
                        "coin": "BTC",
                        "walletBalance": "1.5",
                        "locked": "0.5",
                        "usdValue": "97500",
                    },
                    { "coin": "SHIB", "walletBalance": "0", "locked": "0" },
                ]
            }]
        }
    });
    let entries = bybit::parse_portfolio_entries(&payload).expect("entries");
    assert_eq!(entries.len(), 1);
    let btc = &entries[0];
    assert_eq!(btc.available, 1.0);
    assert_eq!(btc.frozen, 0.5);
    assert_eq!(btc.total, 1.5);
    assert_eq!(btc.usd_value, Some(97_500.0));
    assert_eq!(btc.exchanges, vec!["bybit".to_string()]);
}

#[test]
fn binance_sums_free_and_locked_and_values_through_usdt_pairs() {
    let payload = json!({
        "balances": [
            { "asset": "BTC", "free": "0.4", "locked": "0.1" },
            { "asset": "USDT", "free": "250", "locked": "0" },
            { "asset": "XRP", "free": "0.00000000", "locked": "0.00000000" },
        ]
    });
    let mut prices = HashMap::new();
    prices.insert("BTC".to_string(), 60_000.0);

    let entries = binance::parse_portfolio_entries(&payload, &prices).expect("entries");
    assert_eq!(entries.len(), 2);

    let btc = &entries[0];
    assert_eq!(btc.total, 0.5);
    assert_eq!(btc.usd_value, Some(30_000.0));

    // USDT values as itself even without a BTCUSDT-style pair.
    let usdt = &entries[1];
    assert_eq!(usdt.usd_value, Some(250.0));
    assert_eq!(usdt.exchanges, vec!["binance".to_string()]);
}

#[test]
fn binance_leaves_usd_value_unset_without_a_price() {
    let payload = json!({
        "balances": [{ "asset": "OBSCURE", "free": "10", "locked": "0" }]
    });
    let entries = binance::parse_portfolio_entries(&payload, &HashMap::new()).expect("entries");
    assert_eq!(entries[0].usd_value, None);
}

#[test]
fn kucoin_folds_account_types_into_one_entry_per_currency() {
    let payload = json!({
        "code": "200000",
        "data": [
            { "currency": "USDT", "type": "main", "balance": "100", "available": "100", "holds": "0" },
            { "currency": "USDT", "type": "trade", "balance": "50", "available": "40", "holds": "10" },
            { "currency": "DUST", "type": "main", "balance": "0", "available": "0", "holds": "0" },
        ]
    });
    let entries = kucoin::parse_portfolio_entries(&payload).expect("entries");
    assert_eq!(entries.len(), 1);
    let usdt = &entries[0];
    assert_eq!(usdt.available, 140.0);
    assert_eq!(usdt.frozen, 10.0);
    assert_eq!(usdt.total, 150.0);
    assert_eq!(usdt.exchanges, vec!["kucoin".to_string()]);
}

#[test]
fn bitget_reads_frozen_with_lock_fallback() {
    let payload = json!({
        "code": "00000",
        "data": [
            { "coin": "BTC", "available": "0.9", "frozen": "0.1" },
            { "coin": "ETH", "available": "3", "lock": "1" },
            { "coin": "PEPE", "available": "0", "frozen": "0" },
        ]
    });
    let entries = bitget::parse_portfolio_entries(&payload).expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].total, 1.0);
    assert_eq!(entries[1].frozen, 1.0);
    assert_eq!(entries[1].total, 4.0);
    assert_eq!(entries[1].exchanges, vec!["bitget".to_string()]);
}

#[test]
fn malformed_payloads_fail_explicitly() {
    assert!(bybit::parse_portfolio_entries(&json!({"retCode": 0})).is_err());
    assert!(binance::parse_portfolio_entries(&json!({}), &HashMap::new()).is_err());
    assert!(kucoin::parse_portfolio_entries(&json!({"code": "200000"})).is_err());
    assert!(bitget::parse_portfolio_entries(&json!({"code": "00000"})).is_err());
}
