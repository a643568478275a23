use tradegate::gateway::portfolio::{combine, merge_portfolios, required_headers, ExchangeFailure};
use tradegate::models::{BalanceEntry, ExchangeId, Portfolio};

fn entry(exchange: ExchangeId, currency: &str, available: f64, frozen: f64) -> BalanceEntry {
    BalanceEntry {
        currency: currency.to_string(),
        available,
        frozen,
        total: available + frozen,
        usd_value: None,
        exchanges: vec![exchange.as_str().to_string()],
    }
}

fn portfolio(entries: Vec<BalanceEntry>) -> Portfolio {
    Portfolio::new(entries, 1_700_000_000_000)
}

#[test]
fn merging_a_portfolio_with_itself_doubles_every_field() {
    let part = portfolio(vec![
        entry(ExchangeId::Xt, "BTC", 1.0, 0.5),
        entry(ExchangeId::Xt, "USDT", 100.0, 0.0),
    ]);
    let combined = merge_portfolios(&[
        (ExchangeId::Xt, part.clone()),
        (ExchangeId::Xt, part),
    ]);

    assert_eq!(combined.len(), 2);
    let btc = &combined[0];
    assert_eq!(btc.currency, "BTC");
    assert_eq!(btc.available, 2.0);
    assert_eq!(btc.frozen, 1.0);
    assert_eq!(btc.total, 3.0);
    assert_eq!(btc.exchanges, vec!["xt".to_string()]);
}

#[test]
fn disjoint_currencies_concatenate_with_singleton_exchange_lists() {
    let a = portfolio(vec![
        entry(ExchangeId::Xt, "BTC", 1.0, 0.0),
        entry(ExchangeId::Xt, "ETH", 5.0, 0.0),
    ]);
    let b = portfolio(vec![entry(ExchangeId::Bybit, "SOL", 10.0, 2.0)]);

    let combined = merge_portfolios(&[(ExchangeId::Xt, a), (ExchangeId::Bybit, b)]);
    assert_eq!(combined.len(), 3);
    for item in &combined {
        assert_eq!(item.exchanges.len(), 1);
    }
    assert_eq!(combined[2].exchanges, vec!["bybit".to_string()]);
}

#[test]
fn currency_match_is_case_insensitive() {
    let a = portfolio(vec![entry(ExchangeId::Xt, "usdt", 100.0, 0.0)]);
    let b = portfolio(vec![entry(ExchangeId::Binance, "USDT", 50.0, 5.0)]);

    let combined = merge_portfolios(&[(ExchangeId::Xt, a), (ExchangeId::Binance, b)]);
    assert_eq!(combined.len(), 1);
    let merged = &combined[0];
    // First-seen spelling wins; amounts sum across exchanges.
    assert_eq!(merged.currency, "usdt");
    assert_eq!(merged.available, 150.0);
    assert_eq!(merged.frozen, 5.0);
    assert_eq!(merged.total, 155.0);
    assert_eq!(
        merged.exchanges,
        vec!["xt".to_string(), "binance".to_string()]
    );
}

#[test]
fn usd_values_sum_when_both_sides_report_them() {
    let mut first = entry(ExchangeId::Bybit, "BTC", 1.0, 0.0);
    first.usd_value = Some(65_000.0);
    let mut second = entry(ExchangeId::Binance, "BTC", 0.5, 0.0);
    second.usd_value = Some(32_500.0);
    let third = entry(ExchangeId::Bitget, "BTC", 0.1, 0.0);

    let combined = merge_portfolios(&[
        (ExchangeId::Bybit, portfolio(vec![first])),
        (ExchangeId::Binance, portfolio(vec![second])),
        (ExchangeId::Bitget, portfolio(vec![third])),
    ]);
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].usd_value, Some(97_500.0));
    assert_eq!(combined[0].exchanges.len(), 3);
}

#[test]
fn combine_reports_totals_and_failures() {
    let parts = vec![(
        ExchangeId::Bybit,
        portfolio(vec![entry(ExchangeId::Bybit, "BTC", 1.0, 0.0)]),
    )];
    let errors = vec![ExchangeFailure {
        exchange: "binance".to_string(),
        error: "Authentication failed".to_string(),
        code: Some("-2015".to_string()),
    }];

    let combined = combine(parts, errors, 1_700_000_000_000);
    assert_eq!(combined.total_assets, 1);
    assert_eq!(combined.exchanges, vec!["bybit".to_string()]);
    assert_eq!(combined.errors.len(), 1);
    assert_eq!(combined.errors[0].exchange, "binance");
    assert_eq!(combined.portfolio[0].exchanges, vec!["bybit".to_string()]);
}

#[test]
fn required_headers_cover_every_exchange_and_passphrase() {
    let headers = required_headers();
    for name in [
        "x-xt-api-key",
        "x-xt-secret-key",
        "x-bybit-api-key",
        "x-binance-secret-key",
        "x-kucoin-api-key",
        "x-kucoin-passphrase",
        "x-bitget-passphrase",
    ] {
        assert!(headers.contains(&name.to_string()), "missing {name}");
    }
    // Only KuCoin and Bitget take passphrases.
    assert_eq!(
        headers
            .iter()
            .filter(|name| name.ends_with("-passphrase"))
            .count(),
        2
    );
    assert_eq!(headers.len(), 12);
}
