use axum::http::header::HeaderName;
use axum::http::{HeaderMap, HeaderValue};
use tradegate::app::server::{combined_credentials, single_credentials};
use tradegate::models::{ErrorKind, ExchangeId};

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).expect("header name"),
            HeaderValue::from_str(value).expect("header value"),
        );
    }
    map
}

#[test]
fn missing_key_pair_is_an_authentication_error() {
    let err = single_credentials(&headers(&[]), ExchangeId::Binance).expect_err("must fail");
    assert_eq!(err.kind, ErrorKind::MissingCredentials);

    let err = single_credentials(&headers(&[("x-api-key", "k")]), ExchangeId::Binance)
        .expect_err("must fail");
    assert_eq!(err.kind, ErrorKind::MissingCredentials);
}

#[test]
fn key_pair_round_trips() {
    let creds = single_credentials(
        &headers(&[("x-api-key", "key-1"), ("x-secret-key", "sec-1")]),
        ExchangeId::Xt,
    )
    .expect("creds");
    assert_eq!(creds.api_key, "key-1");
    assert_eq!(creds.secret_key, "sec-1");
    assert_eq!(creds.passphrase, None);
}

#[test]
fn kucoin_requires_its_passphrase_header() {
    let base = [("x-api-key", "k"), ("x-secret-key", "s")];
    let err = single_credentials(&headers(&base), ExchangeId::Kucoin).expect_err("must fail");
    assert_eq!(err.kind, ErrorKind::MissingCredentials);
    assert!(err.message.contains("x-kucoin-passphrase"));

    let creds = single_credentials(
        &headers(&[
            ("x-api-key", "k"),
            ("x-secret-key", "s"),
            ("x-kucoin-passphrase", "p"),
        ]),
        ExchangeId::Kucoin,
    )
    .expect("creds");
    assert_eq!(creds.passphrase.as_deref(), Some("p"));
}

#[test]
fn bitget_requires_its_passphrase_header() {
    let err = single_credentials(
        &headers(&[("x-api-key", "k"), ("x-secret-key", "s")]),
        ExchangeId::Bitget,
    )
    .expect_err("must fail");
    assert!(err.message.contains("x-bitget-passphrase"));
}

#[test]
fn combined_extraction_skips_exchanges_without_a_key_pair() {
    let map = headers(&[
        ("x-bybit-api-key", "bk"),
        ("x-bybit-secret-key", "bs"),
        ("x-binance-api-key", "only-half"),
    ]);
    assert!(combined_credentials(&map, ExchangeId::Xt).is_none());
    assert!(combined_credentials(&map, ExchangeId::Binance).is_none());

    let bybit = combined_credentials(&map, ExchangeId::Bybit).expect("bybit creds");
    assert_eq!(bybit.api_key, "bk");
    assert_eq!(bybit.secret_key, "bs");
}

#[test]
fn combined_extraction_attaches_exchange_passphrases() {
    let map = headers(&[
        ("x-kucoin-api-key", "kk"),
        ("x-kucoin-secret-key", "ks"),
        ("x-kucoin-passphrase", "kp"),
    ]);
    let creds = combined_credentials(&map, ExchangeId::Kucoin).expect("creds");
    assert_eq!(creds.passphrase.as_deref(), Some("kp"));
}

#[test]
fn blank_header_values_count_as_absent() {
    let map = headers(&[("x-api-key", "  "), ("x-secret-key", "s")]);
    assert!(single_credentials(&map, ExchangeId::Xt).is_err());
}
