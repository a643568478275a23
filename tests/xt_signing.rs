use serde_json::json;
use tradegate::exchange::xt;

const API_KEY: &str = "test-api-key";
const SECRET: &str = "test-secret";
const TIMESTAMP: i64 = 1_700_000_000_000;

#[test]
fn hmac_sha256_hex_matches_known_vector() {
    let signature =
        xt::hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog").expect("sign");
    assert_eq!(
        signature,
        "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
    );
}

#[test]
fn canonical_query_sorts_and_prefixes() {
    let params = vec![
        ("symbol".to_string(), Some("btc_usdt".to_string())),
        ("limit".to_string(), Some("100".to_string())),
    ];
    assert_eq!(xt::canonical_query(&params), "#limit=100&symbol=btc_usdt");
}

#[test]
fn canonical_query_drops_absent_params_before_emptiness_check() {
    let params = vec![
        ("cursor".to_string(), None),
        ("from".to_string(), None),
    ];
    assert_eq!(xt::canonical_query(&params), "");
}

#[test]
fn canonical_body_strips_null_keys() {
    let body = json!({ "symbol": "btc_usdt", "clientId": null });
    let fragment = xt::canonical_body(Some(&body)).expect("body");
    assert_eq!(fragment, "#{\"symbol\":\"btc_usdt\"}");
}

#[test]
fn body_with_only_null_values_counts_as_no_body() {
    let body = json!({ "clientId": null, "tag": null });
    let fragment = xt::canonical_body(Some(&body)).expect("body");
    assert_eq!(fragment, "");
    assert_eq!(xt::canonical_body(None).expect("body"), "");
}

#[test]
fn signature_payload_matches_documented_layout() {
    let payload = xt::signature_payload(
        API_KEY,
        "GET",
        "/v4/balances",
        &[],
        None,
        TIMESTAMP,
    )
    .expect("payload");
    assert_eq!(
        payload,
        "validate-algorithms=HmacSHA256&validate-appkey=test-api-key&validate-recvwindow=60000&validate-timestamp=1700000000000#GET#/v4/balances"
    );
}

#[test]
fn get_signature_matches_reference_vector() {
    let payload = xt::signature_payload(API_KEY, "GET", "/v4/balances", &[], None, TIMESTAMP)
        .expect("payload");
    let signature = xt::hmac_sha256_hex(SECRET, &payload).expect("sign");
    assert_eq!(
        signature,
        "d007e98acd9c5f55a9e5a76e4dd468ed15bf93cec6f4b2d2c3c365d6990dfbac"
    );
}

#[test]
fn query_signature_matches_reference_vector() {
    let query = vec![
        ("symbol".to_string(), Some("btc_usdt".to_string())),
        ("limit".to_string(), Some("100".to_string())),
        ("cursor".to_string(), None),
    ];
    let payload =
        xt::signature_payload(API_KEY, "GET", "/v4/history-order", &query, None, TIMESTAMP)
            .expect("payload");
    let signature = xt::hmac_sha256_hex(SECRET, &payload).expect("sign");
    assert_eq!(
        signature,
        "0dc57de8e9da19374e9b6477ffc4ecd9aebd6fd605123d50978e1ed68c448508"
    );
}

#[test]
fn body_signature_matches_reference_vector() {
    let body = json!({
        "symbol": "btc_usdt",
        "side": "BUY",
        "price": "50000",
        "quantity": "0.01",
        "clientId": null,
    });
    let payload =
        xt::signature_payload(API_KEY, "POST", "/v4/order", &[], Some(&body), TIMESTAMP)
            .expect("payload");
    let signature = xt::hmac_sha256_hex(SECRET, &payload).expect("sign");
    assert_eq!(
        signature,
        "8cd583249f938bc14de4cd8830346df8fadb4179c50824b88a8072e118a756fa"
    );
}

#[test]
fn signature_is_deterministic_for_fixed_inputs() {
    let query = vec![("symbol".to_string(), Some("eth_usdt".to_string()))];
    let first = xt::signature_payload(API_KEY, "GET", "/v4/public/depth", &query, None, TIMESTAMP)
        .expect("payload");
    let second = xt::signature_payload(API_KEY, "GET", "/v4/public/depth", &query, None, TIMESTAMP)
        .expect("payload");
    assert_eq!(
        xt::hmac_sha256_hex(SECRET, &first).expect("sign"),
        xt::hmac_sha256_hex(SECRET, &second).expect("sign")
    );
}

#[test]
fn auth_headers_carry_the_full_validate_set() {
    let headers = xt::auth_headers(API_KEY, SECRET, "GET", "/v4/balances", &[], None, TIMESTAMP)
        .expect("headers");
    let names: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        vec![
            "validate-algorithms",
            "validate-appkey",
            "validate-recvwindow",
            "validate-timestamp",
            "validate-signature",
        ]
    );
    assert_eq!(headers[0].1, "HmacSHA256");
    assert_eq!(headers[1].1, API_KEY);
    assert_eq!(headers[2].1, "60000");
    assert_eq!(headers[3].1, TIMESTAMP.to_string());
    assert_eq!(
        headers[4].1,
        "d007e98acd9c5f55a9e5a76e4dd468ed15bf93cec6f4b2d2c3c365d6990dfbac"
    );
}
