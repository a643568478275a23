use crate::models::{
    BalanceEntry, Credentials, ExchangeId, GatewayError, GatewayResult, OrderKind, OrderRequest,
    Portfolio, Side,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;

use super::classify::classify;
use super::xt_rules;
use super::{f64_field, str_field, Exchange};

type HmacSha256 = Hmac<Sha256>;

// Fixed window the signature string commits to; XT rejects anything else.
const RECV_WINDOW: &str = "60000";

#[derive(Clone, Debug)]
pub struct XtConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

pub struct XtExchange {
    client: Client,
    config: XtConfig,
}

impl XtExchange {
    pub fn new(config: XtConfig) -> crate::Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(crate::Error::new("base_url must be set"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| crate::Error::new(format!("http client build failed: {err}")))?;
        Ok(Self { client, config })
    }

    fn signed_request(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, Option<String>)>,
        body: Option<Value>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let timestamp = Utc::now().timestamp_millis();
        let body = strip_null_keys(body);
        let headers = auth_headers(
            &creds.api_key,
            &creds.secret_key,
            method.as_str(),
            path,
            &query,
            body.as_ref(),
            timestamp,
        )?;

        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let present: Vec<(String, String)> = query
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect();
        if !present.is_empty() {
            request = request.query(&present);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .map_err(|err| GatewayError::network(format!("xt request failed: {err}")))?;
        let payload = response
            .json::<Value>()
            .map_err(|err| GatewayError::malformed(format!("xt response parse failed: {err}")))?;
        ensure_xt_ok(&payload)?;
        Ok(payload)
    }

    fn public_request(&self, path: &str, params: Vec<(String, String)>) -> GatewayResult<Value> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(&params);
        }
        let response = request
            .send()
            .map_err(|err| GatewayError::network(format!("xt request failed: {err}")))?;
        let payload = response
            .json::<Value>()
            .map_err(|err| GatewayError::malformed(format!("xt response parse failed: {err}")))?;
        ensure_xt_ok(&payload)?;
        Ok(payload)
    }

    fn symbol_rules(&self, symbol: &str) -> GatewayResult<crate::models::SymbolRules> {
        let payload = self.public_request(
            "/v4/public/symbol",
            vec![("symbol".to_string(), symbol.to_string())],
        )?;
        xt_rules::parse_symbol_rules(&payload, symbol)
    }

    fn available_balance(&self, currency: &str, creds: &Credentials) -> GatewayResult<f64> {
        let payload = self.fetch_balances(creds)?;
        Ok(asset_rows(&payload)
            .iter()
            .find(|row| str_field(row, "currency").eq_ignore_ascii_case(currency))
            .map(|row| f64_field(row, "availableAmount"))
            .unwrap_or(0.0))
    }
}

impl Exchange for XtExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Xt
    }

    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value> {
        self.signed_request(Method::GET, "/v4/balances", Vec::new(), None, creds)
    }

    fn fetch_portfolio(&self, creds: &Credentials) -> GatewayResult<Portfolio> {
        let payload = self.fetch_balances(creds)?;
        let entries = parse_portfolio_entries(&payload);
        Ok(Portfolio::new(entries, Utc::now().timestamp_millis()))
    }

    fn place_order(&self, order: &OrderRequest, creds: &Credentials) -> GatewayResult<Value> {
        let rules = self.symbol_rules(&order.symbol)?;
        let violations = xt_rules::validate_order(&rules, order);
        if !violations.is_empty() {
            return Err(GatewayError::invalid_request(violations.join("; ")));
        }

        let (currency, required) = xt_rules::required_funds(order)?;
        let available = self.available_balance(&currency, creds)?;
        xt_rules::ensure_sufficient(&currency, required, available)?;

        let side = match order.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let mut body = json!({
            "symbol": order.symbol,
            "side": side,
            "type": order.kind.as_str(),
            "bizType": "SPOT",
        });
        if let Some(map) = body.as_object_mut() {
            match order.kind {
                OrderKind::Limit => {
                    let price = order.price.ok_or_else(|| {
                        GatewayError::invalid_request("Price is required for LIMIT orders")
                    })?;
                    map.insert("timeInForce".to_string(), Value::String("GTC".to_string()));
                    map.insert("price".to_string(), Value::String(format!("{price}")));
                    map.insert(
                        "quantity".to_string(),
                        Value::String(format!("{}", order.quantity)),
                    );
                }
                OrderKind::Market => {
                    // MARKET BUY spends quote currency, so the amount goes
                    // out as quoteQty; MARKET SELL moves base quantity.
                    let field = match order.side {
                        Side::Buy => "quoteQty",
                        Side::Sell => "quantity",
                    };
                    map.insert(
                        field.to_string(),
                        Value::String(format!("{}", order.quantity)),
                    );
                }
            }
        }

        self.signed_request(Method::POST, "/v4/order", Vec::new(), Some(body), creds)
    }

    fn cancel_order(
        &self,
        order_id: &str,
        _symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let path = format!("/v4/order/{order_id}");
        self.signed_request(Method::DELETE, &path, Vec::new(), None, creds)
    }

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let query = vec![
            ("symbol".to_string(), symbol.map(|value| value.to_string())),
            ("limit".to_string(), Some(limit.to_string())),
        ];
        self.signed_request(Method::GET, "/v4/history-order", query, None, creds)
    }

    fn ticker(&self, symbol: &str) -> GatewayResult<Value> {
        self.public_request(
            "/v4/public/ticker",
            vec![("symbol".to_string(), symbol.to_string())],
        )
    }

    fn symbols(&self) -> GatewayResult<Value> {
        self.public_request("/v4/public/symbol", Vec::new())
    }

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value> {
        self.public_request(
            "/v4/public/depth",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )
    }

    fn test_connection(&self) -> GatewayResult<Value> {
        self.public_request("/v4/public/time", Vec::new())
    }
}

/// Builds the five `validate-*` headers XT authenticates with.
pub fn auth_headers(
    api_key: &str,
    secret_key: &str,
    method: &str,
    path: &str,
    query: &[(String, Option<String>)],
    body: Option<&Value>,
    timestamp_ms: i64,
) -> GatewayResult<Vec<(&'static str, String)>> {
    let payload = signature_payload(api_key, method, path, query, body, timestamp_ms)?;
    let signature = hmac_sha256_hex(secret_key, &payload)?;
    Ok(vec![
        ("validate-algorithms", "HmacSHA256".to_string()),
        ("validate-appkey", api_key.to_string()),
        ("validate-recvwindow", RECV_WINDOW.to_string()),
        ("validate-timestamp", timestamp_ms.to_string()),
        ("validate-signature", signature),
    ])
}

/// The exact string XT signs: header fragment X followed by request
/// fragment Y. Any byte of drift breaks authentication.
pub fn signature_payload(
    api_key: &str,
    method: &str,
    path: &str,
    query: &[(String, Option<String>)],
    body: Option<&Value>,
    timestamp_ms: i64,
) -> GatewayResult<String> {
    let header_part = format!(
        "validate-algorithms=HmacSHA256&validate-appkey={api_key}&validate-recvwindow={RECV_WINDOW}&validate-timestamp={timestamp_ms}"
    );
    let query_part = canonical_query(query);
    let body_part = canonical_body(body)?;
    Ok(format!("{header_part}#{method}#{path}{query_part}{body_part}"))
}

/// Sorted `key=value` pairs joined with `&`, `#`-prefixed when non-empty.
/// Params without a value are dropped before the emptiness check.
pub fn canonical_query(params: &[(String, Option<String>)]) -> String {
    let mut present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
        .collect();
    if present.is_empty() {
        return String::new();
    }
    present.sort_by(|a, b| a.0.cmp(b.0));
    let joined = present
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&");
    format!("#{joined}")
}

/// JSON body `#`-prefixed, after null-valued keys are stripped; an object
/// left with no keys counts as no body at all.
pub fn canonical_body(body: Option<&Value>) -> GatewayResult<String> {
    let Some(stripped) = strip_null_keys(body.cloned()) else {
        return Ok(String::new());
    };
    let serialized = serde_json::to_string(&stripped)
        .map_err(|err| GatewayError::malformed(format!("json encode failed: {err}")))?;
    Ok(format!("#{serialized}"))
}

pub fn strip_null_keys(body: Option<Value>) -> Option<Value> {
    match body {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => {
            let kept: serde_json::Map<String, Value> = map
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        Some(other) => Some(other),
    }
}

pub fn hmac_sha256_hex(secret: &str, message: &str) -> GatewayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::malformed("invalid key"))?;
    mac.update(message.as_bytes());
    let result = mac.finalize().into_bytes();
    Ok(bytes_to_hex(&result))
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{:02x}", byte));
    }
    output
}

fn ensure_xt_ok(payload: &Value) -> GatewayResult<()> {
    let rc = payload.get("rc").and_then(|value| value.as_i64()).unwrap_or(0);
    if rc != 0 {
        let code = str_field(payload, "mc");
        return Err(classify(ExchangeId::Xt, code, code));
    }
    Ok(())
}

fn asset_rows(payload: &Value) -> Vec<&Value> {
    let result = payload.get("result").unwrap_or(payload);
    let rows = result
        .get("assets")
        .and_then(|assets| assets.as_array())
        .or_else(|| result.as_array());
    rows.map(|rows| rows.iter().collect()).unwrap_or_default()
}

/// Maps the native `/v4/balances` payload onto the normalized schema.
/// Zero-total assets are dropped.
pub fn parse_portfolio_entries(payload: &Value) -> Vec<BalanceEntry> {
    let mut entries = Vec::new();
    for row in asset_rows(payload) {
        let currency = str_field(row, "currency").to_string();
        if currency.is_empty() {
            continue;
        }
        let available = f64_field(row, "availableAmount");
        let frozen = f64_field(row, "frozenAmount");
        let total = match row.get("totalAmount") {
            Some(value) => super::value_to_f64(value).unwrap_or(available + frozen),
            None => available + frozen,
        };
        if total == 0.0 {
            continue;
        }
        let usd_value = row
            .get("convertUsdtAmount")
            .and_then(|value| super::value_to_f64(value).ok());
        entries.push(BalanceEntry {
            currency,
            available,
            frozen,
            total,
            usd_value,
            exchanges: vec![ExchangeId::Xt.as_str().to_string()],
        });
    }
    entries
}
