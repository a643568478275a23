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
use super::{f64_field, str_field, Exchange};

type HmacSha256 = Hmac<Sha256>;

const CATEGORY: &str = "spot";
const ACCOUNT_TYPE: &str = "UNIFIED";

#[derive(Clone, Debug)]
pub struct BybitConfig {
    pub base_url: String,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

pub struct BybitExchange {
    client: Client,
    config: BybitConfig,
}

impl BybitExchange {
    pub fn new(config: BybitConfig) -> crate::Result<Self> {
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
        params: Vec<(String, String)>,
        body: Option<Value>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let recv_window = self.config.recv_window_ms.to_string();
        let query = build_query_string(&params);
        let body_str = if let Some(body) = body {
            serde_json::to_string(&body)
                .map_err(|err| GatewayError::malformed(format!("json encode failed: {err}")))?
        } else {
            String::new()
        };
        // v5 signs timestamp + key + window + (query for GET, body otherwise).
        let sign_payload = if method == Method::GET {
            format!("{}{}{}{}", timestamp, creds.api_key, recv_window, query)
        } else {
            format!("{}{}{}{}", timestamp, creds.api_key, recv_window, body_str)
        };
        let signature = hmac_sha256_hex(&creds.secret_key, &sign_payload)?;

        let url = if query.is_empty() {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}{}?{}", self.config.base_url, path, query)
        };

        let mut request = self
            .client
            .request(method, url)
            .header("X-BAPI-API-KEY", creds.api_key.as_str())
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", recv_window)
            .header("Content-Type", "application/json");
        if !body_str.is_empty() {
            request = request.body(body_str);
        }

        let response = request
            .send()
            .map_err(|err| GatewayError::network(format!("bybit request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("bybit response parse failed: {err}"))
        })?;
        ensure_bybit_ok(&payload)?;
        Ok(payload)
    }

    fn public_request(&self, path: &str, params: Vec<(String, String)>) -> GatewayResult<Value> {
        let query = build_query_string(&params);
        let url = if query.is_empty() {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}{}?{}", self.config.base_url, path, query)
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GatewayError::network(format!("bybit request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("bybit response parse failed: {err}"))
        })?;
        ensure_bybit_ok(&payload)?;
        Ok(payload)
    }
}

impl Exchange for BybitExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value> {
        self.signed_request(
            Method::GET,
            "/v5/account/wallet-balance",
            vec![("accountType".to_string(), ACCOUNT_TYPE.to_string())],
            None,
            creds,
        )
    }

    fn fetch_portfolio(&self, creds: &Credentials) -> GatewayResult<Portfolio> {
        let payload = self.fetch_balances(creds)?;
        let entries = parse_portfolio_entries(&payload)?;
        Ok(Portfolio::new(entries, Utc::now().timestamp_millis()))
    }

    fn place_order(&self, order: &OrderRequest, creds: &Credentials) -> GatewayResult<Value> {
        let side = match order.side {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        };
        let mut body = json!({
            "category": CATEGORY,
            "symbol": market_symbol(&order.symbol),
            "side": side,
            "orderType": order_type_label(order.kind),
            "qty": format!("{}", order.quantity),
        });
        if let OrderKind::Limit = order.kind {
            let price = order.price.ok_or_else(|| {
                GatewayError::invalid_request("Price is required for LIMIT orders")
            })?;
            if let Some(map) = body.as_object_mut() {
                map.insert("price".to_string(), Value::String(format!("{price}")));
                map.insert("timeInForce".to_string(), Value::String("GTC".to_string()));
            }
        }
        self.signed_request(Method::POST, "/v5/order/create", Vec::new(), Some(body), creds)
    }

    fn cancel_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let symbol = symbol.ok_or_else(|| {
            GatewayError::invalid_request("symbol is required to cancel a bybit order")
        })?;
        let body = json!({
            "category": CATEGORY,
            "symbol": market_symbol(symbol),
            "orderId": order_id,
        });
        self.signed_request(Method::POST, "/v5/order/cancel", Vec::new(), Some(body), creds)
    }

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let mut params = vec![
            ("category".to_string(), CATEGORY.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), market_symbol(symbol)));
        }
        self.signed_request(Method::GET, "/v5/order/history", params, None, creds)
    }

    fn ticker(&self, symbol: &str) -> GatewayResult<Value> {
        self.public_request(
            "/v5/market/tickers",
            vec![
                ("category".to_string(), CATEGORY.to_string()),
                ("symbol".to_string(), market_symbol(symbol)),
            ],
        )
    }

    fn symbols(&self) -> GatewayResult<Value> {
        self.public_request(
            "/v5/market/instruments-info",
            vec![("category".to_string(), CATEGORY.to_string())],
        )
    }

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value> {
        self.public_request(
            "/v5/market/orderbook",
            vec![
                ("category".to_string(), CATEGORY.to_string()),
                ("symbol".to_string(), market_symbol(symbol)),
                ("limit".to_string(), limit.to_string()),
            ],
        )
    }

    fn test_connection(&self) -> GatewayResult<Value> {
        self.public_request("/v5/market/time", Vec::new())
    }
}

/// Maps the v5 wallet-balance payload onto the normalized schema. Bybit
/// reports the wallet total and the locked slice; available is the
/// difference. Zero-total assets are dropped.
pub fn parse_portfolio_entries(payload: &Value) -> GatewayResult<Vec<BalanceEntry>> {
    let accounts = payload
        .get("result")
        .and_then(|result| result.get("list"))
        .and_then(|list| list.as_array())
        .ok_or_else(|| GatewayError::malformed("bybit wallet list missing"))?;

    let mut entries = Vec::new();
    for account in accounts {
        let coins = account
            .get("coin")
            .and_then(|coins| coins.as_array())
            .map(|coins| coins.iter().collect::<Vec<_>>())
            .unwrap_or_default();
        for coin in coins {
            let currency = str_field(coin, "coin").to_string();
            if currency.is_empty() {
                continue;
            }
            let total = f64_field(coin, "walletBalance");
            let frozen = f64_field(coin, "locked");
            if total == 0.0 {
                continue;
            }
            let usd_value = coin
                .get("usdValue")
                .and_then(|value| super::value_to_f64(value).ok());
            entries.push(BalanceEntry {
                currency,
                available: total - frozen,
                frozen,
                total,
                usd_value,
                exchanges: vec![ExchangeId::Bybit.as_str().to_string()],
            });
        }
    }
    Ok(entries)
}

// btc_usdt -> BTCUSDT; native symbols pass through.
fn market_symbol(symbol: &str) -> String {
    symbol.replace(['_', '-', '/'], "").to_uppercase()
}

fn order_type_label(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::Limit => "Limit",
        OrderKind::Market => "Market",
    }
}

fn hmac_sha256_hex(secret: &str, payload: &str) -> GatewayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::malformed("invalid key"))?;
    mac.update(payload.as_bytes());
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

fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&")
}

fn ensure_bybit_ok(payload: &Value) -> GatewayResult<()> {
    let code = payload
        .get("retCode")
        .and_then(|value| value.as_i64())
        .unwrap_or(0);
    if code != 0 {
        let message = str_field(payload, "retMsg");
        return Err(classify(ExchangeId::Bybit, &code.to_string(), message));
    }
    Ok(())
}
