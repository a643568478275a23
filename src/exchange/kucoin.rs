use crate::models::{
    BalanceEntry, Credentials, ExchangeId, GatewayError, GatewayResult, OrderKind, OrderRequest,
    Portfolio, Side,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
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

const SUCCESS_CODE: &str = "200000";

#[derive(Clone, Debug)]
pub struct KucoinConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

pub struct KucoinExchange {
    client: Client,
    config: KucoinConfig,
}

impl KucoinExchange {
    pub fn new(config: KucoinConfig) -> crate::Result<Self> {
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
        let passphrase = creds.passphrase(ExchangeId::Kucoin)?;
        let timestamp = Utc::now().timestamp_millis().to_string();
        let query = build_query_string(&params);
        let request_path = if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        };
        let body_str = if let Some(body) = body {
            serde_json::to_string(&body)
                .map_err(|err| GatewayError::malformed(format!("json encode failed: {err}")))?
        } else {
            String::new()
        };

        let prehash = format!("{timestamp}{}{request_path}{body_str}", method.as_str());
        let signature = hmac_sha256_base64(&creds.secret_key, &prehash)?;
        // KC-API key version 2: the passphrase header is itself signed.
        let signed_passphrase = hmac_sha256_base64(&creds.secret_key, passphrase)?;

        let url = format!("{}{}", self.config.base_url, request_path);
        let mut request = self
            .client
            .request(method, url)
            .header("KC-API-KEY", creds.api_key.as_str())
            .header("KC-API-SIGN", signature)
            .header("KC-API-TIMESTAMP", timestamp)
            .header("KC-API-PASSPHRASE", signed_passphrase)
            .header("KC-API-KEY-VERSION", "2")
            .header("Content-Type", "application/json");
        if !body_str.is_empty() {
            request = request.body(body_str);
        }

        let response = request
            .send()
            .map_err(|err| GatewayError::network(format!("kucoin request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("kucoin response parse failed: {err}"))
        })?;
        ensure_kucoin_ok(&payload)?;
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
            .map_err(|err| GatewayError::network(format!("kucoin request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("kucoin response parse failed: {err}"))
        })?;
        ensure_kucoin_ok(&payload)?;
        Ok(payload)
    }
}

impl Exchange for KucoinExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Kucoin
    }

    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value> {
        self.signed_request(Method::GET, "/api/v1/accounts", Vec::new(), None, creds)
    }

    fn fetch_portfolio(&self, creds: &Credentials) -> GatewayResult<Portfolio> {
        let payload = self.fetch_balances(creds)?;
        let entries = parse_portfolio_entries(&payload)?;
        Ok(Portfolio::new(entries, Utc::now().timestamp_millis()))
    }

    fn place_order(&self, order: &OrderRequest, creds: &Credentials) -> GatewayResult<Value> {
        let side = match order.side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let client_oid = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut body = json!({
            "clientOid": client_oid.to_string(),
            "symbol": market_symbol(&order.symbol),
            "side": side,
            "type": order_type_label(order.kind),
            "size": format!("{}", order.quantity),
        });
        if let OrderKind::Limit = order.kind {
            let price = order.price.ok_or_else(|| {
                GatewayError::invalid_request("Price is required for LIMIT orders")
            })?;
            if let Some(map) = body.as_object_mut() {
                map.insert("price".to_string(), Value::String(format!("{price}")));
            }
        }
        self.signed_request(Method::POST, "/api/v1/orders", Vec::new(), Some(body), creds)
    }

    fn cancel_order(
        &self,
        order_id: &str,
        _symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let path = format!("/api/v1/orders/{order_id}");
        self.signed_request(Method::DELETE, &path, Vec::new(), None, creds)
    }

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let mut params = vec![
            ("status".to_string(), "done".to_string()),
            ("pageSize".to_string(), limit.to_string()),
        ];
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), market_symbol(symbol)));
        }
        self.signed_request(Method::GET, "/api/v1/orders", params, None, creds)
    }

    fn ticker(&self, symbol: &str) -> GatewayResult<Value> {
        self.public_request(
            "/api/v1/market/orderbook/level1",
            vec![("symbol".to_string(), market_symbol(symbol))],
        )
    }

    fn symbols(&self) -> GatewayResult<Value> {
        self.public_request("/api/v2/symbols", Vec::new())
    }

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value> {
        let path = if limit <= 20 {
            "/api/v1/market/orderbook/level2_20"
        } else {
            "/api/v1/market/orderbook/level2_100"
        };
        self.public_request(path, vec![("symbol".to_string(), market_symbol(symbol))])
    }

    fn test_connection(&self) -> GatewayResult<Value> {
        self.public_request("/api/v1/timestamp", Vec::new())
    }
}

/// Maps the `/api/v1/accounts` payload onto the normalized schema. One
/// currency can appear under several account types (main, trade, margin);
/// the normalized view folds them into a single entry. Zero-total rows are
/// dropped.
pub fn parse_portfolio_entries(payload: &Value) -> GatewayResult<Vec<BalanceEntry>> {
    let accounts = payload
        .get("data")
        .and_then(|data| data.as_array())
        .ok_or_else(|| GatewayError::malformed("kucoin accounts missing"))?;

    let mut entries: Vec<BalanceEntry> = Vec::new();
    for account in accounts {
        let currency = str_field(account, "currency").to_string();
        if currency.is_empty() {
            continue;
        }
        let available = f64_field(account, "available");
        let frozen = f64_field(account, "holds");
        let total = f64_field(account, "balance");
        if total == 0.0 {
            continue;
        }
        if let Some(existing) = entries
            .iter_mut()
            .find(|entry| entry.currency.eq_ignore_ascii_case(&currency))
        {
            existing.available += available;
            existing.frozen += frozen;
            existing.total += total;
        } else {
            entries.push(BalanceEntry {
                currency,
                available,
                frozen,
                total,
                usd_value: None,
                exchanges: vec![ExchangeId::Kucoin.as_str().to_string()],
            });
        }
    }
    Ok(entries)
}

// btc_usdt -> BTC-USDT; already-dashed symbols pass through.
fn market_symbol(symbol: &str) -> String {
    symbol.replace(['_', '/'], "-").to_uppercase()
}

fn order_type_label(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::Limit => "limit",
        OrderKind::Market => "market",
    }
}

fn hmac_sha256_base64(secret: &str, message: &str) -> GatewayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::malformed("invalid key"))?;
    mac.update(message.as_bytes());
    let result = mac.finalize().into_bytes();
    Ok(STANDARD.encode(result))
}

fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&")
}

fn ensure_kucoin_ok(payload: &Value) -> GatewayResult<()> {
    let code = str_field(payload, "code");
    if !code.is_empty() && code != SUCCESS_CODE {
        let message = str_field(payload, "msg");
        return Err(classify(ExchangeId::Kucoin, code, message));
    }
    Ok(())
}
