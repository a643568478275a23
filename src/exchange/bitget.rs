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

const SUCCESS_CODE: &str = "00000";

#[derive(Clone, Debug)]
pub struct BitgetConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

pub struct BitgetExchange {
    client: Client,
    config: BitgetConfig,
}

impl BitgetExchange {
    pub fn new(config: BitgetConfig) -> crate::Result<Self> {
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
        let passphrase = creds.passphrase(ExchangeId::Bitget)?;
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

        let url = format!("{}{}", self.config.base_url, request_path);
        let mut request = self
            .client
            .request(method, url)
            .header("ACCESS-KEY", creds.api_key.as_str())
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", timestamp)
            .header("ACCESS-PASSPHRASE", passphrase)
            .header("Content-Type", "application/json");
        if !body_str.is_empty() {
            request = request.body(body_str);
        }

        let response = request
            .send()
            .map_err(|err| GatewayError::network(format!("bitget request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("bitget response parse failed: {err}"))
        })?;
        ensure_bitget_ok(&payload)?;
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
            .map_err(|err| GatewayError::network(format!("bitget request failed: {err}")))?;
        let payload = response.json::<Value>().map_err(|err| {
            GatewayError::malformed(format!("bitget response parse failed: {err}"))
        })?;
        ensure_bitget_ok(&payload)?;
        Ok(payload)
    }
}

impl Exchange for BitgetExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bitget
    }

    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value> {
        self.signed_request(
            Method::GET,
            "/api/v2/spot/account/assets",
            Vec::new(),
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
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let mut body = json!({
            "symbol": market_symbol(&order.symbol),
            "side": side,
            "orderType": order_type_label(order.kind),
            "size": format!("{}", order.quantity),
        });
        if let OrderKind::Limit = order.kind {
            let price = order.price.ok_or_else(|| {
                GatewayError::invalid_request("Price is required for LIMIT orders")
            })?;
            if let Some(map) = body.as_object_mut() {
                map.insert("price".to_string(), Value::String(format!("{price}")));
                map.insert("force".to_string(), Value::String("gtc".to_string()));
            }
        }
        self.signed_request(
            Method::POST,
            "/api/v2/spot/trade/place-order",
            Vec::new(),
            Some(body),
            creds,
        )
    }

    fn cancel_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let symbol = symbol.ok_or_else(|| {
            GatewayError::invalid_request("symbol is required to cancel a bitget order")
        })?;
        let body = json!({
            "symbol": market_symbol(symbol),
            "orderId": order_id,
        });
        self.signed_request(
            Method::POST,
            "/api/v2/spot/trade/cancel-order",
            Vec::new(),
            Some(body),
            creds,
        )
    }

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let mut params = vec![("limit".to_string(), limit.to_string())];
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), market_symbol(symbol)));
        }
        self.signed_request(
            Method::GET,
            "/api/v2/spot/trade/history-orders",
            params,
            None,
            creds,
        )
    }

    fn ticker(&self, symbol: &str) -> GatewayResult<Value> {
        self.public_request(
            "/api/v2/spot/market/tickers",
            vec![("symbol".to_string(), market_symbol(symbol))],
        )
    }

    fn symbols(&self) -> GatewayResult<Value> {
        self.public_request("/api/v2/spot/public/symbols", Vec::new())
    }

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value> {
        self.public_request(
            "/api/v2/spot/market/orderbook",
            vec![
                ("symbol".to_string(), market_symbol(symbol)),
                ("limit".to_string(), limit.to_string()),
            ],
        )
    }

    fn test_connection(&self) -> GatewayResult<Value> {
        self.public_request("/api/v2/public/time", Vec::new())
    }
}

/// Maps the spot assets payload onto the normalized schema. Zero-total
/// assets are dropped.
pub fn parse_portfolio_entries(payload: &Value) -> GatewayResult<Vec<BalanceEntry>> {
    let assets = payload
        .get("data")
        .and_then(|data| data.as_array())
        .ok_or_else(|| GatewayError::malformed("bitget assets missing"))?;

    let mut entries = Vec::new();
    for asset in assets {
        let currency = str_field(asset, "coin").to_string();
        if currency.is_empty() {
            continue;
        }
        let available = f64_field(asset, "available");
        // Older payloads report the frozen amount under "lock".
        let frozen = match asset.get("frozen") {
            Some(value) => super::value_to_f64(value).unwrap_or(0.0),
            None => f64_field(asset, "lock"),
        };
        let total = available + frozen;
        if total == 0.0 {
            continue;
        }
        let usd_value = asset
            .get("usdtValue")
            .and_then(|value| super::value_to_f64(value).ok());
        entries.push(BalanceEntry {
            currency,
            available,
            frozen,
            total,
            usd_value,
            exchanges: vec![ExchangeId::Bitget.as_str().to_string()],
        });
    }
    Ok(entries)
}

fn market_symbol(symbol: &str) -> String {
    symbol.replace(['_', '-', '/'], "").to_uppercase()
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

fn ensure_bitget_ok(payload: &Value) -> GatewayResult<()> {
    let code = str_field(payload, "code");
    if !code.is_empty() && code != SUCCESS_CODE {
        let message = str_field(payload, "msg");
        return Err(classify(ExchangeId::Bitget, code, message));
    }
    Ok(())
}
