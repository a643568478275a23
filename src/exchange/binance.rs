use crate::models::{
    BalanceEntry, Credentials, ExchangeId, GatewayError, GatewayResult, OrderKind, OrderRequest,
    Portfolio, Side,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;

use super::classify::classify;
use super::{f64_field, str_field, Exchange};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct BinanceConfig {
    pub base_url: String,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

pub struct BinanceExchange {
    client: Client,
    config: BinanceConfig,
}

impl BinanceExchange {
    pub fn new(config: BinanceConfig) -> crate::Result<Self> {
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
        mut params: Vec<(String, String)>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let timestamp = Utc::now().timestamp_millis();
        params.push(("timestamp".to_string(), timestamp.to_string()));
        if self.config.recv_window_ms > 0 {
            params.push((
                "recvWindow".to_string(),
                self.config.recv_window_ms.to_string(),
            ));
        }
        let query = build_query_string(&params);
        let signature = hmac_sha256_hex(&creds.secret_key, &query)?;
        let signed_query = format!("{query}&signature={signature}");
        let url = format!("{}{}?{}", self.config.base_url, path, signed_query);

        let response = self
            .client
            .request(method, url)
            .header("X-MBX-APIKEY", creds.api_key.as_str())
            .send()
            .map_err(|err| GatewayError::network(format!("binance request failed: {err}")))?;
        read_binance_response(response)
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
            .map_err(|err| GatewayError::network(format!("binance request failed: {err}")))?;
        read_binance_response(response)
    }

    // One bulk price fetch; per-asset USD valuation is best effort.
    fn usdt_prices(&self) -> HashMap<String, f64> {
        let mut prices = HashMap::new();
        let Ok(payload) = self.public_request("/api/v3/ticker/price", Vec::new()) else {
            return prices;
        };
        let Some(rows) = payload.as_array() else {
            return prices;
        };
        for row in rows {
            let symbol = str_field(row, "symbol");
            if let Some(asset) = symbol.strip_suffix("USDT") {
                prices.insert(asset.to_string(), f64_field(row, "price"));
            }
        }
        prices
    }
}

impl Exchange for BinanceExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value> {
        self.signed_request(Method::GET, "/api/v3/account", Vec::new(), creds)
    }

    fn fetch_portfolio(&self, creds: &Credentials) -> GatewayResult<Portfolio> {
        let payload = self.fetch_balances(creds)?;
        let prices = self.usdt_prices();
        let entries = parse_portfolio_entries(&payload, &prices)?;
        Ok(Portfolio::new(entries, Utc::now().timestamp_millis()))
    }

    fn place_order(&self, order: &OrderRequest, creds: &Credentials) -> GatewayResult<Value> {
        let side = match order.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let mut params = vec![
            ("symbol".to_string(), market_symbol(&order.symbol)),
            ("side".to_string(), side.to_string()),
            ("type".to_string(), order.kind.as_str().to_string()),
            ("quantity".to_string(), format!("{}", order.quantity)),
        ];
        if let OrderKind::Limit = order.kind {
            let price = order.price.ok_or_else(|| {
                GatewayError::invalid_request("Price is required for LIMIT orders")
            })?;
            params.push(("timeInForce".to_string(), "GTC".to_string()));
            params.push(("price".to_string(), format!("{price}")));
        }
        self.signed_request(Method::POST, "/api/v3/order", params, creds)
    }

    fn cancel_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let symbol = symbol.ok_or_else(|| {
            GatewayError::invalid_request("symbol is required to cancel a binance order")
        })?;
        let params = vec![
            ("symbol".to_string(), market_symbol(symbol)),
            ("orderId".to_string(), order_id.to_string()),
        ];
        self.signed_request(Method::DELETE, "/api/v3/order", params, creds)
    }

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value> {
        let symbol = symbol.ok_or_else(|| {
            GatewayError::invalid_request("symbol is required for binance order history")
        })?;
        let params = vec![
            ("symbol".to_string(), market_symbol(symbol)),
            ("limit".to_string(), limit.to_string()),
        ];
        self.signed_request(Method::GET, "/api/v3/allOrders", params, creds)
    }

    fn ticker(&self, symbol: &str) -> GatewayResult<Value> {
        self.public_request(
            "/api/v3/ticker/24hr",
            vec![("symbol".to_string(), market_symbol(symbol))],
        )
    }

    fn symbols(&self) -> GatewayResult<Value> {
        self.public_request("/api/v3/exchangeInfo", Vec::new())
    }

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value> {
        self.public_request(
            "/api/v3/depth",
            vec![
                ("symbol".to_string(), market_symbol(symbol)),
                ("limit".to_string(), limit.to_string()),
            ],
        )
    }

    fn test_connection(&self) -> GatewayResult<Value> {
        self.public_request("/api/v3/ping", Vec::new())
    }
}

/// Maps the `/api/v3/account` payload onto the normalized schema, valuing
/// each asset through its `<ASSET>USDT` price when one is known. Zero-total
/// assets are dropped.
pub fn parse_portfolio_entries(
    payload: &Value,
    usdt_prices: &HashMap<String, f64>,
) -> GatewayResult<Vec<BalanceEntry>> {
    let balances = payload
        .get("balances")
        .and_then(|value| value.as_array())
        .ok_or_else(|| GatewayError::malformed("binance balances missing"))?;

    let mut entries = Vec::new();
    for row in balances {
        let currency = str_field(row, "asset").to_string();
        if currency.is_empty() {
            continue;
        }
        let available = f64_field(row, "free");
        let frozen = f64_field(row, "locked");
        let total = available + frozen;
        if total == 0.0 {
            continue;
        }
        let usd_value = if currency.eq_ignore_ascii_case("USDT") {
            Some(total)
        } else {
            usdt_prices
                .get(&currency.to_uppercase())
                .map(|price| total * price)
        };
        entries.push(BalanceEntry {
            currency,
            available,
            frozen,
            total,
            usd_value,
            exchanges: vec![ExchangeId::Binance.as_str().to_string()],
        });
    }
    Ok(entries)
}

fn market_symbol(symbol: &str) -> String {
    symbol.replace(['_', '-', '/'], "").to_uppercase()
}

// Binance signals failure by HTTP status; the body carries {code, msg}.
fn read_binance_response(response: reqwest::blocking::Response) -> GatewayResult<Value> {
    let status = response.status();
    let payload = response.json::<Value>().map_err(|err| {
        GatewayError::malformed(format!("binance response parse failed: {err}"))
    })?;
    if !status.is_success() {
        let code = payload
            .get("code")
            .and_then(|value| value.as_i64())
            .map(|code| code.to_string())
            .unwrap_or_else(|| status.as_u16().to_string());
        let message = str_field(&payload, "msg");
        return Err(classify(ExchangeId::Binance, &code, message));
    }
    Ok(payload)
}

fn hmac_sha256_hex(secret: &str, message: &str) -> GatewayResult<String> {
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

fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&")
}
