pub mod binance;
pub mod bitget;
pub mod bybit;
pub mod classify;
pub mod kucoin;
pub mod xt;
pub mod xt_rules;

use crate::config::Config;
use crate::models::{Credentials, ExchangeId, GatewayError, GatewayResult, OrderRequest, Portfolio};
use crate::Result;
use serde_json::Value;

/// Common capability set every adapter implements. Operations an exchange
/// cannot serve must fail with an explicit `Unsupported` error, never
/// silently.
pub trait Exchange: Send + Sync {
    fn id(&self) -> ExchangeId;

    /// Exchange-native balance payload, untouched.
    fn fetch_balances(&self, creds: &Credentials) -> GatewayResult<Value>;

    /// Normalized view of the account: zero-total assets excluded, field
    /// names mapped onto the common schema.
    fn fetch_portfolio(&self, creds: &Credentials) -> GatewayResult<Portfolio>;

    /// Returns the exchange-native acknowledgement payload.
    fn place_order(&self, order: &OrderRequest, creds: &Credentials) -> GatewayResult<Value>;

    fn cancel_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
        creds: &Credentials,
    ) -> GatewayResult<Value>;

    fn order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
        creds: &Credentials,
    ) -> GatewayResult<Value>;

    fn ticker(&self, symbol: &str) -> GatewayResult<Value>;

    fn symbols(&self) -> GatewayResult<Value>;

    fn depth(&self, symbol: &str, limit: u32) -> GatewayResult<Value>;

    /// Public endpoint, no credentials.
    fn test_connection(&self) -> GatewayResult<Value>;
}

/// One adapter per exchange, constructed at startup, stateless per request.
pub struct Adapters {
    xt: xt::XtExchange,
    bybit: bybit::BybitExchange,
    binance: binance::BinanceExchange,
    kucoin: kucoin::KucoinExchange,
    bitget: bitget::BitgetExchange,
}

impl Adapters {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout_secs = config.http.timeout_secs;
        Ok(Self {
            xt: xt::XtExchange::new(xt::XtConfig {
                base_url: config.endpoints.xt_base_url.clone(),
                timeout_secs,
            })?,
            bybit: bybit::BybitExchange::new(bybit::BybitConfig {
                base_url: config.endpoints.bybit_base_url.clone(),
                recv_window_ms: config.http.recv_window_ms,
                timeout_secs,
            })?,
            binance: binance::BinanceExchange::new(binance::BinanceConfig {
                base_url: config.endpoints.binance_base_url.clone(),
                recv_window_ms: config.http.recv_window_ms,
                timeout_secs,
            })?,
            kucoin: kucoin::KucoinExchange::new(kucoin::KucoinConfig {
                base_url: config.endpoints.kucoin_base_url.clone(),
                timeout_secs,
            })?,
            bitget: bitget::BitgetExchange::new(bitget::BitgetConfig {
                base_url: config.endpoints.bitget_base_url.clone(),
                timeout_secs,
            })?,
        })
    }

    pub fn get(&self, id: ExchangeId) -> &dyn Exchange {
        match id {
            ExchangeId::Xt => &self.xt,
            ExchangeId::Bybit => &self.bybit,
            ExchangeId::Binance => &self.binance,
            ExchangeId::Kucoin => &self.kucoin,
            ExchangeId::Bitget => &self.bitget,
        }
    }
}

pub(crate) fn value_to_f64(value: &Value) -> GatewayResult<f64> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| GatewayError::malformed("number is not f64")),
        Value::String(text) => text
            .parse::<f64>()
            .map_err(|err| GatewayError::malformed(format!("invalid f64: {err}"))),
        _ => Err(GatewayError::malformed("unexpected value type for f64")),
    }
}

// Lenient field read used on balance rows; missing or malformed amounts
// count as zero rather than failing the whole portfolio.
pub(crate) fn f64_field(entry: &Value, key: &str) -> f64 {
    entry
        .get(key)
        .and_then(|value| value_to_f64(value).ok())
        .unwrap_or(0.0)
}

pub(crate) fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(|value| value.as_str()).unwrap_or("")
}
