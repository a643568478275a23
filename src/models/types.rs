use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeId {
    Xt,
    Bybit,
    Binance,
    Kucoin,
    Bitget,
}

impl ExchangeId {
    // Aggregation iterates exchanges in this order; currency-name ties
    // resolve to the earlier exchange.
    pub const ALL: [ExchangeId; 5] = [
        ExchangeId::Xt,
        ExchangeId::Bybit,
        ExchangeId::Binance,
        ExchangeId::Kucoin,
        ExchangeId::Bitget,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "xt" => Some(ExchangeId::Xt),
            "bybit" => Some(ExchangeId::Bybit),
            "binance" => Some(ExchangeId::Binance),
            "kucoin" => Some(ExchangeId::Kucoin),
            "bitget" => Some(ExchangeId::Bitget),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Xt => "xt",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Binance => "binance",
            ExchangeId::Kucoin => "kucoin",
            ExchangeId::Bitget => "bitget",
        }
    }

    pub fn requires_passphrase(&self) -> bool {
        matches!(self, ExchangeId::Kucoin | ExchangeId::Bitget)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Request-scoped; never stored beyond the call that carried them.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn passphrase(&self, exchange: ExchangeId) -> GatewayResult<&str> {
        match self.passphrase.as_deref() {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(GatewayError::missing_credentials(format!(
                "{exchange} requires a passphrase"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "LIMIT" => Some(OrderKind::Limit),
            "MARKET" => Some(OrderKind::Market),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Limit => "LIMIT",
            OrderKind::Market => "MARKET",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: f64,
    pub price: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub currency: String,
    pub available: f64,
    pub frozen: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<f64>,
    pub exchanges: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(rename = "portfolio")]
    pub entries: Vec<BalanceEntry>,
    pub total_assets: usize,
    pub timestamp: i64,
}

impl Portfolio {
    pub fn new(entries: Vec<BalanceEntry>, timestamp: i64) -> Self {
        Self {
            total_assets: entries.len(),
            entries,
            timestamp,
        }
    }
}

// XT order-placement rules; fetched fresh for every order, never cached.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolRules {
    pub symbol: String,
    pub min_qty: f64,
    pub min_notional: f64,
    pub base_precision: u32,
    pub price_precision: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    MissingCredentials,
    Rejected,
    Unsupported,
    Network,
    Malformed,
}

// Normalized failure envelope; adapter errors never propagate as panics.
#[derive(Clone, Debug)]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
    pub help: Option<String>,
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            help: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingCredentials, message)
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Rejected, message);
        err.code = Some(code.into());
        err
    }

    pub fn unsupported(exchange: ExchangeId, operation: &str) -> Self {
        Self::new(
            ErrorKind::Unsupported,
            format!("{exchange} does not support {operation}"),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}
