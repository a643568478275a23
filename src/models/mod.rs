pub mod types;

pub use types::{
    BalanceEntry, Credentials, ErrorKind, ExchangeId, GatewayError, GatewayResult, OrderKind,
    OrderRequest, Portfolio, Side, SymbolRules,
};
