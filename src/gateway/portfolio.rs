use crate::models::{BalanceEntry, ExchangeId, GatewayError, Portfolio};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFailure {
    pub exchange: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ExchangeFailure {
    pub fn from_error(exchange: ExchangeId, err: &GatewayError) -> Self {
        Self {
            exchange: exchange.as_str().to_string(),
            error: err.message.clone(),
            code: err.code.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedPortfolio {
    pub portfolio: Vec<BalanceEntry>,
    pub total_assets: usize,
    pub timestamp: i64,
    pub exchanges: Vec<String>,
    pub errors: Vec<ExchangeFailure>,
}

/// Merges per-exchange portfolios into one combined view, deduplicated by
/// currency (case-insensitive). Amount fields are summed independently;
/// `exchanges` collects every contributing exchange exactly once. The input
/// order is the fixed exchange priority, which makes the merge
/// deterministic regardless of fetch completion order.
pub fn merge_portfolios(parts: &[(ExchangeId, Portfolio)]) -> Vec<BalanceEntry> {
    let mut combined: Vec<BalanceEntry> = Vec::new();
    for (exchange, portfolio) in parts {
        let name = exchange.as_str();
        for entry in &portfolio.entries {
            match combined
                .iter_mut()
                .find(|candidate| candidate.currency.eq_ignore_ascii_case(&entry.currency))
            {
                Some(existing) => {
                    existing.available += entry.available;
                    existing.frozen += entry.frozen;
                    existing.total += entry.total;
                    existing.usd_value = match (existing.usd_value, entry.usd_value) {
                        (Some(a), Some(b)) => Some(a + b),
                        (Some(a), None) => Some(a),
                        (None, b) => b,
                    };
                    if !existing.exchanges.iter().any(|held| held == name) {
                        existing.exchanges.push(name.to_string());
                    }
                }
                None => {
                    let mut fresh = entry.clone();
                    if !fresh.exchanges.iter().any(|held| held == name) {
                        fresh.exchanges.push(name.to_string());
                    }
                    combined.push(fresh);
                }
            }
        }
    }
    combined
}

pub fn combine(
    parts: Vec<(ExchangeId, Portfolio)>,
    errors: Vec<ExchangeFailure>,
    timestamp: i64,
) -> CombinedPortfolio {
    let exchanges = parts
        .iter()
        .map(|(exchange, _)| exchange.as_str().to_string())
        .collect();
    let portfolio = merge_portfolios(&parts);
    CombinedPortfolio {
        total_assets: portfolio.len(),
        portfolio,
        timestamp,
        exchanges,
        errors,
    }
}

/// Every credential header the combined endpoints accept; returned as a
/// hint when a request carries none of them.
pub fn required_headers() -> Vec<String> {
    let mut headers = Vec::new();
    for exchange in ExchangeId::ALL {
        let name = exchange.as_str();
        headers.push(format!("x-{name}-api-key"));
        headers.push(format!("x-{name}-secret-key"));
        if exchange.requires_passphrase() {
            headers.push(format!("x-{name}-passphrase"));
        }
    }
    headers
}
