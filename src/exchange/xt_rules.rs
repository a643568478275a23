use crate::models::{GatewayError, GatewayResult, OrderKind, OrderRequest, Side, SymbolRules};
use serde_json::Value;

use super::{f64_field, str_field};

/// Pulls the order-placement rules for one symbol out of the native
/// `/v4/public/symbol` payload.
pub fn parse_symbol_rules(payload: &Value, symbol: &str) -> GatewayResult<SymbolRules> {
    let listed = payload
        .get("result")
        .and_then(|result| result.get("symbols"))
        .and_then(|symbols| symbols.as_array())
        .ok_or_else(|| GatewayError::malformed("symbol metadata missing from response"))?;

    let row = listed
        .iter()
        .find(|row| str_field(row, "symbol").eq_ignore_ascii_case(symbol))
        .ok_or_else(|| {
            GatewayError::invalid_request(format!("symbol {symbol} is not listed on xt"))
        })?;

    Ok(SymbolRules {
        symbol: str_field(row, "symbol").to_string(),
        min_qty: f64_field(row, "minQty"),
        min_notional: f64_field(row, "minNotional"),
        base_precision: row
            .get("basePrecision")
            .and_then(|value| value.as_u64())
            .unwrap_or(8) as u32,
        price_precision: row
            .get("pricePrecision")
            .and_then(|value| value.as_u64())
            .unwrap_or(8) as u32,
    })
}

/// Checks an order against the symbol rules. Every violated rule is
/// reported; the caller rejects with the full list, not just the first hit.
pub fn validate_order(rules: &SymbolRules, order: &OrderRequest) -> Vec<String> {
    let mut violations = Vec::new();

    match order.kind {
        OrderKind::Limit => {
            let price = match order.price {
                Some(price) if price > 0.0 => price,
                _ => {
                    violations.push("price must be a positive number".to_string());
                    return violations;
                }
            };

            if rules.min_qty > 0.0 && order.quantity < rules.min_qty {
                violations.push(format!(
                    "quantity {} is below the minimum {}",
                    order.quantity, rules.min_qty
                ));
            }

            let notional = order.quantity * price;
            if rules.min_notional > 0.0 && notional < rules.min_notional {
                violations.push(format!(
                    "order total {} is below the minimum notional {}",
                    notional, rules.min_notional
                ));
            }

            if decimal_places(order.quantity) > rules.base_precision {
                violations.push(format!(
                    "quantity precision exceeds {} decimal places",
                    rules.base_precision
                ));
            }
            if decimal_places(price) > rules.price_precision {
                violations.push(format!(
                    "price precision exceeds {} decimal places",
                    rules.price_precision
                ));
            }
        }
        OrderKind::Market => {
            // XT MARKET orders express quantity as quote-currency spend, so
            // the minimum-notional floor applies to the quantity itself.
            if rules.min_notional > 0.0 && order.quantity < rules.min_notional {
                violations.push(format!(
                    "order amount {} is below the minimum notional {}",
                    order.quantity, rules.min_notional
                ));
            }
        }
    }

    violations
}

pub fn decimal_places(value: f64) -> u32 {
    let text = format!("{value}");
    match text.split_once('.') {
        Some((_, fraction)) => fraction.len() as u32,
        None => 0,
    }
}

/// Which currency an order spends, and how much of it, including the
/// exchange reserve that must remain untouched.
pub fn required_funds(order: &OrderRequest) -> GatewayResult<(String, f64)> {
    let (base, quote) = split_symbol(&order.symbol)?;
    match order.side {
        Side::Buy => {
            let spend = match order.kind {
                OrderKind::Limit => {
                    let price = order.price.ok_or_else(|| {
                        GatewayError::invalid_request("Price is required for LIMIT orders")
                    })?;
                    order.quantity * price
                }
                OrderKind::Market => order.quantity,
            };
            Ok((quote.to_string(), spend + reserve_for(quote)))
        }
        Side::Sell => Ok((base.to_string(), order.quantity)),
    }
}

// XT keeps one unit of USDT untouchable when spending USDT.
fn reserve_for(quote: &str) -> f64 {
    if quote.eq_ignore_ascii_case("usdt") {
        1.0
    } else {
        0.0
    }
}

pub fn split_symbol(symbol: &str) -> GatewayResult<(&str, &str)> {
    match symbol.split_once('_') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok((base, quote)),
        _ => Err(GatewayError::invalid_request(format!(
            "symbol {symbol} must use the BASE_QUOTE form, e.g. btc_usdt"
        ))),
    }
}

pub fn ensure_sufficient(currency: &str, required: f64, available: f64) -> GatewayResult<()> {
    if available < required {
        return Err(GatewayError::rejected(
            "INSUFFICIENT_BALANCE",
            format!(
                "Insufficient {} balance: required {}, available {}",
                currency.to_uppercase(),
                required,
                available
            ),
        )
        .with_help("Top up the account or reduce the order size"));
    }
    Ok(())
}
