use crate::models::{GatewayError, GatewayResult, OrderKind, OrderRequest, Side};

/// Router-level order validation, run for every exchange before credentials
/// are even looked at. The order type defaults to LIMIT and is matched
/// case-insensitively.
pub fn validate_order(
    symbol: Option<&str>,
    quantity: Option<f64>,
    price: Option<f64>,
    kind_label: Option<&str>,
    side: Side,
) -> GatewayResult<OrderRequest> {
    let symbol = match symbol {
        Some(symbol) if !symbol.trim().is_empty() => symbol.trim().to_string(),
        _ => return Err(GatewayError::invalid_request("symbol is required")),
    };

    let quantity = match quantity {
        Some(quantity) if quantity > 0.0 => quantity,
        _ => {
            return Err(GatewayError::invalid_request(
                "quantity must be a positive number",
            ))
        }
    };

    let label = kind_label.unwrap_or("LIMIT").trim().to_uppercase();
    let kind = OrderKind::parse(&label)
        .ok_or_else(|| GatewayError::invalid_request("type must be LIMIT or MARKET"))?;

    match kind {
        OrderKind::Limit => {
            let price = price.ok_or_else(|| {
                GatewayError::invalid_request("Price is required for LIMIT orders")
            })?;
            if price <= 0.0 {
                return Err(GatewayError::invalid_request(
                    "price must be a positive number",
                ));
            }
            Ok(OrderRequest {
                symbol,
                side,
                kind,
                quantity,
                price: Some(price),
            })
        }
        OrderKind::Market => {
            if price.is_some() {
                return Err(GatewayError::invalid_request(
                    "Do not send price for MARKET orders",
                ));
            }
            Ok(OrderRequest {
                symbol,
                side,
                kind,
                quantity,
                price: None,
            })
        }
    }
}
