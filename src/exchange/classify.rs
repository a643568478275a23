use crate::models::{ExchangeId, GatewayError};

/// Maps a vendor error code onto the normalized envelope. Codes come from
/// each exchange's published error tables; anything unlisted falls through
/// unclassified with the raw vendor message preserved.
pub fn classify(exchange: ExchangeId, code: &str, raw_message: &str) -> GatewayError {
    let known = match exchange {
        ExchangeId::Xt => classify_xt(code),
        ExchangeId::Bybit => classify_bybit(code),
        ExchangeId::Binance => classify_binance(code),
        ExchangeId::Kucoin => classify_kucoin(code),
        ExchangeId::Bitget => classify_bitget(code),
    };

    match known {
        Some((message, help)) => {
            let mut err = GatewayError::rejected(code, message);
            if let Some(help) = help {
                err = err.with_help(help);
            }
            err
        }
        None => {
            let message = if raw_message.is_empty() {
                format!("{exchange} rejected the request")
            } else {
                raw_message.to_string()
            };
            GatewayError::rejected(code, message)
        }
    }
}

type Known = Option<(&'static str, Option<&'static str>)>;

fn classify_xt(code: &str) -> Known {
    match code {
        "AUTH_001" | "AUTH_002" | "AUTH_003" => Some((
            "Authentication failed",
            Some("Check the API key and secret supplied in the request headers"),
        )),
        "AUTH_105" => Some((
            "Signature verification failed",
            Some("The secret key does not match the API key"),
        )),
        "ORDER_002" => Some((
            "Insufficient balance",
            Some("Top up the account or reduce the order size"),
        )),
        "ORDER_003" => Some((
            "Order below the minimum size",
            Some("Increase the quantity to meet the symbol's minimum"),
        )),
        "ORDER_005" => Some(("Order not found", None)),
        "SYMBOL_001" => Some(("Unknown trading symbol", None)),
        _ => None,
    }
}

fn classify_bybit(code: &str) -> Known {
    match code {
        "10003" | "10004" | "10005" => Some((
            "Authentication failed",
            Some("Check the API key, secret, and system clock drift"),
        )),
        "170131" => Some((
            "Insufficient balance",
            Some("Top up the account or reduce the order size"),
        )),
        "170140" => Some((
            "Order value below the minimum",
            Some("Increase the order value to meet the symbol's lower limit"),
        )),
        "170134" => Some(("Order price has too many decimals", None)),
        "170137" => Some(("Order quantity has too many decimals", None)),
        "170213" => Some(("Order not found", None)),
        _ => None,
    }
}

fn classify_binance(code: &str) -> Known {
    match code {
        "-1022" | "-2014" | "-2015" => Some((
            "Authentication failed",
            Some("Check the API key, secret, and key permissions"),
        )),
        "-2010" => Some((
            "Order rejected: insufficient balance",
            Some("Top up the account or reduce the order size"),
        )),
        "-1013" => Some((
            "Order violates a symbol filter (size, notional, or precision)",
            Some("Check the symbol's filters via /symbols"),
        )),
        "-1121" => Some(("Unknown trading symbol", None)),
        "-2011" => Some(("Cancel rejected: order not found", None)),
        _ => None,
    }
}

fn classify_kucoin(code: &str) -> Known {
    match code {
        "400003" | "400004" | "400005" | "400006" => Some((
            "Authentication failed",
            Some("Check the API key, secret, and passphrase"),
        )),
        "200004" => Some((
            "Insufficient balance",
            Some("Top up the account or reduce the order size"),
        )),
        "400100" => Some((
            "Invalid order parameter",
            Some("Check the order size, price, and symbol against /symbols"),
        )),
        "400500" => Some(("Order not found", None)),
        _ => None,
    }
}

fn classify_bitget(code: &str) -> Known {
    match code {
        "40006" | "40009" | "40037" => Some((
            "Authentication failed",
            Some("Check the API key, secret, and passphrase"),
        )),
        "43012" => Some((
            "Insufficient balance",
            Some("Top up the account or reduce the order size"),
        )),
        "45110" => Some((
            "Order value below the minimum",
            Some("Increase the order value to meet the symbol's lower limit"),
        )),
        "43025" => Some(("Order not found", None)),
        _ => None,
    }
}
