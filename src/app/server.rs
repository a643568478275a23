use crate::ai::ChatRelay;
use crate::config::Config;
use crate::exchange::Adapters;
use crate::gateway::portfolio::{combine, required_headers, ExchangeFailure};
use crate::gateway::validate::validate_order;
use crate::models::{
    Credentials, ErrorKind, ExchangeId, GatewayError, GatewayResult, Side,
};
use crate::{Error, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

struct AppState {
    adapters: Adapters,
    chat: ChatRelay,
}

pub async fn run(config: Config) -> Result<()> {
    let addr = config.server.bind_addr.clone();
    // Blocking HTTP clients are built off the async runtime, the same way
    // every adapter call runs through spawn_blocking later.
    let state = spawn_blocking(move || -> Result<AppState> {
        let adapters = Adapters::from_config(&config)?;
        let chat = ChatRelay::new(config.ai.clone(), config.http.timeout_secs)?;
        Ok(AppState { adapters, chat })
    })
    .await
    .map_err(|err| Error::new(format!("startup task failed: {err}")))??;
    let state = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/balance", get(balance))
        .route("/portfolio", get(portfolio))
        .route("/portfolio/combined", get(portfolio_combined))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/orders/:order_id", delete(cancel_order))
        .route("/orders", get(order_history))
        .route("/symbols", get(symbols))
        .route("/ticker/:symbol", get(ticker))
        .route("/depth/:symbol", get(depth))
        .route("/connection", get(connection))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| Error::new(format!("bind failed: {err}")))?;
    info!("listening on {addr}");
    axum::serve(listener, app)
        .await
        .map_err(|err| Error::new(format!("server error: {err}")))?;
    Ok(())
}

// Every endpoint answers with this envelope; clients branch on `success`,
// never on the HTTP status text.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_headers: Option<Vec<String>>,
}

impl ApiResponse {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
            help: None,
            exchange: None,
            required_headers: None,
        }
    }

    fn err(err: &GatewayError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.message.clone()),
            code: err.code.clone(),
            help: err.help.clone(),
            exchange: None,
            required_headers: None,
        }
    }

    fn with_exchange(mut self, exchange: ExchangeId) -> Self {
        self.exchange = Some(exchange.as_str().to_string());
        self
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest | ErrorKind::Rejected | ErrorKind::Unsupported => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::MissingCredentials => StatusCode::UNAUTHORIZED,
        ErrorKind::Network | ErrorKind::Malformed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond_ok(data: Value) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

fn respond_created(data: Value, exchange: ExchangeId) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(data).with_exchange(exchange)),
    )
        .into_response()
}

fn respond_err(err: &GatewayError, exchange: Option<ExchangeId>) -> Response {
    let status = status_for(err.kind);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {}", err.message);
    }
    let mut body = ApiResponse::err(err);
    if let Some(exchange) = exchange {
        body = body.with_exchange(exchange);
    }
    (status, Json(body)).into_response()
}

async fn run_adapter<T, F>(task: F) -> GatewayResult<T>
where
    F: FnOnce() -> GatewayResult<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(task)
        .await
        .map_err(|err| GatewayError::malformed(format!("worker task failed: {err}")))?
}

fn parse_exchange(param: Option<&str>) -> GatewayResult<ExchangeId> {
    let value = param.ok_or_else(|| {
        GatewayError::invalid_request("exchange parameter is required")
    })?;
    ExchangeId::parse(value)
        .ok_or_else(|| GatewayError::invalid_request(format!("unknown exchange: {value}")))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// Single-exchange endpoints authenticate with the generic header pair plus
// the exchange-named passphrase header where one is required.
pub fn single_credentials(
    headers: &HeaderMap,
    exchange: ExchangeId,
) -> GatewayResult<Credentials> {
    let api_key = header_value(headers, "x-api-key");
    let secret_key = header_value(headers, "x-secret-key");
    let (Some(api_key), Some(secret_key)) = (api_key, secret_key) else {
        return Err(GatewayError::missing_credentials(
            "x-api-key and x-secret-key headers are required",
        ));
    };
    let mut creds = Credentials::new(api_key, secret_key);
    if exchange.requires_passphrase() {
        let header = format!("x-{}-passphrase", exchange.as_str());
        let passphrase = header_value(headers, &header).ok_or_else(|| {
            GatewayError::missing_credentials(format!("{header} header is required"))
        })?;
        creds = creds.with_passphrase(passphrase);
    }
    Ok(creds)
}

// Combined endpoints read per-exchange header sets; an exchange with no key
// pair is skipped silently. A present pair missing its passphrase is kept:
// the adapter reports the precise failure, which lands in `errors`.
pub fn combined_credentials(headers: &HeaderMap, exchange: ExchangeId) -> Option<Credentials> {
    let name = exchange.as_str();
    let api_key = header_value(headers, &format!("x-{name}-api-key"))?;
    let secret_key = header_value(headers, &format!("x-{name}-secret-key"))?;
    let mut creds = Credentials::new(api_key, secret_key);
    if let Some(passphrase) = header_value(headers, &format!("x-{name}-passphrase")) {
        creds = creds.with_passphrase(passphrase);
    }
    Some(creds)
}

#[derive(Deserialize)]
struct ExchangeQuery {
    exchange: Option<String>,
}

#[derive(Deserialize)]
struct OrdersQuery {
    exchange: Option<String>,
    symbol: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct DepthQuery {
    exchange: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct OrderBody {
    symbol: Option<String>,
    quantity: Option<f64>,
    price: Option<f64>,
    #[serde(rename = "type")]
    order_type: Option<String>,
    exchange: Option<String>,
}

#[derive(Deserialize)]
struct CancelBody {
    exchange: Option<String>,
    symbol: Option<String>,
}

#[derive(Deserialize)]
struct ChatBody {
    provider: Option<String>,
    message: Option<String>,
}

async fn health() -> Response {
    respond_ok(json!({
        "status": "ok",
        "timestamp": Utc::now().timestamp_millis(),
    }))
}

async fn balance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeQuery>,
    headers: HeaderMap,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let creds = match single_credentials(&headers, exchange) {
        Ok(creds) => creds,
        Err(err) => return respond_err(&err, Some(exchange)),
    };
    let result =
        run_adapter(move || state.adapters.get(exchange).fetch_balances(&creds)).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn portfolio(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeQuery>,
    headers: HeaderMap,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let creds = match single_credentials(&headers, exchange) {
        Ok(creds) => creds,
        Err(err) => return respond_err(&err, Some(exchange)),
    };
    let result =
        run_adapter(move || state.adapters.get(exchange).fetch_portfolio(&creds)).await;
    match result.and_then(|portfolio| {
        serde_json::to_value(portfolio)
            .map_err(|err| GatewayError::malformed(format!("serialize failed: {err}")))
    }) {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn portfolio_combined(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let mut tasks = Vec::new();
    for exchange in ExchangeId::ALL {
        let Some(creds) = combined_credentials(&headers, exchange) else {
            continue;
        };
        let state = state.clone();
        tasks.push((
            exchange,
            spawn_blocking(move || state.adapters.get(exchange).fetch_portfolio(&creds)),
        ));
    }

    if tasks.is_empty() {
        let err = GatewayError::missing_credentials("No exchange credentials provided");
        let mut body = ApiResponse::err(&err);
        body.code = Some("NO_CREDENTIALS".to_string());
        body.required_headers = Some(required_headers());
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    // Fan-out is concurrent; joining in ExchangeId::ALL order keeps the
    // aggregation priority fixed regardless of completion order.
    let mut parts = Vec::new();
    let mut errors = Vec::new();
    for (exchange, task) in tasks {
        match task.await {
            Ok(Ok(portfolio)) => parts.push((exchange, portfolio)),
            Ok(Err(err)) => errors.push(ExchangeFailure::from_error(exchange, &err)),
            Err(err) => errors.push(ExchangeFailure {
                exchange: exchange.as_str().to_string(),
                error: format!("worker task failed: {err}"),
                code: None,
            }),
        }
    }

    if parts.is_empty() {
        let err = GatewayError::rejected("ALL_EXCHANGES_FAILED", "All exchange calls failed");
        let mut body = ApiResponse::err(&err);
        body.data = serde_json::to_value(&errors)
            .ok()
            .map(|errors| json!({ "errors": errors }));
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let combined = combine(parts, errors, Utc::now().timestamp_millis());
    match serde_json::to_value(combined) {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(
            &GatewayError::malformed(format!("serialize failed: {err}")),
            None,
        ),
    }
}

async fn buy(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OrderBody>,
) -> Response {
    place(state, headers, body, Side::Buy).await
}

async fn sell(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OrderBody>,
) -> Response {
    place(state, headers, body, Side::Sell).await
}

async fn place(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: OrderBody,
    side: Side,
) -> Response {
    // Order-shape validation runs before credentials are even looked at.
    let order = match validate_order(
        body.symbol.as_deref(),
        body.quantity,
        body.price,
        body.order_type.as_deref(),
        side,
    ) {
        Ok(order) => order,
        Err(err) => return respond_err(&err, None),
    };
    let exchange = match parse_exchange(body.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let creds = match single_credentials(&headers, exchange) {
        Ok(creds) => creds,
        Err(err) => return respond_err(&err, Some(exchange)),
    };
    let result =
        run_adapter(move || state.adapters.get(exchange).place_order(&order, &creds)).await;
    match result {
        Ok(data) => respond_created(data, exchange),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CancelBody>,
) -> Response {
    let exchange = match parse_exchange(body.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let creds = match single_credentials(&headers, exchange) {
        Ok(creds) => creds,
        Err(err) => return respond_err(&err, Some(exchange)),
    };
    let result = run_adapter(move || {
        state
            .adapters
            .get(exchange)
            .cancel_order(&order_id, body.symbol.as_deref(), &creds)
    })
    .await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn order_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrdersQuery>,
    headers: HeaderMap,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let creds = match single_credentials(&headers, exchange) {
        Ok(creds) => creds,
        Err(err) => return respond_err(&err, Some(exchange)),
    };
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let result = run_adapter(move || {
        state
            .adapters
            .get(exchange)
            .order_history(query.symbol.as_deref(), limit, &creds)
    })
    .await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn symbols(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeQuery>,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let result = run_adapter(move || state.adapters.get(exchange).symbols()).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn ticker(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<ExchangeQuery>,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let result = run_adapter(move || state.adapters.get(exchange).ticker(&symbol)).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn depth(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let result = run_adapter(move || state.adapters.get(exchange).depth(&symbol, limit)).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn connection(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeQuery>,
) -> Response {
    let exchange = match parse_exchange(query.exchange.as_deref()) {
        Ok(exchange) => exchange,
        Err(err) => return respond_err(&err, None),
    };
    let result = run_adapter(move || state.adapters.get(exchange).test_connection()).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, Some(exchange)),
    }
}

async fn chat(State(state): State<Arc<AppState>>, Json(body): Json<ChatBody>) -> Response {
    let Some(provider) = body.provider.filter(|value| !value.trim().is_empty()) else {
        return respond_err(
            &GatewayError::invalid_request("provider is required"),
            None,
        );
    };
    let Some(message) = body.message.filter(|value| !value.trim().is_empty()) else {
        return respond_err(&GatewayError::invalid_request("message is required"), None);
    };
    let result = run_adapter(move || state.chat.chat(&provider, &message)).await;
    match result {
        Ok(data) => respond_ok(data),
        Err(err) => respond_err(&err, None),
    }
}
