use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use common::{Balance, Candle, Error, ExchangeGateway, Order, OrderAck, Result};

const BASE_URL: &str = "https://api.binance.com";

/// REST API client for Binance spot. Market data endpoints are public;
/// orders and account queries are HMAC-SHA256 signed.
pub struct BinanceClient {
    api_key: String,
    secret: String,
    base_url: String,
    http: Client,
}

impl BinanceClient {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            secret: secret.into(),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host, e.g. the spot testnet.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn sign(&self, query: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid API secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn public_get(&self, path: &str, params: &str) -> Result<String> {
        let url = format!("{}{path}?{params}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    /// Send a signed request and return the status and raw body without
    /// judging the status, so callers can tell refusals from transport errors.
    async fn signed(&self, method: Method, path: &str, params: &str) -> Result<(u16, String)> {
        let ts = Utc::now().timestamp_millis();
        let query = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = self.sign(&query)?;
        let signed_query = format!("{query}&signature={signature}");

        let request = if method == Method::GET {
            self.http
                .get(format!("{}{path}?{signed_query}", self.base_url))
        } else {
            self.http
                .request(method, format!("{}{path}", self.base_url))
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed_query)
        };

        let resp = request
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl ExchangeGateway for BinanceClient {
    async fn candles(
        &self,
        pair: &str,
        granularity_secs: u64,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let interval = interval_for(granularity_secs)?;
        // Binance caps klines at 1000 per request.
        let limit = count.clamp(1, 1000);
        let params = format!("symbol={pair}&interval={interval}&limit={limit}");
        debug!(pair = %pair, interval, limit, "Fetching klines");
        let body = self.public_get("/api/v3/klines", &params).await?;
        parse_klines(&body)
    }

    async fn current_price(&self, pair: &str) -> Result<f64> {
        let body = self
            .public_get("/api/v3/ticker/price", &format!("symbol={pair}"))
            .await?;
        let ticker: PriceTicker = serde_json::from_str(&body)?;
        ticker
            .price
            .parse::<f64>()
            .map_err(|e| Error::Exchange(e.to_string()))
    }

    async fn submit_order(&self, order: &Order) -> Result<OrderAck> {
        let params = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=GTC&quantity={}&price={}&newClientOrderId={}",
            order.pair, order.side, order.quantity, order.price, order.id
        );

        debug!(pair = %order.pair, side = %order.side, "Submitting order to Binance");
        let (status, body) = self.signed(Method::POST, "/api/v3/order", &params).await?;
        parse_order_response(status, &body)
    }

    async fn balances(&self) -> Result<Vec<Balance>> {
        let (status, body) = self.signed(Method::GET, "/api/v3/account", "").await?;
        if !(200..300).contains(&status) {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        let account: AccountResponse = serde_json::from_str(&body)?;

        account
            .balances
            .into_iter()
            .map(|b| {
                Ok(Balance {
                    free: parse_decimal(&b.free)?,
                    locked: parse_decimal(&b.locked)?,
                    asset: b.asset,
                })
            })
            .filter(|b: &Result<Balance>| b.as_ref().map_or(true, |b| b.total() > 0.0))
            .collect()
    }
}

/// Binance kline interval for a candle width in seconds.
pub fn interval_for(granularity_secs: u64) -> Result<&'static str> {
    Ok(match granularity_secs {
        60 => "1m",
        180 => "3m",
        300 => "5m",
        900 => "15m",
        1800 => "30m",
        3600 => "1h",
        7200 => "2h",
        14400 => "4h",
        21600 => "6h",
        43200 => "12h",
        86400 => "1d",
        other => {
            return Err(Error::Config(format!(
                "No Binance kline interval for {other}s candles"
            )))
        }
    })
}

/// Parse a klines body (oldest first on the wire) into newest-first candles.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    let mut candles = rows
        .iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(Error::Exchange(format!("Malformed kline row: {row:?}")));
            }
            let open_ms = row[0]
                .as_i64()
                .ok_or_else(|| Error::Exchange("Kline open time is not an integer".into()))?;
            let timestamp = Utc
                .timestamp_millis_opt(open_ms)
                .single()
                .ok_or_else(|| Error::Exchange(format!("Kline open time out of range: {open_ms}")))?;
            Ok(Candle {
                timestamp,
                open: value_f64(&row[1])?,
                high: value_f64(&row[2])?,
                low: value_f64(&row[3])?,
                close: value_f64(&row[4])?,
                volume: value_f64(&row[5])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    candles.reverse();
    Ok(candles)
}

/// Map an order endpoint reply to an acknowledgement. Exchange refusals carry
/// `{"code": .., "msg": ..}` and become `Rejected`.
pub fn parse_order_response(status: u16, body: &str) -> Result<OrderAck> {
    if (200..300).contains(&status) {
        let resp: OrderResponse = serde_json::from_str(body)?;
        return Ok(OrderAck::Accepted {
            order_id: resp.client_order_id,
        });
    }
    let reason = serde_json::from_str::<ApiError>(body)
        .map(|e| format!("{} (code {})", e.msg, e.code))
        .unwrap_or_else(|_| format!("HTTP {status}: {body}"));
    Ok(OrderAck::Rejected { reason })
}

fn value_f64(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Exchange(format!("Unrepresentable number {n}"))),
        other => Err(Error::Exchange(format!("Expected a decimal, got {other}"))),
    }
}

fn parse_decimal(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|e| Error::Exchange(format!("Bad decimal '{s}': {e}")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    client_order_id: String,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    balances: Vec<RawBalance>,
}

#[derive(Deserialize)]
struct RawBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}
