// src/market.rs
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc, Weekday};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

const QUOTE_TTL: Duration = Duration::from_secs(30);
const NEWS_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("API key not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(StatusCode),
}

/// Raw Finnhub `/quote` payload. Missing fields mean "no data".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quote {
    /// Current price
    pub c: Option<f64>,
    /// Change
    pub d: Option<f64>,
    /// Percent change
    pub dp: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub o: Option<f64>,
    /// Previous close
    pub pc: Option<f64>,
    pub t: Option<i64>,
}

impl Quote {
    /// Finnhub answers unknown symbols with an all-zero quote.
    pub fn current_price(&self) -> Option<f64> {
        self.c.filter(|c| *c > 0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub datetime: i64,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub related: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub ipo: String,
    #[serde(default)]
    pub market_capitalization: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub share_outstanding: f64,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub weburl: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub finnhub_industry: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationTrend {
    pub period: String,
    #[serde(default)]
    pub strong_buy: u32,
    #[serde(default)]
    pub buy: u32,
    #[serde(default)]
    pub hold: u32,
    #[serde(default)]
    pub sell: u32,
    #[serde(default)]
    pub strong_sell: u32,
}

/// Quote and news provider.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketError>;
    async fn market_news(&self) -> Result<Vec<NewsArticle>, MarketError>;
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketError>;
    async fn metrics(&self, symbol: &str) -> Result<serde_json::Value, MarketError>;
    async fn recommendations(&self, symbol: &str)
        -> Result<Vec<RecommendationTrend>, MarketError>;
    async fn news_sentiment(&self, symbol: &str) -> Result<serde_json::Value, MarketError>;
}

/// Keyed responses that expire after a fixed time-to-live.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.0.elapsed() < self.ttl)
            .map(|entry| entry.1.clone())
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        self.entries
            .insert(key.to_string(), (Instant::now(), value));
    }
}

pub struct FinnhubClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    quotes: TtlCache<Quote>,
    news: TtlCache<Vec<NewsArticle>>,
}

impl FinnhubClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        FinnhubClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            quotes: TtlCache::new(QUOTE_TTL),
            news: TtlCache::new(NEWS_TTL),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MarketError> {
        let api_key = self.api_key.as_deref().ok_or(MarketError::MissingApiKey)?;
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("token", api_key)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarketError::Status(response.status()));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MarketData for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketError> {
        if let Some(quote) = self.quotes.get(symbol) {
            return Ok(quote);
        }
        let quote: Quote = self.get("/quote", &[("symbol", symbol)]).await?;
        self.quotes.insert(symbol, quote.clone());
        Ok(quote)
    }

    async fn market_news(&self) -> Result<Vec<NewsArticle>, MarketError> {
        if let Some(news) = self.news.get("general") {
            return Ok(news);
        }
        let news: Vec<NewsArticle> = self.get("/news", &[("category", "general")]).await?;
        self.news.insert("general", news.clone());
        Ok(news)
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
        self.get("/stock/profile2", &[("symbol", symbol)]).await
    }

    async fn metrics(&self, symbol: &str) -> Result<serde_json::Value, MarketError> {
        self.get("/stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await
    }

    async fn recommendations(
        &self,
        symbol: &str,
    ) -> Result<Vec<RecommendationTrend>, MarketError> {
        self.get("/stock/recommendation", &[("symbol", symbol)]).await
    }

    async fn news_sentiment(&self, symbol: &str) -> Result<serde_json::Value, MarketError> {
        self.get("/news-sentiment", &[("symbol", symbol)]).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketStatus {
    PreMarket,
    Regular,
    AfterHours,
    Closed,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        *self == MarketStatus::Regular
    }
}

/// US equity session at `now`, on a fixed UTC-5 clock.
pub fn market_status(now: DateTime<Utc>) -> MarketStatus {
    let eastern = now.naive_utc() - ChronoDuration::hours(5);
    if matches!(eastern.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketStatus::Closed;
    }
    let minute_of_day = eastern.hour() * 60 + eastern.minute();
    match minute_of_day {
        240..=569 => MarketStatus::PreMarket,
        570..=959 => MarketStatus::Regular,
        960..=1199 => MarketStatus::AfterHours,
        _ => MarketStatus::Closed,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPrice {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub is_market_open: bool,
    pub market_status: MarketStatus,
    pub timestamp: i64,
}

impl StockPrice {
    pub fn from_quote(symbol: &str, quote: &Quote, now: DateTime<Utc>) -> Self {
        let status = market_status(now);
        StockPrice {
            symbol: symbol.to_string(),
            price: quote.c.unwrap_or(0.0),
            change: quote.d.unwrap_or(0.0),
            change_percent: quote.dp.unwrap_or(0.0),
            high: quote.h.unwrap_or(0.0),
            low: quote.l.unwrap_or(0.0),
            open: quote.o.unwrap_or(0.0),
            previous_close: quote.pc.unwrap_or(0.0),
            is_market_open: status.is_open(),
            market_status: status,
            timestamp: quote.t.filter(|t| *t > 0).unwrap_or_else(|| now.timestamp()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockDetails {
    pub symbol: String,
    pub profile: Option<CompanyProfile>,
    pub quote: Option<Quote>,
    pub metrics: Option<serde_json::Value>,
    pub recommendations: Option<Vec<RecommendationTrend>>,
    pub sentiment: Option<serde_json::Value>,
}

fn settled<T>(part: &str, symbol: &str, result: Result<T, MarketError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to fetch {} for {}: {}", part, symbol, e);
            None
        }
    }
}

/// Fetches every detail section concurrently; a failed section comes back empty.
pub async fn stock_details(market: &dyn MarketData, symbol: &str) -> StockDetails {
    let (profile, quote, metrics, recommendations, sentiment) = tokio::join!(
        market.company_profile(symbol),
        market.quote(symbol),
        market.metrics(symbol),
        market.recommendations(symbol),
        market.news_sentiment(symbol),
    );
    StockDetails {
        symbol: symbol.to_string(),
        profile: settled("profile", symbol, profile),
        quote: settled("quote", symbol, quote),
        metrics: settled("metrics", symbol, metrics),
        recommendations: settled("recommendations", symbol, recommendations),
        sentiment: settled("sentiment", symbol, sentiment),
    }
}
