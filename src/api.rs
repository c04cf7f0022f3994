// src/api.rs
use crate::auth::{with_auth, AuthConfig};
use crate::cleanup;
use crate::db::Store;
use crate::error::{bad_request, handle_rejection, internal, not_found, ApiError, StoreError};
use crate::logos::{logo_chain, LogoSource};
use crate::market::{stock_details, MarketData, MarketError, StockDetails, StockPrice};
use crate::models::{
    normalize_symbol, AddWishlistRequest, ApiResponse, AuthPayload, NewTransactionRequest,
    PublicUser, Side, SignInRequest, SignUpRequest, Transaction, User, WishlistItem,
};
use crate::portfolio::{
    build_positions, held_units, sort_stocks, summarize, EnhancedStock, PortfolioSummary, Position,
    SortDirection, SortField,
};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MIN_PASSWORD_LEN: usize = 6;

/// Everything a handler may need, shared across requests.
pub struct Context {
    pub store: Arc<dyn Store>,
    pub market: Arc<dyn MarketData>,
    pub auth: Arc<AuthConfig>,
    pub cron_secret: Option<String>,
    pub retention_days: u32,
    /// Held while a sell is checked against holdings and recorded.
    pub sell_guard: Mutex<()>,
}

pub fn routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
    let health = warp::path!("health").and(warp::get()).map(|| "ok");

    let api = auth_routes(ctx.clone())
        .or(wishlist_routes(ctx.clone()))
        .or(transaction_routes(ctx.clone()))
        .or(portfolio_routes(ctx.clone()))
        .or(market_routes(ctx.clone()))
        .or(cleanup_routes(ctx));

    health
        .or(warp::path("api").and(api))
        .recover(handle_rejection)
        .with(warp::log("portfolio_tracker"))
}

fn with_ctx(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (Arc<Context>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn authenticated(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (String, Arc<Context>), Error = Rejection> + Clone {
    with_auth(ctx.auth.clone()).and(with_ctx(ctx))
}

fn json_reply<T: Serialize>(body: &ApiResponse<T>, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn auth_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(signup_handler);

    let signin = warp::path!("auth" / "signin")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(signin_handler);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(authenticated(ctx))
        .and_then(me_handler);

    signup.or(signin).unify().or(me).unify()
}

fn auth_payload(ctx: &Context, user: &User) -> Result<AuthPayload, Rejection> {
    let token = ctx
        .auth
        .create_token(user)
        .map_err(|e| internal("Failed to issue token", e))?;
    Ok(AuthPayload {
        token,
        user: PublicUser::from(user),
    })
}

async fn signup_handler(
    body: SignUpRequest,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let (email, password, name) = match (
        required(body.email),
        body.password.filter(|p| !p.is_empty()),
        required(body.name),
    ) {
        (Some(email), Some(password), Some(name)) => (email.to_lowercase(), password, name),
        _ => return Err(bad_request("Email, password and name are required")),
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let existing = ctx
        .store
        .find_user_by_email(&email)
        .await
        .map_err(|e| internal("Failed to create account", e))?;
    if existing.is_some() {
        return Err(bad_request("Email already registered"));
    }

    let password_hash = ctx
        .auth
        .hash_password(&password)
        .map_err(|e| internal("Failed to create account", e))?;
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name,
        password_hash,
        created_at: Utc::now(),
    };
    ctx.store.create_user(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => bad_request("Email already registered"),
        e => internal("Failed to create account", e),
    })?;
    info!("Registered user {}.", user.id);

    let payload = auth_payload(&ctx, &user)?;
    Ok(json_reply(&ApiResponse::ok(payload), StatusCode::CREATED))
}

async fn signin_handler(
    body: SignInRequest,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let (email, password) = match (required(body.email), body.password) {
        (Some(email), Some(password)) => (email.to_lowercase(), password),
        _ => return Err(bad_request("Email and password are required")),
    };
    let invalid = || {
        warp::reject::custom(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ))
    };

    let user = ctx
        .store
        .find_user_by_email(&email)
        .await
        .map_err(|e| internal("Failed to sign in", e))?
        .ok_or_else(invalid)?;
    let valid = ctx
        .auth
        .verify_password(&password, &user.password_hash)
        .map_err(|e| internal("Failed to sign in", e))?;
    if !valid {
        return Err(invalid());
    }

    info!("User {} signed in.", user.id);
    let payload = auth_payload(&ctx, &user)?;
    Ok(json_reply(&ApiResponse::ok(payload), StatusCode::OK))
}

async fn me_handler(
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let user = ctx
        .store
        .find_user_by_id(&user_id)
        .await
        .map_err(|e| internal("Failed to fetch user", e))?
        .ok_or_else(|| not_found("User not found"))?;
    Ok(json_reply(
        &ApiResponse::ok(PublicUser::from(&user)),
        StatusCode::OK,
    ))
}

fn wishlist_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let list = warp::path!("wishlist")
        .and(warp::get())
        .and(authenticated(ctx.clone()))
        .and_then(list_wishlist_handler);

    let add = warp::path!("wishlist")
        .and(warp::post())
        .and(authenticated(ctx.clone()))
        .and(warp::body::json())
        .and_then(add_wishlist_handler);

    let remove = warp::path!("wishlist" / String)
        .and(warp::delete())
        .and(authenticated(ctx))
        .and_then(remove_wishlist_handler);

    list.or(add).unify().or(remove).unify()
}

async fn list_wishlist_handler(
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let items = ctx
        .store
        .list_wishlist(&user_id)
        .await
        .map_err(|e| internal("Failed to fetch wishlist", e))?;
    Ok(json_reply(&ApiResponse::ok(items), StatusCode::OK))
}

async fn add_wishlist_handler(
    user_id: String,
    ctx: Arc<Context>,
    body: AddWishlistRequest,
) -> Result<warp::reply::Response, Rejection> {
    let symbol = required(body.symbol)
        .map(|s| normalize_symbol(&s))
        .ok_or_else(|| bad_request("Symbol is required"))?;

    let existing = ctx
        .store
        .find_wishlist_item(&user_id, &symbol)
        .await
        .map_err(|e| internal("Failed to add to wishlist", e))?;
    if existing.is_some() {
        return Err(bad_request("Stock already in wishlist"));
    }

    let item = WishlistItem {
        id: Uuid::new_v4().to_string(),
        user_id,
        symbol,
        notes: body.notes.unwrap_or_default(),
        target_price: body.target_price.filter(|p| *p > 0.0),
        added_at: Utc::now(),
    };
    ctx.store
        .insert_wishlist_item(&item)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => bad_request("Stock already in wishlist"),
            e => internal("Failed to add to wishlist", e),
        })?;

    info!("{} added to wishlist of {}.", item.symbol, item.user_id);
    let message = format!("{} added to wishlist", item.symbol);
    Ok(json_reply(
        &ApiResponse::ok(item).with_message(message),
        StatusCode::CREATED,
    ))
}

async fn remove_wishlist_handler(
    symbol: String,
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let symbol = normalize_symbol(&symbol);
    let removed = ctx
        .store
        .delete_wishlist_item(&user_id, &symbol)
        .await
        .map_err(|e| internal("Failed to remove from wishlist", e))?;
    if !removed {
        return Err(not_found("Stock not found in wishlist"));
    }
    info!("{} removed from wishlist of {}.", symbol, user_id);
    Ok(json_reply(
        &ApiResponse::message(format!("{} removed from wishlist", symbol)),
        StatusCode::OK,
    ))
}

#[derive(Debug, Default, Deserialize)]
struct TransactionFilter {
    symbol: Option<String>,
}

fn transaction_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let list = warp::path!("transactions")
        .and(warp::get())
        .and(warp::query::<TransactionFilter>())
        .and(authenticated(ctx.clone()))
        .and_then(list_transactions_handler);

    let add = warp::path!("transactions")
        .and(warp::post())
        .and(authenticated(ctx.clone()))
        .and(warp::body::json())
        .and_then(add_transaction_handler);

    let remove = warp::path!("transactions" / String)
        .and(warp::delete())
        .and(authenticated(ctx))
        .and_then(remove_transaction_handler);

    list.or(add).unify().or(remove).unify()
}

async fn list_transactions_handler(
    filter: TransactionFilter,
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let mut transactions = ctx
        .store
        .list_transactions(&user_id)
        .await
        .map_err(|e| internal("Failed to fetch transactions", e))?;
    if let Some(symbol) = required(filter.symbol).map(|s| normalize_symbol(&s)) {
        transactions.retain(|t| t.symbol == symbol);
    }
    Ok(json_reply(&ApiResponse::ok(transactions), StatusCode::OK))
}

/// Checks a new transaction request and turns it into a record owned by `user_id`.
fn validate_transaction(
    user_id: &str,
    body: NewTransactionRequest,
) -> Result<Transaction, ApiError> {
    let symbol = required(body.symbol)
        .map(|s| normalize_symbol(&s))
        .ok_or_else(|| ApiError::BadRequest("Symbol is required".into()))?;
    let quantity = body
        .quantity
        .filter(|q| q.is_finite() && *q > 0.0)
        .ok_or_else(|| ApiError::BadRequest("Quantity must be greater than zero".into()))?;
    let price = body
        .price
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| ApiError::BadRequest("Price must be zero or more".into()))?;
    let side = body
        .side
        .ok_or_else(|| ApiError::BadRequest("Transaction type is required".into()))?
        .parse::<Side>()
        .map_err(|_| ApiError::BadRequest("Transaction type must be buy or sell".into()))?;

    Ok(Transaction {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        symbol,
        quantity,
        price,
        side,
        date: body.date.unwrap_or_else(Utc::now),
    })
}

async fn add_transaction_handler(
    user_id: String,
    ctx: Arc<Context>,
    body: NewTransactionRequest,
) -> Result<warp::reply::Response, Rejection> {
    let transaction = validate_transaction(&user_id, body).map_err(warp::reject::custom)?;

    let _guard = match transaction.side {
        Side::Sell => Some(ctx.sell_guard.lock().await),
        Side::Buy => None,
    };
    if transaction.side == Side::Sell {
        let history = ctx
            .store
            .list_transactions(&user_id)
            .await
            .map_err(|e| internal("Failed to record transaction", e))?;
        if held_units(&history, &transaction.symbol) + 1e-9 < transaction.quantity {
            return Err(bad_request("Insufficient units to sell"));
        }
    }

    ctx.store
        .insert_transaction(&transaction)
        .await
        .map_err(|e| internal("Failed to record transaction", e))?;
    info!(
        "Recorded {} of {} {} for {}.",
        transaction.side, transaction.quantity, transaction.symbol, user_id
    );
    Ok(json_reply(
        &ApiResponse::ok(transaction),
        StatusCode::CREATED,
    ))
}

async fn remove_transaction_handler(
    id: String,
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let removed = ctx
        .store
        .delete_transaction(&user_id, &id)
        .await
        .map_err(|e| internal("Failed to delete transaction", e))?;
    if !removed {
        return Err(not_found("Transaction not found"));
    }
    Ok(json_reply(
        &ApiResponse::message("Transaction deleted"),
        StatusCode::OK,
    ))
}

#[derive(Debug, Default, Deserialize)]
struct PortfolioQuery {
    #[serde(default)]
    sort: SortField,
    #[serde(default)]
    order: SortDirection,
}

#[derive(Debug, Serialize)]
struct PortfolioView {
    stocks: Vec<EnhancedStock>,
    summary: PortfolioSummary,
}

fn portfolio_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("portfolio" / "stocks")
        .and(warp::get())
        .and(warp::query::<PortfolioQuery>())
        .and(authenticated(ctx))
        .and_then(portfolio_handler)
}

async fn portfolio_handler(
    query: PortfolioQuery,
    user_id: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let transactions = ctx
        .store
        .list_transactions(&user_id)
        .await
        .map_err(|e| internal("Failed to fetch portfolio", e))?;

    let positions = build_positions(&transactions);
    let quotes = current_prices(ctx.market.as_ref(), &positions).await;
    let mut stocks: Vec<EnhancedStock> = positions
        .iter()
        .zip(quotes)
        .map(|(position, price)| {
            // without a live quote the position is marked at cost
            position.value_at(price.unwrap_or_else(|| position.avg_price()))
        })
        .collect();
    sort_stocks(&mut stocks, query.sort, query.order);
    let summary = summarize(&stocks);

    Ok(json_reply(
        &ApiResponse::ok(PortfolioView { stocks, summary }),
        StatusCode::OK,
    ))
}

async fn current_prices(market: &dyn MarketData, positions: &[Position]) -> Vec<Option<f64>> {
    let mut prices = Vec::with_capacity(positions.len());
    for position in positions {
        let price = match market.quote(&position.symbol).await {
            Ok(quote) => quote.current_price(),
            Err(e) => {
                warn!("No quote for {}: {}", position.symbol, e);
                None
            }
        };
        prices.push(price);
    }
    prices
}

#[derive(Debug, Default, Deserialize)]
struct StockPriceQuery {
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NewsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StockDetailsView {
    #[serde(flatten)]
    details: StockDetails,
    logos: Vec<LogoSource>,
}

#[derive(Debug, Serialize)]
struct LogoView {
    symbol: String,
    sources: Vec<LogoSource>,
}

fn market_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let news = warp::path!("market-news")
        .and(warp::get())
        .and(warp::query::<NewsQuery>())
        .and(with_ctx(ctx.clone()))
        .and_then(market_news_handler);

    let price = warp::path!("stock-price")
        .and(warp::get())
        .and(warp::query::<StockPriceQuery>())
        .and(with_ctx(ctx.clone()))
        .and_then(stock_price_handler);

    let details = warp::path!("stocks" / String)
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(stock_details_handler);

    let logo = warp::path!("logo" / String)
        .and(warp::get())
        .and(with_ctx(ctx))
        .and_then(logo_handler);

    news.or(price)
        .unify()
        .or(details)
        .unify()
        .or(logo)
        .unify()
}

fn market_failure(public: &str, e: MarketError) -> Rejection {
    match e {
        MarketError::MissingApiKey => internal("API key not configured", e),
        other => internal(public, other),
    }
}

async fn market_news_handler(
    query: NewsQuery,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let mut news = ctx
        .market
        .market_news()
        .await
        .map_err(|e| market_failure("Failed to fetch market news", e))?;
    if let Some(limit) = query.limit {
        news.truncate(limit);
    }
    Ok(json_reply(&ApiResponse::ok(news), StatusCode::OK))
}

async fn stock_price_handler(
    query: StockPriceQuery,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let symbol = required(query.symbol)
        .map(|s| normalize_symbol(&s))
        .ok_or_else(|| bad_request("Symbol is required"))?;
    let quote = ctx
        .market
        .quote(&symbol)
        .await
        .map_err(|e| market_failure("Failed to fetch stock price", e))?;
    let price = StockPrice::from_quote(&symbol, &quote, Utc::now());
    Ok(json_reply(&ApiResponse::ok(price), StatusCode::OK))
}

async fn stock_details_handler(
    symbol: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let symbol = normalize_symbol(&symbol);
    let details = stock_details(ctx.market.as_ref(), &symbol).await;
    let profile_logo = details.profile.as_ref().map(|p| p.logo.as_str());
    let logos = logo_chain(&symbol, profile_logo);
    Ok(json_reply(
        &ApiResponse::ok(StockDetailsView { details, logos }),
        StatusCode::OK,
    ))
}

async fn logo_handler(
    symbol: String,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    let symbol = normalize_symbol(&symbol);
    let profile_logo = match ctx.market.company_profile(&symbol).await {
        Ok(profile) => Some(profile.logo),
        Err(e) => {
            warn!("No profile logo for {}: {}", symbol, e);
            None
        }
    };
    let sources = logo_chain(&symbol, profile_logo.as_deref());
    Ok(json_reply(
        &ApiResponse::ok(LogoView { symbol, sources }),
        StatusCode::OK,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResponse<T: Serialize> {
    success: bool,
    message: String,
    #[serde(flatten)]
    report: T,
}

fn cleanup_routes(
    ctx: Arc<Context>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let preview = warp::path!("cron" / "cleanup-transactions")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(cleanup_preview_handler);

    let run = warp::path!("cron" / "cleanup-transactions")
        .and(warp::delete())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_ctx(ctx))
        .and_then(cleanup_run_handler);

    preview.or(run).unify()
}

async fn cleanup_preview_handler(ctx: Arc<Context>) -> Result<warp::reply::Response, Rejection> {
    let preview = cleanup::preview(ctx.store.as_ref(), ctx.retention_days)
        .await
        .map_err(|e| internal("Failed to preview cleanup", e))?;
    let body = CleanupResponse {
        success: true,
        message: format!("{} transactions would be deleted", preview.count),
        report: preview,
    };
    Ok(warp::reply::json(&body).into_response())
}

async fn cleanup_run_handler(
    authorization: Option<String>,
    ctx: Arc<Context>,
) -> Result<warp::reply::Response, Rejection> {
    if let Some(secret) = ctx.cron_secret.as_deref() {
        let expected = format!("Bearer {}", secret);
        if authorization.as_deref() != Some(expected.as_str()) {
            return Err(warp::reject::custom(ApiError::unauthorized()));
        }
    }

    let report = cleanup::run(ctx.store.as_ref(), ctx.retention_days)
        .await
        .map_err(|e| internal("Failed to cleanup transactions", e))?;
    let body = CleanupResponse {
        success: true,
        message: format!("Deleted {} transactions", report.deleted_count),
        report,
    };
    Ok(warp::reply::json(&body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{CompanyProfile, NewsArticle, Quote, RecommendationTrend};
    use crate::memstore::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct StubMarket {
        configured: bool,
        news_down: bool,
        prices: HashMap<String, f64>,
    }

    impl StubMarket {
        fn with_prices(prices: &[(&str, f64)]) -> Self {
            StubMarket {
                configured: true,
                news_down: false,
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            }
        }

        fn unconfigured() -> Self {
            StubMarket {
                configured: false,
                ..StubMarket::with_prices(&[])
            }
        }

        fn check(&self) -> Result<(), MarketError> {
            if self.configured {
                Ok(())
            } else {
                Err(MarketError::MissingApiKey)
            }
        }
    }

    #[async_trait]
    impl MarketData for StubMarket {
        async fn quote(&self, symbol: &str) -> Result<Quote, MarketError> {
            self.check()?;
            let price = self
                .prices
                .get(symbol)
                .ok_or(MarketError::Status(StatusCode::BAD_GATEWAY))?;
            Ok(Quote {
                c: Some(*price),
                d: Some(1.0),
                pc: Some(*price - 1.0),
                ..Quote::default()
            })
        }

        async fn market_news(&self) -> Result<Vec<NewsArticle>, MarketError> {
            self.check()?;
            if self.news_down {
                return Err(MarketError::Status(StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok((0..10)
                .map(|i| NewsArticle {
                    id: i,
                    headline: format!("headline {}", i),
                    ..NewsArticle::default()
                })
                .collect())
        }

        async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
            self.check()?;
            if symbol == "AAPL" {
                Ok(CompanyProfile {
                    name: "Apple Inc".into(),
                    logo: "https://cdn.example/aapl.png".into(),
                    ..CompanyProfile::default()
                })
            } else {
                Err(MarketError::Status(StatusCode::NOT_FOUND))
            }
        }

        async fn metrics(&self, _symbol: &str) -> Result<Value, MarketError> {
            Err(MarketError::Status(StatusCode::TOO_MANY_REQUESTS))
        }

        async fn recommendations(
            &self,
            _symbol: &str,
        ) -> Result<Vec<RecommendationTrend>, MarketError> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn news_sentiment(&self, _symbol: &str) -> Result<Value, MarketError> {
            Err(MarketError::Status(StatusCode::FORBIDDEN))
        }
    }

    fn context(market: StubMarket, cron_secret: Option<&str>) -> Arc<Context> {
        Arc::new(Context {
            store: Arc::new(MemoryStore::new()),
            market: Arc::new(market),
            auth: Arc::new(AuthConfig::new("test-secret", 1, 4)),
            cron_secret: cron_secret.map(str::to_string),
            retention_days: 30,
            sell_guard: Mutex::new(()),
        })
    }

    /// Registers a user straight in the store and returns a bearer header for them.
    async fn login(ctx: &Context, email: &str) -> String {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: "Test".into(),
            password_hash: ctx.auth.hash_password("password1").unwrap(),
            created_at: Utc::now(),
        };
        ctx.store.create_user(&user).await.unwrap();
        format!("Bearer {}", ctx.auth.create_token(&user).unwrap())
    }

    fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn signup_signin_and_me() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let api = routes(ctx);

        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/signup")
            .json(&json!({"email": " Jane@Example.com ", "password": "secret1", "name": "Jane"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let signed_up = body(&res);
        assert_eq!(signed_up["data"]["user"]["email"], "jane@example.com");
        assert!(signed_up["data"]["user"].get("passwordHash").is_none());

        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/signin")
            .json(&json!({"email": "jane@example.com", "password": "secret1"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let token = body(&res)["data"]["token"].as_str().unwrap().to_string();

        let res = warp::test::request()
            .path("/api/auth/me")
            .header("authorization", format!("Bearer {}", token))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["data"]["name"], "Jane");
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_short_passwords() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let api = routes(ctx);
        let signup = |password: &str| {
            warp::test::request()
                .method("POST")
                .path("/api/auth/signup")
                .json(&json!({"email": "a@b.co", "password": password, "name": "A"}))
        };

        assert_eq!(signup("123").reply(&api).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(signup("123456").reply(&api).await.status(), StatusCode::CREATED);

        let res = signup("123456").reply(&api).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Email already registered");
    }

    #[tokio::test]
    async fn signin_with_wrong_password_is_unauthorized() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        login(&ctx, "jo@example.com").await;
        let api = routes(ctx);

        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/signin")
            .json(&json!({"email": "jo@example.com", "password": "nope-nope"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body(&res),
            json!({"success": false, "error": "Invalid email or password"})
        );
    }

    #[tokio::test]
    async fn wishlist_requires_a_token() {
        let api = routes(context(StubMarket::with_prices(&[]), None));
        let res = warp::test::request().path("/api/wishlist").reply(&api).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&res)["error"], "Unauthorized");

        let res = warp::test::request()
            .path("/api/wishlist")
            .header("authorization", "Bearer not-a-jwt")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wishlist_add_list_and_duplicate() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "w@example.com").await;
        let api = routes(ctx);

        let res = warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .json(&json!({"symbol": "aapl", "notes": "watch earnings", "targetPrice": 150.0}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let added = body(&res);
        assert_eq!(added["message"], "AAPL added to wishlist");
        assert_eq!(added["data"]["targetPrice"], 150.0);

        let res = warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .json(&json!({"symbol": " AAPL "}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Stock already in wishlist");

        let res = warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .json(&json!({"notes": "no symbol", "targetPrice": 0}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Symbol is required");

        let res = warp::test::request()
            .path("/api/wishlist")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        let listed = body(&res);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
        assert_eq!(listed["data"][0]["notes"], "watch earnings");
    }

    #[tokio::test]
    async fn wishlist_delete_missing_is_not_found() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "d@example.com").await;
        let api = routes(ctx);

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/wishlist/MSFT")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"], "Stock not found in wishlist");

        warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .json(&json!({"symbol": "MSFT"}))
            .reply(&api)
            .await;

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/wishlist/msft")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["message"], "MSFT removed from wishlist");
    }

    #[tokio::test]
    async fn wishlists_are_private_to_their_owner() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let alice = login(&ctx, "alice@example.com").await;
        let bob = login(&ctx, "bob@example.com").await;
        let api = routes(ctx);

        warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &alice)
            .json(&json!({"symbol": "NVDA"}))
            .reply(&api)
            .await;

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/wishlist/NVDA")
            .header("authorization", &bob)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn transactions_validate_and_block_oversell() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "t@example.com").await;
        let api = routes(ctx);
        let post = |payload: Value| {
            warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&payload)
        };

        let res = post(json!({"symbol": "AAPL", "quantity": 0, "price": 10, "type": "buy"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = post(json!({"symbol": "AAPL", "quantity": 1, "price": 10, "type": "hold"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = post(json!({"symbol": "aapl", "quantity": 5, "price": 10, "type": "buy"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(body(&res)["data"]["symbol"], "AAPL");

        let res = post(json!({"symbol": "AAPL", "quantity": 6, "price": 12, "type": "sell"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Insufficient units to sell");

        let res = post(json!({"symbol": "AAPL", "quantity": 5, "price": 12, "type": "sell"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn transaction_delete_and_filter() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "f@example.com").await;
        let api = routes(ctx);

        let mut ids = Vec::new();
        for symbol in ["AAPL", "MSFT"] {
            let res = warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&json!({"symbol": symbol, "quantity": 1, "price": 1, "type": "buy"}))
                .reply(&api)
                .await;
            ids.push(body(&res)["data"]["id"].as_str().unwrap().to_string());
        }

        let res = warp::test::request()
            .path("/api/transactions?symbol=msft")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        let listed = body(&res);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
        assert_eq!(listed["data"][0]["symbol"], "MSFT");

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/transactions/{}", ids[0]))
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/transactions/{}", ids[0]))
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn portfolio_values_positions_at_quotes() {
        let ctx = context(StubMarket::with_prices(&[("AAPL", 120.0)]), None);
        let auth = login(&ctx, "p@example.com").await;
        let api = routes(ctx);

        for (symbol, quantity, price, side) in [
            ("AAPL", 10, 100, "buy"),
            ("AAPL", 5, 110, "sell"),
            ("ZZZZ", 2, 50, "buy"),
        ] {
            let res = warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&json!({"symbol": symbol, "quantity": quantity, "price": price, "type": side}))
                .reply(&api)
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = warp::test::request()
            .path("/api/portfolio/stocks?sort=symbol&order=desc")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let view = body(&res)["data"].clone();

        let stocks = view["stocks"].as_array().unwrap();
        assert_eq!(stocks[0]["symbol"], "ZZZZ");
        // no quote for ZZZZ: marked at cost
        assert_eq!(stocks[0]["currentPrice"], 50.0);
        assert_eq!(stocks[0]["unrealizedPnl"], 0.0);

        let aapl = &stocks[1];
        assert_eq!(aapl["units"], 5.0);
        assert_eq!(aapl["avgPrice"], 100.0);
        assert_eq!(aapl["realizedPnl"], 50.0);
        assert_eq!(aapl["unrealizedPnl"], 100.0);
        assert_eq!(aapl["netPnl"], 150.0);

        let summary = &view["summary"];
        assert_eq!(summary["totalInvested"], 600.0);
        assert_eq!(summary["currentValue"], 700.0);
        assert_eq!(summary["netPnl"], 150.0);
        assert_eq!(summary["topGainer"]["symbol"], "AAPL");
        assert_eq!(summary["topLoser"]["symbol"], "ZZZZ");
    }

    #[tokio::test]
    async fn stock_price_requires_symbol_and_key() {
        let api = routes(context(StubMarket::with_prices(&[("AAPL", 187.5)]), None));

        let res = warp::test::request().path("/api/stock-price").reply(&api).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Symbol is required");

        let res = warp::test::request()
            .path("/api/stock-price?symbol=aapl")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let price = body(&res)["data"].clone();
        assert_eq!(price["symbol"], "AAPL");
        assert_eq!(price["price"], 187.5);
        assert_eq!(price["previousClose"], 186.5);
        assert!(price["marketStatus"].is_string());

        let res = warp::test::request()
            .path("/api/stock-price?symbol=XXXX")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["error"], "Failed to fetch stock price");

        let api = routes(context(StubMarket::unconfigured(), None));
        let res = warp::test::request()
            .path("/api/stock-price?symbol=AAPL")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["error"], "API key not configured");
    }

    #[tokio::test]
    async fn market_news_honors_limit() {
        let api = routes(context(StubMarket::with_prices(&[]), None));
        let res = warp::test::request()
            .path("/api/market-news?limit=6")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["data"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn stock_details_degrade_per_section() {
        let api = routes(context(StubMarket::with_prices(&[("AAPL", 10.0)]), None));
        let res = warp::test::request().path("/api/stocks/aapl").reply(&api).await;
        assert_eq!(res.status(), StatusCode::OK);
        let details = body(&res)["data"].clone();
        assert_eq!(details["symbol"], "AAPL");
        assert_eq!(details["profile"]["name"], "Apple Inc");
        assert_eq!(details["quote"]["c"], 10.0);
        assert!(details["metrics"].is_null());
        assert!(details["sentiment"].is_null());
        assert_eq!(details["logos"][0]["kind"], "profile");
    }

    #[tokio::test]
    async fn logo_chain_without_profile_starts_at_primary() {
        let api = routes(context(StubMarket::with_prices(&[]), None));
        let res = warp::test::request().path("/api/logo/msft").reply(&api).await;
        let sources = body(&res)["data"]["sources"].clone();
        assert_eq!(sources.as_array().unwrap().len(), 3);
        assert_eq!(sources[0]["kind"], "primary");
        assert_eq!(sources[2]["kind"], "placeholder");
    }

    #[tokio::test]
    async fn cleanup_preview_and_protected_delete() {
        let ctx = context(StubMarket::with_prices(&[]), Some("cron-s3cret"));
        let old = Transaction {
            id: "old".into(),
            user_id: "u1".into(),
            symbol: "AAPL".into(),
            quantity: 1.0,
            price: 1.0,
            side: Side::Buy,
            date: Utc::now() - Duration::days(45),
        };
        ctx.store.insert_transaction(&old).await.unwrap();
        let api = routes(ctx);

        let res = warp::test::request()
            .path("/api/cron/cleanup-transactions")
            .reply(&api)
            .await;
        let preview = body(&res);
        assert_eq!(preview["count"], 1);
        assert_eq!(preview["message"], "1 transactions would be deleted");
        assert!(preview["cutoffDate"].is_string());

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/cron/cleanup-transactions")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/cron/cleanup-transactions")
            .header("authorization", "Bearer cron-s3cret")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let report = body(&res);
        assert_eq!(report["deletedCount"], 1);
        assert_eq!(report["message"], "Deleted 1 transactions");
    }

    #[tokio::test]
    async fn unknown_routes_and_bad_bodies() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "b@example.com").await;
        let api = routes(ctx);

        let res = warp::test::request().path("/api/nope").reply(&api).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["success"], false);

        let res = warp::test::request()
            .method("POST")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Invalid request body");

        let res = warp::test::request().path("/health").reply(&api).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    fn user_record(email: &str) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: "Ghost".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "m@example.com").await;
        let api = routes(ctx);

        let res = warp::test::request()
            .method("PUT")
            .path("/api/wishlist")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body(&res),
            json!({"success": false, "error": "Method not allowed"})
        );
    }

    #[tokio::test]
    async fn me_for_unknown_user_is_not_found() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let token = ctx.auth.create_token(&user_record("gone@example.com")).unwrap();
        let api = routes(ctx);

        let res = warp::test::request()
            .path("/api/auth/me")
            .header("authorization", format!("Bearer {}", token))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"], "User not found");
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let user = user_record("late@example.com");
        ctx.store.create_user(&user).await.unwrap();
        let token = AuthConfig::new("test-secret", -2, 4)
            .create_token(&user)
            .unwrap();
        let api = routes(ctx);

        let res = warp::test::request()
            .path("/api/auth/me")
            .header("authorization", format!("Bearer {}", token))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&res)["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn signup_with_missing_field_is_bad_request() {
        let api = routes(context(StubMarket::with_prices(&[]), None));
        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/signup")
            .json(&json!({"email": "x@example.com", "password": "secret1"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Email, password and name are required");
    }

    #[tokio::test]
    async fn concurrent_signups_register_one_account() {
        let api = routes(context(StubMarket::with_prices(&[]), None));
        let signup = |name: &str| {
            warp::test::request()
                .method("POST")
                .path("/api/auth/signup")
                .json(&json!({"email": "race@example.com", "password": "secret1", "name": name}))
        };

        let (a, b) = tokio::join!(
            signup("First").reply(&api),
            signup("Second").reply(&api)
        );
        let mut statuses = vec![a.status(), b.status()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

        let loser = if a.status() == StatusCode::BAD_REQUEST { &a } else { &b };
        assert_eq!(body(loser)["error"], "Email already registered");
    }

    #[tokio::test]
    async fn concurrent_wishlist_adds_keep_one_entry() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "cw@example.com").await;
        let api = routes(ctx);
        let add = || {
            warp::test::request()
                .method("POST")
                .path("/api/wishlist")
                .header("authorization", &auth)
                .json(&json!({"symbol": "AMD"}))
        };

        let (a, b) = tokio::join!(add().reply(&api), add().reply(&api));
        let mut statuses = vec![a.status(), b.status()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    }

    #[tokio::test]
    async fn concurrent_sells_cannot_exceed_holdings() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "cs@example.com").await;
        let api = routes(ctx);
        let post = |side: &str| {
            warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&json!({"symbol": "AAPL", "quantity": 5, "price": 10, "type": side}))
        };

        assert_eq!(post("buy").reply(&api).await.status(), StatusCode::CREATED);
        let (a, b) = tokio::join!(post("sell").reply(&api), post("sell").reply(&api));
        let mut statuses = vec![a.status(), b.status()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    }

    #[tokio::test]
    async fn market_news_failures_are_server_errors() {
        let api = routes(context(StubMarket::unconfigured(), None));
        let res = warp::test::request().path("/api/market-news").reply(&api).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["error"], "API key not configured");

        let down = StubMarket {
            news_down: true,
            ..StubMarket::with_prices(&[])
        };
        let api = routes(context(down, None));
        let res = warp::test::request().path("/api/market-news").reply(&api).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["error"], "Failed to fetch market news");
    }

    #[tokio::test]
    async fn transactions_list_without_query_returns_everything() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "all@example.com").await;
        let api = routes(ctx);

        for symbol in ["AAPL", "MSFT", "AAPL"] {
            warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&json!({"symbol": symbol, "quantity": 1, "price": 2, "type": "buy"}))
                .reply(&api)
                .await;
        }

        let res = warp::test::request()
            .path("/api/transactions")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn portfolio_sorts_by_date_and_rejects_unknown_fields() {
        let ctx = context(StubMarket::with_prices(&[]), None);
        let auth = login(&ctx, "sd@example.com").await;
        let api = routes(ctx);

        for (symbol, days_ago) in [("AAPL", 1), ("ZZZZ", 10), ("MSFT", 5)] {
            let date = Utc::now() - Duration::days(days_ago);
            let res = warp::test::request()
                .method("POST")
                .path("/api/transactions")
                .header("authorization", &auth)
                .json(&json!({"symbol": symbol, "quantity": 1, "price": 2, "type": "buy", "date": date}))
                .reply(&api)
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = warp::test::request()
            .path("/api/portfolio/stocks?sort=date")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        let stocks = body(&res)["data"]["stocks"].clone();
        let order: Vec<&str> = stocks
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["symbol"].as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["ZZZZ", "MSFT", "AAPL"]);
        assert!(stocks[0]["openedAt"].is_string());

        let res = warp::test::request()
            .path("/api/portfolio/stocks?sort=price")
            .header("authorization", &auth)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
