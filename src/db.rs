// src/db.rs
use crate::error::{StoreError, StoreResult};
use crate::models::{Side, Transaction, User, WishlistItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use scylla::frame::response::result::{CqlValue, Row};
use scylla::{query::Query, Session, SessionBuilder};
use std::fmt::Display;

/// Persistence for users, wishlist entries and transactions.
///
/// `create_user` and `insert_wishlist_item` never overwrite: a second write
/// for the same email, or the same user and symbol, fails with
/// [`StoreError::Conflict`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Newest entries first.
    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>>;
    async fn find_wishlist_item(
        &self,
        user_id: &str,
        symbol: &str,
    ) -> StoreResult<Option<WishlistItem>>;
    async fn insert_wishlist_item(&self, item: &WishlistItem) -> StoreResult<()>;
    /// Returns whether an entry was removed.
    async fn delete_wishlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<bool>;

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;
    /// Oldest first.
    async fn list_transactions(&self, user_id: &str) -> StoreResult<Vec<Transaction>>;
    async fn delete_transaction(&self, user_id: &str, id: &str) -> StoreResult<bool>;
    async fn count_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
    async fn delete_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

fn query_err(e: impl Display) -> StoreError {
    StoreError::Query(e.to_string())
}

pub struct ScyllaStore {
    session: Session,
}

impl ScyllaStore {
    pub async fn connect(node: &str) -> StoreResult<Self> {
        let session = SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        session.query("CREATE KEYSPACE IF NOT EXISTS portfolio_tracker WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await.map_err(query_err)?;
        session.query("CREATE TABLE IF NOT EXISTS portfolio_tracker.users (email TEXT PRIMARY KEY, id TEXT, name TEXT, password_hash TEXT, created_at TIMESTAMP)", &[]).await.map_err(query_err)?;
        session.query("CREATE TABLE IF NOT EXISTS portfolio_tracker.users_by_id (id TEXT PRIMARY KEY, email TEXT)", &[]).await.map_err(query_err)?;
        session.query("CREATE TABLE IF NOT EXISTS portfolio_tracker.wishlist (user_id TEXT, symbol TEXT, id TEXT, notes TEXT, target_price DOUBLE, added_at TIMESTAMP, PRIMARY KEY (user_id, symbol))", &[]).await.map_err(query_err)?;
        session.query("CREATE TABLE IF NOT EXISTS portfolio_tracker.transactions (user_id TEXT, id TEXT, symbol TEXT, quantity DOUBLE, price DOUBLE, side TEXT, date TIMESTAMP, PRIMARY KEY (user_id, id))", &[]).await.map_err(query_err)?;

        info!("Successfully connected to ScyllaDB at {}.", node);
        Ok(ScyllaStore { session })
    }

    async fn rows(&self, query: Query, values: impl scylla::frame::value::ValueList) -> StoreResult<Vec<Row>> {
        let result = self.session.query(query, values).await.map_err(query_err)?;
        Ok(result.rows.unwrap_or_default())
    }
}

fn column<'a>(row: &'a Row, idx: usize) -> Option<&'a CqlValue> {
    row.columns.get(idx).and_then(|c| c.as_ref())
}

/// Outcome of a lightweight transaction (`IF NOT EXISTS`).
fn applied(rows: &[Row]) -> bool {
    matches!(
        rows.first().and_then(|row| column(row, 0)),
        Some(CqlValue::Boolean(true))
    )
}

fn text(row: &Row, idx: usize) -> StoreResult<String> {
    column(row, idx)
        .and_then(|v| v.as_text())
        .cloned()
        .ok_or_else(|| StoreError::Decode(format!("column {} is not text", idx)))
}

fn double(row: &Row, idx: usize) -> StoreResult<f64> {
    column(row, idx)
        .and_then(|v| v.as_double())
        .ok_or_else(|| StoreError::Decode(format!("column {} is not a double", idx)))
}

fn timestamp(row: &Row, idx: usize) -> StoreResult<DateTime<Utc>> {
    match column(row, idx) {
        Some(CqlValue::Timestamp(ts)) => DateTime::<Utc>::from_timestamp_millis(ts.num_milliseconds())
            .ok_or_else(|| StoreError::Decode(format!("column {} is out of range", idx))),
        _ => Err(StoreError::Decode(format!("column {} is not a timestamp", idx))),
    }
}

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at";
const WISHLIST_COLUMNS: &str = "id, user_id, symbol, notes, target_price, added_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, symbol, quantity, price, side, date";

fn user_from_row(row: &Row) -> StoreResult<User> {
    Ok(User {
        id: text(row, 0)?,
        email: text(row, 1)?,
        name: text(row, 2)?,
        password_hash: text(row, 3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn wishlist_from_row(row: &Row) -> StoreResult<WishlistItem> {
    Ok(WishlistItem {
        id: text(row, 0)?,
        user_id: text(row, 1)?,
        symbol: text(row, 2)?,
        notes: text(row, 3).unwrap_or_default(),
        target_price: column(row, 4).and_then(|v| v.as_double()),
        added_at: timestamp(row, 5)?,
    })
}

fn transaction_from_row(row: &Row) -> StoreResult<Transaction> {
    let side: Side = text(row, 5)?.parse().map_err(StoreError::Decode)?;
    Ok(Transaction {
        id: text(row, 0)?,
        user_id: text(row, 1)?,
        symbol: text(row, 2)?,
        quantity: double(row, 3)?,
        price: double(row, 4)?,
        side,
        date: timestamp(row, 6)?,
    })
}

/// Decodes every row, logging and skipping the ones that do not parse.
fn decode_rows<T>(rows: Vec<Row>, decode: impl Fn(&Row) -> StoreResult<T>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Skipping row: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl Store for ScyllaStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let query = Query::new("INSERT INTO portfolio_tracker.users (email, id, name, password_hash, created_at) VALUES (?, ?, ?, ?, ?) IF NOT EXISTS");
        let rows = self
            .rows(
                query,
                (
                    user.email.as_str(),
                    user.id.as_str(),
                    user.name.as_str(),
                    user.password_hash.as_str(),
                    user.created_at.timestamp_millis(),
                ),
            )
            .await?;
        if !applied(&rows) {
            return Err(StoreError::Conflict(format!("user {}", user.email)));
        }

        let query =
            Query::new("INSERT INTO portfolio_tracker.users_by_id (id, email) VALUES (?, ?)");
        self.session
            .query(query, (user.id.as_str(), user.email.as_str()))
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = Query::new(format!(
            "SELECT {} FROM portfolio_tracker.users WHERE email = ?",
            USER_COLUMNS
        ));
        let rows = self.rows(query, (email,)).await?;
        rows.first().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let query = Query::new("SELECT email FROM portfolio_tracker.users_by_id WHERE id = ?");
        let rows = self.rows(query, (id,)).await?;
        match rows.first() {
            Some(row) => self.find_user_by_email(&text(row, 0)?).await,
            None => Ok(None),
        }
    }

    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>> {
        let query = Query::new(format!(
            "SELECT {} FROM portfolio_tracker.wishlist WHERE user_id = ?",
            WISHLIST_COLUMNS
        ));
        let rows = self.rows(query, (user_id,)).await?;
        let mut items = decode_rows(rows, wishlist_from_row);
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(items)
    }

    async fn find_wishlist_item(
        &self,
        user_id: &str,
        symbol: &str,
    ) -> StoreResult<Option<WishlistItem>> {
        let query = Query::new(format!(
            "SELECT {} FROM portfolio_tracker.wishlist WHERE user_id = ? AND symbol = ?",
            WISHLIST_COLUMNS
        ));
        let rows = self.rows(query, (user_id, symbol)).await?;
        rows.first().map(wishlist_from_row).transpose()
    }

    async fn insert_wishlist_item(&self, item: &WishlistItem) -> StoreResult<()> {
        let query = Query::new("INSERT INTO portfolio_tracker.wishlist (user_id, symbol, id, notes, target_price, added_at) VALUES (?, ?, ?, ?, ?, ?) IF NOT EXISTS");
        let rows = self
            .rows(
                query,
                (
                    item.user_id.as_str(),
                    item.symbol.as_str(),
                    item.id.as_str(),
                    item.notes.as_str(),
                    item.target_price,
                    item.added_at.timestamp_millis(),
                ),
            )
            .await?;
        if !applied(&rows) {
            return Err(StoreError::Conflict(format!(
                "{} in wishlist of {}",
                item.symbol, item.user_id
            )));
        }
        Ok(())
    }

    async fn delete_wishlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<bool> {
        if self.find_wishlist_item(user_id, symbol).await?.is_none() {
            return Ok(false);
        }
        let query =
            Query::new("DELETE FROM portfolio_tracker.wishlist WHERE user_id = ? AND symbol = ?");
        self.session
            .query(query, (user_id, symbol))
            .await
            .map_err(query_err)?;
        Ok(true)
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let query = Query::new("INSERT INTO portfolio_tracker.transactions (user_id, id, symbol, quantity, price, side, date) VALUES (?, ?, ?, ?, ?, ?, ?)");
        self.session
            .query(
                query,
                (
                    transaction.user_id.as_str(),
                    transaction.id.as_str(),
                    transaction.symbol.as_str(),
                    transaction.quantity,
                    transaction.price,
                    transaction.side.as_str(),
                    transaction.date.timestamp_millis(),
                ),
            )
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn list_transactions(&self, user_id: &str) -> StoreResult<Vec<Transaction>> {
        let query = Query::new(format!(
            "SELECT {} FROM portfolio_tracker.transactions WHERE user_id = ?",
            TRANSACTION_COLUMNS
        ));
        let rows = self.rows(query, (user_id,)).await?;
        let mut transactions = decode_rows(rows, transaction_from_row);
        transactions.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(transactions)
    }

    async fn delete_transaction(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let query = Query::new(
            "SELECT id FROM portfolio_tracker.transactions WHERE user_id = ? AND id = ?",
        );
        if self.rows(query, (user_id, id)).await?.is_empty() {
            return Ok(false);
        }
        let query =
            Query::new("DELETE FROM portfolio_tracker.transactions WHERE user_id = ? AND id = ?");
        self.session
            .query(query, (user_id, id))
            .await
            .map_err(query_err)?;
        Ok(true)
    }

    async fn count_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let query = Query::new(
            "SELECT COUNT(*) FROM portfolio_tracker.transactions WHERE date < ? ALLOW FILTERING",
        );
        let rows = self.rows(query, (cutoff.timestamp_millis(),)).await?;
        let count = rows
            .first()
            .and_then(|row| column(row, 0))
            .and_then(|v| v.as_bigint())
            .ok_or_else(|| StoreError::Decode("COUNT(*) returned no bigint".into()))?;
        Ok(count.max(0) as u64)
    }

    async fn delete_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        // Rows are keyed by (user_id, id), so the range has to be resolved to keys first.
        let query = Query::new(
            "SELECT user_id, id FROM portfolio_tracker.transactions WHERE date < ? ALLOW FILTERING",
        );
        let rows = self.rows(query, (cutoff.timestamp_millis(),)).await?;
        let delete =
            Query::new("DELETE FROM portfolio_tracker.transactions WHERE user_id = ? AND id = ?");
        let mut deleted = 0;
        for row in &rows {
            let (user_id, id) = (text(row, 0)?, text(row, 1)?);
            self.session
                .query(delete.clone(), (user_id.as_str(), id.as_str()))
                .await
                .map_err(query_err)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}
