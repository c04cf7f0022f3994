// src/memstore.rs
use crate::db::Store;
use crate::error::{StoreError, StoreResult};
use crate::models::{Transaction, User, WishlistItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store for tests and `--store memory` runs.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    wishlist: RwLock<Vec<WishlistItem>>,
    transactions: RwLock<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        match self.users.write().await.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("user {}", user.email))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>> {
        let mut items: Vec<WishlistItem> = self
            .wishlist
            .read()
            .await
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(items)
    }

    async fn find_wishlist_item(
        &self,
        user_id: &str,
        symbol: &str,
    ) -> StoreResult<Option<WishlistItem>> {
        Ok(self
            .wishlist
            .read()
            .await
            .iter()
            .find(|i| i.user_id == user_id && i.symbol == symbol)
            .cloned())
    }

    async fn insert_wishlist_item(&self, item: &WishlistItem) -> StoreResult<()> {
        let mut wishlist = self.wishlist.write().await;
        if wishlist
            .iter()
            .any(|i| i.user_id == item.user_id && i.symbol == item.symbol)
        {
            return Err(StoreError::Conflict(format!(
                "{} in wishlist of {}",
                item.symbol, item.user_id
            )));
        }
        wishlist.push(item.clone());
        Ok(())
    }

    async fn delete_wishlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<bool> {
        let mut wishlist = self.wishlist.write().await;
        let before = wishlist.len();
        wishlist.retain(|i| !(i.user_id == user_id && i.symbol == symbol));
        Ok(wishlist.len() < before)
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        self.transactions.write().await.push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(&self, user_id: &str) -> StoreResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(transactions)
    }

    async fn delete_transaction(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let mut transactions = self.transactions.write().await;
        let before = transactions.len();
        transactions.retain(|t| !(t.user_id == user_id && t.id == id));
        Ok(transactions.len() < before)
    }

    async fn count_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.date < cutoff)
            .count() as u64)
    }

    async fn delete_transactions_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut transactions = self.transactions.write().await;
        let before = transactions.len();
        transactions.retain(|t| t.date >= cutoff);
        Ok((before - transactions.len()) as u64)
    }
}
