// src/portfolio.rs
//! Profit and loss aggregation over a user's buy/sell history.
//!
//! Positions use the average-cost method: a buy adds to the cost basis, a sell
//! removes `quantity * average cost` from it and books the difference to the
//! sale price as realized P/L.

use crate::models::{Side, Transaction};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-9;

fn percent(part: f64, whole: f64) -> f64 {
    if whole.abs() < EPSILON {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Holdings of a single symbol after replaying its transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub units: f64,
    /// Cost basis of the units still held.
    pub total_cost: f64,
    /// Gross amount ever spent buying this symbol.
    pub invested: f64,
    pub realized_pnl: f64,
    /// Date of the earliest transaction in the symbol's history.
    pub opened_at: Option<DateTime<Utc>>,
}

impl Position {
    fn new(symbol: &str) -> Self {
        Position {
            symbol: symbol.to_string(),
            units: 0.0,
            total_cost: 0.0,
            invested: 0.0,
            realized_pnl: 0.0,
            opened_at: None,
        }
    }

    pub fn avg_price(&self) -> f64 {
        if self.units < EPSILON {
            0.0
        } else {
            self.total_cost / self.units
        }
    }

    fn apply(&mut self, transaction: &Transaction) {
        self.opened_at.get_or_insert(transaction.date);
        match transaction.side {
            Side::Buy => {
                let cost = transaction.quantity * transaction.price;
                self.units += transaction.quantity;
                self.total_cost += cost;
                self.invested += cost;
            }
            Side::Sell => {
                let mut quantity = transaction.quantity;
                if quantity > self.units + EPSILON {
                    warn!(
                        "Sell of {} {} exceeds held {} units, clamping",
                        quantity, self.symbol, self.units
                    );
                    quantity = self.units;
                }
                let avg = self.avg_price();
                self.realized_pnl += quantity * (transaction.price - avg);
                self.total_cost -= quantity * avg;
                self.units -= quantity;
                if self.units < EPSILON {
                    self.units = 0.0;
                    self.total_cost = 0.0;
                }
            }
        }
    }

    /// Values the position at `current_price`.
    pub fn value_at(&self, current_price: f64) -> EnhancedStock {
        let current_value = self.units * current_price;
        let unrealized_pnl = current_value - self.total_cost;
        let net_pnl = self.realized_pnl + unrealized_pnl;
        EnhancedStock {
            symbol: self.symbol.clone(),
            units: self.units,
            avg_price: self.avg_price(),
            current_price,
            total_cost: self.total_cost,
            current_value,
            unrealized_pnl,
            unrealized_pnl_percent: percent(unrealized_pnl, self.total_cost),
            realized_pnl: self.realized_pnl,
            net_pnl,
            net_pnl_percent: percent(net_pnl, self.invested),
            opened_at: self.opened_at,
            invested: self.invested,
        }
    }
}

/// Replays `transactions` per symbol in date order. Output is sorted by symbol.
pub fn build_positions(transactions: &[Transaction]) -> Vec<Position> {
    let mut by_symbol: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for transaction in transactions {
        by_symbol
            .entry(transaction.symbol.as_str())
            .or_default()
            .push(transaction);
    }

    by_symbol
        .into_iter()
        .map(|(symbol, mut history)| {
            // stable: same-instant transactions keep their input order
            history.sort_by(|a, b| a.date.cmp(&b.date));
            let mut position = Position::new(symbol);
            for transaction in history {
                position.apply(transaction);
            }
            position
        })
        .collect()
}

/// Units currently held of `symbol`.
pub fn held_units(transactions: &[Transaction], symbol: &str) -> f64 {
    build_positions(transactions)
        .into_iter()
        .find(|p| p.symbol == symbol)
        .map(|p| p.units)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedStock {
    pub symbol: String,
    pub units: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub total_cost: f64,
    pub current_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
    pub realized_pnl: f64,
    pub net_pnl: f64,
    pub net_pnl_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    invested: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mover {
    pub symbol: String,
    pub net_pnl: f64,
    pub net_pnl_percent: f64,
}

impl From<&EnhancedStock> for Mover {
    fn from(stock: &EnhancedStock) -> Self {
        Mover {
            symbol: stock.symbol.clone(),
            net_pnl: stock.net_pnl,
            net_pnl_percent: stock.net_pnl_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_invested: f64,
    pub current_value: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub net_pnl: f64,
    pub net_pnl_percent: f64,
    pub top_gainer: Option<Mover>,
    pub top_loser: Option<Mover>,
}

pub fn summarize(stocks: &[EnhancedStock]) -> PortfolioSummary {
    let total_invested: f64 = stocks.iter().map(|s| s.total_cost).sum();
    let current_value: f64 = stocks.iter().map(|s| s.current_value).sum();
    let unrealized_pnl: f64 = stocks.iter().map(|s| s.unrealized_pnl).sum();
    let realized_pnl: f64 = stocks.iter().map(|s| s.realized_pnl).sum();
    let gross_invested: f64 = stocks.iter().map(|s| s.invested).sum();
    let net_pnl = realized_pnl + unrealized_pnl;

    // ties go to the first stock seen
    let top_gainer = stocks
        .iter()
        .reduce(|best, s| if s.net_pnl_percent > best.net_pnl_percent { s } else { best })
        .map(Mover::from);
    let top_loser = stocks
        .iter()
        .reduce(|worst, s| if s.net_pnl_percent < worst.net_pnl_percent { s } else { worst })
        .map(Mover::from);

    PortfolioSummary {
        total_invested,
        current_value,
        unrealized_pnl,
        realized_pnl,
        net_pnl,
        net_pnl_percent: percent(net_pnl, gross_invested),
        top_gainer,
        top_loser,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Symbol,
    /// Oldest position first, ties broken by symbol.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

pub fn sort_stocks(stocks: &mut [EnhancedStock], field: SortField, direction: SortDirection) {
    match field {
        SortField::Symbol => stocks.sort_by(|a, b| a.symbol.cmp(&b.symbol)),
        SortField::Date => stocks.sort_by(|a, b| {
            a.opened_at
                .cmp(&b.opened_at)
                .then_with(|| a.symbol.cmp(&b.symbol))
        }),
    }
    if direction == SortDirection::Desc {
        stocks.reverse();
    }
}
