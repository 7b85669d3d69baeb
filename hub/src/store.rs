use crate::types::StockSnapshot;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Number of tickers kept in the headline set
pub const HEADLINE_CAPACITY: usize = 4;

/// Latest snapshot per ticker
///
/// Two views are kept: the full history of every ticker ever seen, and a
/// bounded headline set ordered by first insertion. When a new ticker
/// arrives at capacity the oldest headline is evicted. Updating a ticker
/// already in the headline set replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    headlines: IndexMap<String, StockSnapshot>,
    all: HashMap<String, StockSnapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot; returns the evicted headline, if any
    pub fn upsert(&mut self, snapshot: StockSnapshot) -> Option<StockSnapshot> {
        self.all.insert(snapshot.ticker.clone(), snapshot.clone());

        if let Some(existing) = self.headlines.get_mut(&snapshot.ticker) {
            *existing = snapshot;
            return None;
        }

        let evicted = if self.headlines.len() >= HEADLINE_CAPACITY {
            self.headlines.shift_remove_index(0).map(|(_, s)| s)
        } else {
            None
        };
        self.headlines.insert(snapshot.ticker.clone(), snapshot);
        evicted
    }

    /// Replace the headline set with `snapshots`, keeping history
    pub fn replace_headlines(&mut self, snapshots: Vec<StockSnapshot>) {
        self.headlines.clear();
        for snapshot in snapshots {
            self.upsert(snapshot);
        }
    }

    /// Headline snapshots, oldest first
    pub fn headlines(&self) -> Vec<StockSnapshot> {
        self.headlines.values().cloned().collect()
    }

    /// Latest snapshot for any ticker seen so far
    pub fn get(&self, ticker: &str) -> Option<&StockSnapshot> {
        self.all.get(ticker)
    }

    pub fn tracked(&self) -> usize {
        self.all.len()
    }

    pub fn len(&self) -> usize {
        self.headlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headlines.is_empty()
    }
}
