use std::collections::HashMap;
use std::collections::BTreeMap;

use crate::models::Entity;

pub const DEFAULT_CATEGORY: &str = "Top 50 Coins";

lazy_static! {
    /// Categories for well-known coins, keyed by upstream id.
    static ref KNOWN_CATEGORIES_BY_ID: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("bitcoin"     , "Store of Value");
        m.insert("ethereum"    , "Smart Contract Platform");
        m.insert("solana"      , "Smart Contract Platform");
        m.insert("cardano"     , "Smart Contract Platform");
        m.insert("tron"        , "Smart Contract Platform");
        m.insert("tether"      , "Stablecoin");
        m.insert("usd-coin"    , "Stablecoin");
        m.insert("binancecoin" , "Exchange Token");
        m.insert("dogecoin"    , "Meme Coin");
        m.insert("ripple"      , "Payment Coin");
        m
    };
}

pub fn known_category(entity_id: &str) -> Option<&'static str> {
    KNOWN_CATEGORIES_BY_ID.get(entity_id).copied()
}

/// Coin to category lookup. Misses resolve to the fallback category, never to an error.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryTable {
    entries: BTreeMap<String, String>,
    fallback: String,
}

impl Default for CategoryTable {
    fn default() -> Self {
        CategoryTable::new()
    }
}

impl CategoryTable {
    pub fn new() -> CategoryTable {
        CategoryTable {
            entries: BTreeMap::new(),
            fallback: DEFAULT_CATEGORY.to_owned(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> CategoryTable {
        self.fallback = fallback.into();
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> CategoryTable
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = CategoryTable::new();
        for (coin, category) in pairs {
            table.insert(coin, category);
        }
        table
    }

    /// Table of the given entities that have a known default category, keyed by display name.
    pub fn from_known_defaults<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> CategoryTable {
        CategoryTable::from_pairs(
            entities.into_iter()
                .filter_map(|e| known_category(e.id()).map(|c| (e.name().to_owned(), c))))
    }

    /// Blank coins or categories are ignored; a later insert for the same coin wins.
    pub fn insert(&mut self, coin: impl Into<String>, category: impl Into<String>) {
        let coin = coin.into();
        let category = category.into();
        if coin.trim().is_empty() || category.trim().is_empty() {
            return;
        }
        self.entries.insert(coin, category);
    }

    pub fn category_of(&self, coin: &str) -> &str {
        self.entries.get(coin)
            .map(|s| s.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str { &self.fallback }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entries sorted by coin.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
