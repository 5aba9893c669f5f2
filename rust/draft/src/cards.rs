use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Highest mana cost any catalog card may carry. Display buckets run `0..=MAX_MANA_COST`.
pub const MAX_MANA_COST: u8 = 25;

/// A card identifier in its canonical (upper-case) form.
///
/// Identifiers arrive from the drafting client in whatever case it sends;
/// they are normalized once on the way in so that storage, catalog lookups
/// and asset URLs all agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(raw: &str) -> Self {
        CardId::new(raw)
    }
}

/// Normalizes one "currently offered" slot. Blank strings mean an empty slot.
pub fn normalize_slot(raw: Option<&str>) -> Option<CardId> {
    match raw {
        Some(value) if !value.trim().is_empty() => Some(CardId::new(value)),
        _ => None,
    }
}

/// Catalog metadata for a single card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    pub mana: u8,
    pub name: String,
}

/// Raw catalog entry as shipped in the collectible card data file.
#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    id: String,
    #[serde(default)]
    cost: Option<u8>,
    #[serde(default)]
    name: Option<String>,
}

/// Read-only lookup from card identifier to mana cost and display name.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: HashMap<CardId, CardInfo>,
}

impl CardCatalog {
    /// Builds a catalog from already-validated entries.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, CardInfo)>,
        S: AsRef<str>,
    {
        let mut cards = HashMap::new();
        for (id, info) in entries {
            let id = CardId::new(id);
            if info.mana > MAX_MANA_COST {
                return Err(CatalogError::ManaOutOfRange {
                    card: id,
                    mana: info.mana,
                });
            }
            cards.insert(id, info);
        }
        Ok(Self { cards })
    }

    /// Parses the JSON card array. Cards without a cost are not draftable and are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
        let usable = entries.into_iter().filter_map(|entry| {
            let mana = entry.cost?;
            let name = entry.name.unwrap_or_default();
            Some((entry.id, CardInfo { mana, name }))
        });
        Self::from_entries(usable)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn get(&self, id: &CardId) -> Option<&CardInfo> {
        self.cards.get(id)
    }

    /// Like [`CardCatalog::get`] but treats a miss as an error.
    pub fn lookup(&self, id: &CardId) -> Result<&CardInfo, CatalogError> {
        self.get(id).ok_or_else(|| CatalogError::MissingCard(id.clone()))
    }

    pub fn mana_for(&self, id: &CardId) -> Result<u8, CatalogError> {
        self.lookup(id).map(|info| info.mana)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
