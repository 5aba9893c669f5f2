use draftwatch_core::aggregate::DraftedCard;
use draftwatch_core::cards::CardId;
use draftwatch_core::hero::Hero;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ASSET_BASE_URL: &str = "https://s3.amazonaws.com/draftwithme";

/// One aggregated pick rendered as image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedDisplay {
    pub mana: String,
    pub card: String,
    pub multiplicity: String,
    pub full: String,
}

/// Maps cards, heroes and counters to image URLs so the front end never
/// has to know where assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrls {
    base: String,
}

impl Default for AssetUrls {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_BASE_URL)
    }
}

impl AssetUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn full_card(&self, card: Option<&CardId>) -> String {
        match card {
            Some(card) => format!("{}/full_cards/{}.png", self.base, card),
            None => format!("{}/full_cards/blank_card.png", self.base),
        }
    }

    pub fn hero(&self, hero: Hero) -> String {
        format!("{}/heroes/{}.png", self.base, hero)
    }

    pub fn card_bar(&self, card: &CardId) -> String {
        format!("{}/bar_cards/{}.png", self.base, card)
    }

    /// Only costs with a dedicated glyph get one; the rest share a blank.
    pub fn mana(&self, mana: u8) -> String {
        match mana {
            0..=10 | 12 | 25 => format!("{}/mana/{}.png", self.base, mana),
            _ => format!("{}/mana/blank_mana.png", self.base),
        }
    }

    pub fn multiplicity(&self, multiplicity: usize) -> String {
        match multiplicity {
            0..=5 => format!("{}/multiplicity/{}.png", self.base, multiplicity),
            _ => format!("{}/multiplicity/blank_mult.png", self.base),
        }
    }

    pub fn current_cards(&self, cards: &[Option<CardId>]) -> Vec<String> {
        cards.iter().map(|card| self.full_card(card.as_ref())).collect()
    }

    pub fn drafted(&self, entry: &DraftedCard) -> DraftedDisplay {
        DraftedDisplay {
            mana: self.mana(entry.mana),
            card: self.card_bar(&entry.card),
            multiplicity: self.multiplicity(entry.multiplicity),
            full: self.full_card(Some(&entry.card)),
        }
    }

    pub fn drafted_list(&self, entries: &[DraftedCard]) -> Vec<DraftedDisplay> {
        entries.iter().map(|entry| self.drafted(entry)).collect()
    }
}
