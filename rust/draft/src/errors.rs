use crate::cards::CardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Card not found in catalog: {0}")]
    MissingCard(CardId),
    #[error("Card {card} has mana cost {mana}, above the supported maximum")]
    ManaOutOfRange { card: CardId, mana: u8 },
    #[error("Failed to read card catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed card catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized hero: {0}")]
pub struct ParseHeroError(pub String);
