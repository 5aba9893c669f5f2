//! # draftwatch-core: Draft Domain Model
//!
//! Pure building blocks for broadcasting an in-progress card draft:
//! card identifiers and the static catalog, the hero enumeration, token
//! sanitation, and the aggregation that turns a pick list into its
//! display order.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card identifiers and the read-only card catalog
//! - [`hero`] - Hero enumeration and parsing
//! - [`aggregate`] - Mana-bucketed, name-sorted pick list with multiplicities
//! - [`auth`] - Token sanitation and secret/identifier generation
//! - [`errors`] - Error types for catalog and parsing failures
//!
//! ## Quick Start
//!
//! ```rust
//! use draftwatch_core::aggregate::aggregate;
//! use draftwatch_core::cards::{CardCatalog, CardId, CardInfo};
//!
//! let catalog = CardCatalog::from_entries([
//!     ("A1", CardInfo { mana: 2, name: "Zap".into() }),
//!     ("B2", CardInfo { mana: 1, name: "Arc".into() }),
//! ])
//! .unwrap();
//!
//! let picks = vec![CardId::new("A1"), CardId::new("A1"), CardId::new("B2")];
//! let sorted = aggregate(&catalog, &picks).unwrap();
//!
//! assert_eq!(sorted[0].card.as_str(), "B2");
//! assert_eq!(sorted[1].multiplicity, 2);
//! ```

pub mod aggregate;
pub mod auth;
pub mod cards;
pub mod errors;
pub mod hero;

/// Number of picks that completes a draft.
pub const DRAFT_SIZE: usize = 30;

/// Number of cards offered to the drafter at once.
pub const OFFERED_SLOTS: usize = 3;

pub use aggregate::{aggregate, mana_curve, DraftedCard};
pub use cards::{CardCatalog, CardId, CardInfo};
pub use errors::{CatalogError, ParseHeroError};
pub use hero::Hero;
