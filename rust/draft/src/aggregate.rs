//! Turns the drafter's pick list into the grouped, sorted form viewers see.
//!
//! Distinct cards are bucketed by mana cost (`0..=25`), each bucket is
//! ordered by card name ignoring case, and buckets are concatenated from
//! cheapest to most expensive. Every distinct identifier appears exactly
//! once, annotated with how many copies were drafted.

use crate::cards::{CardCatalog, CardId, MAX_MANA_COST};
use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the aggregated pick list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedCard {
    pub card: CardId,
    pub mana: u8,
    pub multiplicity: usize,
}

/// Groups and sorts `drafted` for display.
///
/// Fails with [`CatalogError::MissingCard`] on the first identifier the
/// catalog does not know.
pub fn aggregate(
    catalog: &CardCatalog,
    drafted: &[CardId],
) -> Result<Vec<DraftedCard>, CatalogError> {
    let mut multiplicity: HashMap<&CardId, usize> = HashMap::new();
    let mut distinct: Vec<&CardId> = Vec::new();
    for card in drafted {
        let count = multiplicity.entry(card).or_insert(0);
        if *count == 0 {
            distinct.push(card);
        }
        *count += 1;
    }

    let mut buckets: Vec<Vec<(String, DraftedCard)>> =
        (0..=MAX_MANA_COST).map(|_| Vec::new()).collect();

    for card in distinct {
        let info = catalog.lookup(card)?;
        // The catalog refuses costs above the maximum at load time.
        let bucket = usize::from(info.mana.min(MAX_MANA_COST));
        buckets[bucket].push((
            info.name.to_lowercase(),
            DraftedCard {
                card: card.clone(),
                mana: info.mana,
                multiplicity: multiplicity[card],
            },
        ));
    }

    let mut sorted = Vec::new();
    for mut bucket in buckets {
        bucket.sort_by(|(a_name, a), (b_name, b)| {
            a_name.cmp(b_name).then_with(|| a.card.cmp(&b.card))
        });
        sorted.extend(bucket.into_iter().map(|(_, entry)| entry));
    }
    Ok(sorted)
}

/// Mana cost of every drafted card in submission order, used for the mana curve chart.
pub fn mana_curve(catalog: &CardCatalog, drafted: &[CardId]) -> Result<Vec<u8>, CatalogError> {
    drafted.iter().map(|card| catalog.mana_for(card)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardInfo;

    fn info(mana: u8, name: &str) -> CardInfo {
        CardInfo {
            mana,
            name: name.to_string(),
        }
    }

    fn catalog() -> CardCatalog {
        CardCatalog::from_entries([
            ("A1", info(2, "Zap")),
            ("B2", info(1, "Arc")),
            ("C3", info(2, "bolt")),
            ("D4", info(2, "Ambush")),
            ("E5", info(0, "Wisp")),
            ("F6", info(25, "Molten")),
        ])
        .expect("catalog")
    }

    fn ids(raw: &[&str]) -> Vec<CardId> {
        raw.iter().map(|id| CardId::new(id)).collect()
    }

    #[test]
    fn groups_duplicates_and_orders_by_mana() {
        let result = aggregate(&catalog(), &ids(&["A1", "A1", "B2"])).expect("aggregate");

        assert_eq!(
            result,
            vec![
                DraftedCard {
                    card: CardId::new("B2"),
                    mana: 1,
                    multiplicity: 1
                },
                DraftedCard {
                    card: CardId::new("A1"),
                    mana: 2,
                    multiplicity: 2
                },
            ]
        );
    }

    #[test]
    fn names_within_a_bucket_sort_case_insensitively() {
        let result = aggregate(&catalog(), &ids(&["A1", "C3", "D4"])).expect("aggregate");
        let order: Vec<&str> = result.iter().map(|c| c.card.as_str()).collect();

        // Ambush, bolt, Zap
        assert_eq!(order, vec!["D4", "C3", "A1"]);
    }

    #[test]
    fn covers_both_ends_of_the_mana_range() {
        let result = aggregate(&catalog(), &ids(&["F6", "E5"])).expect("aggregate");
        let manas: Vec<u8> = result.iter().map(|c| c.mana).collect();
        assert_eq!(manas, vec![0, 25]);
    }

    #[test]
    fn multiplicities_sum_to_input_length() {
        let input = ids(&["A1", "B2", "A1", "C3", "E5", "E5", "E5", "D4", "F6", "B2"]);
        let result = aggregate(&catalog(), &input).expect("aggregate");

        let total: usize = result.iter().map(|c| c.multiplicity).sum();
        assert_eq!(total, input.len());
        assert_eq!(result.len(), 6);
        assert!(result.windows(2).all(|w| w[0].mana <= w[1].mana));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(aggregate(&catalog(), &[]).expect("aggregate").is_empty());
    }

    #[test]
    fn unknown_card_is_an_error() {
        let err = aggregate(&catalog(), &ids(&["A1", "ZZ9"])).unwrap_err();
        assert!(matches!(err, CatalogError::MissingCard(id) if id.as_str() == "ZZ9"));
    }

    #[test]
    fn mana_curve_keeps_submission_order() {
        let curve = mana_curve(&catalog(), &ids(&["A1", "B2", "A1"])).expect("curve");
        assert_eq!(curve, vec![2, 1, 2]);
    }
}
