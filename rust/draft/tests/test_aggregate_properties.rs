use std::collections::HashSet;

use draftwatch_core::aggregate::aggregate;
use draftwatch_core::cards::{CardCatalog, CardId, CardInfo, MAX_MANA_COST};
use draftwatch_core::DRAFT_SIZE;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NAMES: [&str; 8] = [
    "Arcane Missiles",
    "abomination",
    "Zombie Chow",
    "boulderfist Ogre",
    "Chillwind Yeti",
    "yeti",
    "Mirror Image",
    "mana wyrm",
];

fn random_catalog(rng: &mut ChaCha8Rng, size: usize) -> (CardCatalog, Vec<CardId>) {
    let mut entries = Vec::with_capacity(size);
    for i in 0..size {
        let mana = rng.random_range(0..=MAX_MANA_COST);
        let name = NAMES.choose(rng).copied().unwrap_or("Wisp");
        entries.push((
            format!("card_{i}"),
            CardInfo {
                mana,
                name: format!("{name} {}", i % 3),
            },
        ));
    }
    let ids = entries.iter().map(|(id, _)| CardId::new(id)).collect();
    let catalog = CardCatalog::from_entries(entries).expect("catalog");
    (catalog, ids)
}

#[test]
fn aggregation_invariants_hold_for_random_pick_lists() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xD4AF7);

    for round in 0..200 {
        let (catalog, ids) = random_catalog(&mut rng, 40);
        let len = rng.random_range(0..=DRAFT_SIZE);
        let picks: Vec<CardId> = (0..len)
            .map(|_| ids.choose(&mut rng).cloned().expect("non-empty ids"))
            .collect();

        let sorted = aggregate(&catalog, &picks).expect("aggregate");

        let total: usize = sorted.iter().map(|c| c.multiplicity).sum();
        assert_eq!(total, picks.len(), "round {round}: multiplicity sum");

        let distinct_in: HashSet<&CardId> = picks.iter().collect();
        let distinct_out: HashSet<&CardId> = sorted.iter().map(|c| &c.card).collect();
        assert_eq!(distinct_in, distinct_out, "round {round}: distinct cards");
        assert_eq!(sorted.len(), distinct_out.len(), "round {round}: no repeats");

        for pair in sorted.windows(2) {
            assert!(pair[0].mana <= pair[1].mana, "round {round}: mana order");
            if pair[0].mana == pair[1].mana {
                let a = catalog.lookup(&pair[0].card).expect("a").name.to_lowercase();
                let b = catalog.lookup(&pair[1].card).expect("b").name.to_lowercase();
                assert!(a <= b, "round {round}: {a:?} sorted after {b:?}");
            }
        }
    }
}

#[test]
fn aggregation_accepts_client_casing() {
    let catalog = CardCatalog::from_entries([(
        "EX1_066",
        CardInfo {
            mana: 1,
            name: "Acidic Swamp Ooze".into(),
        },
    )])
    .expect("catalog");

    let picks = vec![CardId::new("ex1_066"), CardId::new("EX1_066")];
    let sorted = aggregate(&catalog, &picks).expect("aggregate");

    assert_eq!(sorted.len(), 1);
    assert_eq!(sorted[0].multiplicity, 2);
}
